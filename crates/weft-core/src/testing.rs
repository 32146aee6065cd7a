//! Headless test harness for the rendering runtime.
//!
//! [`RenderTest`] owns a [`Runtime`] over a [`MemoryHost`] with a ready-made
//! container node, and exposes helpers for driving renders, slicing work into
//! counted units, emitting host events, and asserting on the produced node
//! tree. Everything panics on host errors; these are test utilities, not an
//! error-handling surface.

use std::cell::Cell;
use std::time::Duration;

use crate::element::{Element, HostEvent, PropValue};
use crate::host::{HostAdapter, NodeId, NodeSpec};
use crate::memory::{HostOp, MemoryHost};
use crate::platform::Deadline;
use crate::runtime::{Progress, Runtime};

/// Deadline that yields after a fixed number of units instead of elapsed
/// time, making slicing deterministic in tests.
pub struct StepBudget {
    remaining: Cell<usize>,
}

impl StepBudget {
    pub fn new(units: usize) -> Self {
        StepBudget {
            remaining: Cell::new(units),
        }
    }
}

impl Deadline for StepBudget {
    fn time_remaining(&self) -> Duration {
        if self.remaining.get() > 0 {
            Duration::from_secs(1)
        } else {
            Duration::ZERO
        }
    }

    fn should_yield(&self) -> bool {
        let left = self.remaining.get().saturating_sub(1);
        self.remaining.set(left);
        left == 0
    }
}

/// Headless harness for exercising the runtime in tests.
pub struct RenderTest {
    runtime: Runtime<MemoryHost>,
    container: NodeId,
}

impl RenderTest {
    /// A fresh runtime over an in-memory host, with one container node
    /// already created and its creation op drained.
    pub fn new() -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_node(NodeSpec::Tag("root")).expect("container");
        let mut runtime = Runtime::new(host);
        runtime.host_mut().take_ops();
        RenderTest { runtime, container }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Schedule a render into the container without performing any work.
    pub fn render(&mut self, element: Element) {
        self.runtime.render(element, self.container);
    }

    /// Schedule a render and drive it all the way to the committed tree.
    pub fn render_to_idle(&mut self, element: Element) {
        self.render(element);
        self.pump_until_idle();
    }

    /// Drive the runtime until no work remains.
    pub fn pump_until_idle(&mut self) {
        self.runtime.run_to_completion().expect("render failed");
    }

    /// Run one `step` that yields after `units` units of work.
    pub fn step_units(&mut self, units: usize) -> Progress {
        self.runtime
            .step(&StepBudget::new(units))
            .expect("step failed")
    }

    /// Drain the host's operation journal.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        self.runtime.host_mut().take_ops()
    }

    /// Deliver `event` to every listener attached to `node`, returning how
    /// many ran. Typically followed by [`RenderTest::pump_until_idle`].
    pub fn emit(&mut self, node: NodeId, event: &HostEvent) -> usize {
        self.runtime.host().emit(node, event).expect("emit failed")
    }

    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.runtime
            .host()
            .children_of(parent)
            .expect("missing parent node")
            .to_vec()
    }

    /// The single child of `parent`; panics when there is any other number.
    pub fn only_child(&self, parent: NodeId) -> NodeId {
        let children = self.children(parent);
        assert_eq!(
            children.len(),
            1,
            "expected exactly one child under node {parent}"
        );
        children[0]
    }

    pub fn tag_of(&self, node: NodeId) -> Option<String> {
        self.runtime
            .host()
            .tag_of(node)
            .expect("missing node")
            .map(str::to_owned)
    }

    pub fn text_of(&self, node: NodeId) -> Option<String> {
        self.runtime
            .host()
            .text_of(node)
            .expect("missing node")
            .map(str::to_owned)
    }

    pub fn attr_text(&self, node: NodeId, key: &str) -> Option<String> {
        self.runtime
            .host()
            .attr(node, key)
            .expect("missing node")
            .and_then(PropValue::as_text)
            .map(str::to_owned)
    }

    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.runtime
            .host()
            .listener_count(node, event)
            .expect("missing node")
    }

    /// Render the container subtree as an indented text dump.
    pub fn dump(&self) -> String {
        self.runtime.host().dump_tree(self.container)
    }

    /// The runtime itself, for scenarios the helpers do not cover.
    pub fn runtime(&mut self) -> &mut Runtime<MemoryHost> {
        &mut self.runtime
    }
}

impl Default for RenderTest {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper for tests that only need temporary access to a
/// [`RenderTest`].
pub fn run_render_test<R>(f: impl FnOnce(&mut RenderTest) -> R) -> R {
    let mut rt = RenderTest::new();
    f(&mut rt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Props;

    #[test]
    fn harness_renders_and_inspects() {
        run_render_test(|rt| {
            rt.render_to_idle(Element::host("div", Props::new().attr("id", "app"), ["hi"]));
            let div = rt.only_child(rt.container());
            assert_eq!(rt.tag_of(div), Some("div".to_owned()));
            assert_eq!(rt.attr_text(div, "id"), Some("app".to_owned()));
            assert_eq!(rt.text_of(rt.only_child(div)), Some("hi".to_owned()));
            assert!(rt.dump().contains("\"hi\""));
        });
    }

    #[test]
    fn step_budget_slices_by_unit_count() {
        let mut rt = RenderTest::new();
        rt.render(Element::host("div", Props::new(), ["a", "b"]));
        // four units: the generation root, the div, and two texts
        assert_eq!(rt.step_units(1), Progress::Pending);
        assert_eq!(rt.step_units(1), Progress::Pending);
        assert_eq!(rt.step_units(1), Progress::Pending);
        assert_eq!(rt.step_units(1), Progress::Idle);
        assert_eq!(rt.children(rt.container()).len(), 1);
    }
}
