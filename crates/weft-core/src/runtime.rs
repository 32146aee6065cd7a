//! The rendering runtime: generation scheduling, unit-of-work processing,
//! and lifecycle.
//!
//! A [`Runtime`] owns the host adapter and the fiber arena, plus the four
//! pieces of scheduling state: the next unit of work, the in-progress
//! generation root, the committed generation root, and the deletions
//! accumulated by reconciliation. The embedder drives everything through
//! [`Runtime::render`] and [`Runtime::step`]; nothing here is global, so any
//! number of runtimes coexist in one process.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::commit::set_prop;
use crate::element::{Component, Element, Props};
use crate::fiber::{Effect, Fiber, FiberArena, FiberId, FiberKind};
use crate::hooks::{HookList, Scope};
use crate::host::{HostAdapter, NodeId, NodeSpec};
use crate::platform::{Deadline, RenderWaker, Unbounded};
use crate::RenderError;

/// Outcome of one [`Runtime::step`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Work remains; schedule another slice.
    Pending,
    /// Nothing to do until the next render request.
    Idle,
}

pub(crate) struct Shared {
    render_requested: Cell<bool>,
    waker: RefCell<Option<Box<dyn RenderWaker>>>,
}

/// Cloneable, `'static` handle into a runtime. State mutators hold one to
/// request renders from event handlers; embedders can hold one to poll for
/// pending requests. All operations are no-ops once the runtime is dropped.
#[derive(Clone)]
pub struct RuntimeHandle {
    shared: Weak<Shared>,
}

impl RuntimeHandle {
    /// Flag that a new render is wanted and poke the installed waker.
    pub fn request_render(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.render_requested.set(true);
            if let Some(waker) = shared.waker.borrow().as_ref() {
                waker.wake();
            }
        }
    }

    /// True while a render request is waiting to be absorbed by `step`.
    pub fn render_requested(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.render_requested.get())
    }

    #[cfg(test)]
    pub(crate) fn disconnected() -> Self {
        RuntimeHandle { shared: Weak::new() }
    }
}

/// The rendering runtime over a host adapter.
pub struct Runtime<H: HostAdapter> {
    pub(crate) host: H,
    pub(crate) fibers: FiberArena,
    pub(crate) next_unit: Option<FiberId>,
    pub(crate) wip_root: Option<FiberId>,
    pub(crate) current_root: Option<FiberId>,
    pub(crate) deletions: SmallVec<[FiberId; 8]>,
    shared: Rc<Shared>,
}

impl<H: HostAdapter> Runtime<H> {
    pub fn new(host: H) -> Self {
        Runtime {
            host,
            fibers: FiberArena::with_key(),
            next_unit: None,
            wip_root: None,
            current_root: None,
            deletions: SmallVec::new(),
            shared: Rc::new(Shared {
                render_requested: Cell::new(false),
                waker: RefCell::new(None),
            }),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Install the callback poked when a mutator requests a render.
    pub fn set_waker(&self, waker: impl RenderWaker + 'static) {
        *self.shared.waker.borrow_mut() = Some(Box::new(waker));
    }

    /// Request a full render of `element` into `container`.
    ///
    /// Only schedules: the work happens across subsequent `step` calls.
    /// Calling again before completion supersedes the in-flight generation;
    /// nothing of it will ever reach the host. A pending state-update
    /// request is superseded too: transitions already queued still fold
    /// into this generation through the alternate links.
    pub fn render(&mut self, element: Element, container: NodeId) {
        self.shared.render_requested.set(false);
        let mut props = Props::new();
        props.set_children(vec![element]);
        let root = self
            .fibers
            .insert(Fiber::root(container, props, self.current_root));
        self.start_generation(root);
    }

    fn start_generation(&mut self, root: FiberId) {
        if let Some(stale) = self.wip_root.take() {
            log::debug!("generation {stale:?} superseded before commit");
        }
        // A fresh generation recomputes deletions from scratch; un-tag the
        // fibers the superseded one had marked.
        for id in self.deletions.drain(..) {
            if let Some(fiber) = self.fibers.get_mut(id) {
                fiber.effect = Effect::None;
            }
        }
        self.wip_root = Some(root);
        self.next_unit = Some(root);
        log::debug!("generation {root:?} scheduled");
    }

    /// Fold a pending mutator render request into a new generation rooted at
    /// the committed tree. Before anything has committed the request stays
    /// pending while a first render is in flight, and is dropped otherwise.
    fn absorb_render_request(&mut self) {
        if !self.shared.render_requested.get() {
            return;
        }
        let Some(current) = self.current_root else {
            if self.wip_root.is_none() {
                self.shared.render_requested.set(false);
                log::warn!("state update dropped: nothing has been rendered");
            }
            return;
        };
        self.shared.render_requested.set(false);
        let (container, props) = {
            let fiber = &self.fibers[current];
            let container = match fiber.node {
                Some(node) => node,
                None => panic!("committed root fiber has no container node"),
            };
            (container, fiber.props.clone())
        };
        let root = self
            .fibers
            .insert(Fiber::root(container, props, Some(current)));
        self.start_generation(root);
    }

    /// Run one scheduling slice.
    ///
    /// Absorbs pending render requests, performs units of work until the
    /// deadline asks to yield (always at least one, never stopping inside a
    /// unit), and commits if the generation finished. The commit itself is
    /// never sliced.
    pub fn step(&mut self, deadline: &dyn Deadline) -> Result<Progress, RenderError> {
        self.absorb_render_request();
        while let Some(unit) = self.next_unit {
            self.next_unit = self.perform_unit(unit)?;
            if self.next_unit.is_some() && deadline.should_yield() {
                break;
            }
        }
        if self.next_unit.is_none() {
            if let Some(wip) = self.wip_root {
                self.commit_root(wip)?;
            }
        }
        Ok(if self.has_work() {
            Progress::Pending
        } else {
            Progress::Idle
        })
    }

    /// Step with no deadline until every requested render has committed.
    pub fn run_to_completion(&mut self) -> Result<(), RenderError> {
        while self.has_work() {
            self.step(&Unbounded)?;
        }
        Ok(())
    }

    /// True when a `step` call would make progress.
    pub fn has_work(&self) -> bool {
        self.next_unit.is_some() || self.wip_root.is_some() || self.shared.render_requested.get()
    }

    /// Detach everything this runtime attached and drop all render state.
    /// The runtime stays usable; the next `render` starts a fresh history.
    pub fn teardown(&mut self) -> Result<(), RenderError> {
        self.shared.render_requested.set(false);
        self.next_unit = None;
        self.wip_root = None;
        self.deletions.clear();
        if let Some(root) = self.current_root.take() {
            let container = match self.fibers[root].node {
                Some(node) => node,
                None => panic!("committed root fiber has no container node"),
            };
            let mut cursor = self.fibers[root].child;
            while let Some(child) = cursor {
                cursor = self.fibers[child].sibling;
                self.detach_subtree(child, container)?;
            }
        }
        self.fibers.clear();
        log::debug!("teardown complete");
        Ok(())
    }

    /// Process one fiber, then pick the next in pre-order.
    fn perform_unit(&mut self, id: FiberId) -> Result<Option<FiberId>, RenderError> {
        let component = match &self.fibers[id].kind {
            FiberKind::Component(func) => Some(*func),
            _ => None,
        };
        match component {
            Some(func) => self.run_component(id, func)?,
            None => self.update_host_fiber(id)?,
        }
        Ok(self.advance(id))
    }

    fn run_component(&mut self, id: FiberId, func: Component) -> Result<(), RenderError> {
        let (props, alternate_hooks) = {
            let fiber = &self.fibers[id];
            let alternate = fiber.alternate.and_then(|alt| self.fibers.get(alt));
            (
                fiber.props.clone(),
                alternate
                    .map(|alt| alt.hooks.clone())
                    .unwrap_or_default(),
            )
        };
        let mut fresh = HookList::new();
        let rendered = {
            let mut scope = Scope::new(&alternate_hooks, &mut fresh, self.handle());
            func(&mut scope, &props)
        };
        self.fibers[id].hooks = fresh;
        self.reconcile_children(id, vec![rendered])
    }

    fn update_host_fiber(&mut self, id: FiberId) -> Result<(), RenderError> {
        if self.fibers[id].node.is_none() {
            let node = self.realize_node(id)?;
            self.fibers[id].node = Some(node);
        }
        let children = self.fibers[id].props.children_vec();
        self.reconcile_children(id, children)
    }

    /// Create and configure the host node for a host or text fiber. The node
    /// stays detached until commit.
    fn realize_node(&mut self, id: FiberId) -> Result<NodeId, RenderError> {
        let node = match &self.fibers[id].kind {
            FiberKind::Host(tag) => self.host.create_node(NodeSpec::Tag(tag))?,
            FiberKind::Text => self.host.create_node(NodeSpec::Text)?,
            FiberKind::Root | FiberKind::Component(_) => {
                panic!("node requested for a fiber that cannot own one")
            }
        };
        let props = self.fibers[id].props.clone();
        for (key, value) in props.iter() {
            set_prop(&mut self.host, node, key, value)?;
        }
        log::trace!("realized node {node} for {:?}", self.fibers[id].kind);
        Ok(node)
    }

    /// Pre-order successor: descend into the child, else the first sibling
    /// found while ascending from the processed fiber itself.
    fn advance(&self, id: FiberId) -> Option<FiberId> {
        if let Some(child) = self.fibers[id].child {
            return Some(child);
        }
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let fiber = &self.fibers[current];
            if let Some(sibling) = fiber.sibling {
                return Some(sibling);
            }
            cursor = fiber.parent;
        }
        None
    }
}
