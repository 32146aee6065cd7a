//! Commit phase.
//!
//! Applies a finished generation to the host in one uninterrupted pass:
//! queued deletions first, then a pre-order walk of the new tree applying
//! additions and updates, then promotion, which makes the generation current
//! and sweeps every fiber that is neither in it nor its direct alternate.

use slotmap::SecondaryMap;
use smallvec::SmallVec;

use crate::element::{event_name, is_event_key, EventHandler, PropValue};
use crate::fiber::{Effect, FiberId};
use crate::host::{HostAdapter, HostError, NodeId};
use crate::runtime::Runtime;
use crate::RenderError;

/// Which host channel a prop key/value pair addresses. An `on`-prefixed key
/// holding a handler is a listener; every other combination, including an
/// `on`-prefixed key holding text, is a plain property.
enum PropSlot<'a> {
    Listener(String, &'a EventHandler),
    Property,
}

fn prop_slot<'a>(key: &str, value: &'a PropValue) -> PropSlot<'a> {
    match value.as_handler() {
        Some(handler) if is_event_key(key) => PropSlot::Listener(event_name(key), handler),
        _ => PropSlot::Property,
    }
}

pub(crate) fn set_prop<H: HostAdapter>(
    host: &mut H,
    node: NodeId,
    key: &str,
    value: &PropValue,
) -> Result<(), HostError> {
    match prop_slot(key, value) {
        PropSlot::Listener(event, handler) => host.add_listener(node, &event, handler.clone()),
        PropSlot::Property => host.set_property(node, key, value),
    }
}

fn clear_prop<H: HostAdapter>(
    host: &mut H,
    node: NodeId,
    key: &str,
    old: &PropValue,
) -> Result<(), HostError> {
    match prop_slot(key, old) {
        PropSlot::Listener(event, handler) => host.remove_listener(node, &event, handler),
        PropSlot::Property => host.remove_property(node, key),
    }
}

impl<H: HostAdapter> Runtime<H> {
    pub(crate) fn commit_root(&mut self, wip: FiberId) -> Result<(), RenderError> {
        let deletions: SmallVec<[FiberId; 8]> = std::mem::take(&mut self.deletions);
        let deleted = deletions.len();
        for id in deletions {
            self.commit_deletion(id)?;
        }

        let (mut added, mut updated) = (0usize, 0usize);
        let mut stack: Vec<FiberId> = Vec::new();
        if let Some(child) = self.fibers[wip].child {
            stack.push(child);
        }
        while let Some(id) = stack.pop() {
            match self.fibers[id].effect {
                Effect::Add => added += 1,
                Effect::Update => updated += 1,
                Effect::None => {}
                Effect::Delete => {
                    debug_assert!(false, "deleted fiber linked into the new tree");
                }
            }
            self.apply_effect(id)?;
            let fiber = &self.fibers[id];
            if let Some(sibling) = fiber.sibling {
                stack.push(sibling);
            }
            if let Some(child) = fiber.child {
                stack.push(child);
            }
        }

        self.promote(wip);
        log::debug!(
            "committed generation {wip:?}: {added} added, {updated} updated, {deleted} deleted; {} fibers live",
            self.fibers.len()
        );
        Ok(())
    }

    fn apply_effect(&mut self, id: FiberId) -> Result<(), RenderError> {
        match self.fibers[id].effect {
            Effect::Add => {
                if let Some(node) = self.fibers[id].node {
                    let parent_node = self.host_parent_of(id);
                    self.host.append_child(parent_node, node)?;
                    log::trace!("attached node {node} under {parent_node}");
                }
            }
            Effect::Update => {
                if let Some(node) = self.fibers[id].node {
                    self.diff_props(id, node)?;
                }
            }
            Effect::None | Effect::Delete => {}
        }
        Ok(())
    }

    /// Nearest ancestor that owns a host node. Component fibers are invisible
    /// to the host tree, so additions and removals skip over them.
    fn host_parent_of(&self, id: FiberId) -> NodeId {
        let mut cursor = self.fibers[id].parent;
        while let Some(parent) = cursor {
            if let Some(node) = self.fibers[parent].node {
                return node;
            }
            cursor = self.fibers[parent].parent;
        }
        panic!("fiber has no host ancestor")
    }

    /// Push the difference between the alternate's props and this fiber's
    /// props to the host. Unchanged values are skipped entirely; a value that
    /// switches channel clears the old channel before writing the new one.
    fn diff_props(&mut self, id: FiberId, node: NodeId) -> Result<(), RenderError> {
        let (old_props, new_props) = {
            let fiber = &self.fibers[id];
            let old = fiber
                .alternate
                .and_then(|alt| self.fibers.get(alt))
                .map(|alt| alt.props.clone())
                .unwrap_or_default();
            (old, fiber.props.clone())
        };

        for (key, old_value) in old_props.iter() {
            if !new_props.contains(key) {
                clear_prop(&mut self.host, node, key, old_value)?;
            }
        }
        for (key, new_value) in new_props.iter() {
            match old_props.get(key) {
                Some(old_value) if old_value == new_value => {}
                Some(old_value) => {
                    // listeners accumulate rather than overwrite, so the old
                    // one has to go before the new one is attached
                    match (prop_slot(key, old_value), prop_slot(key, new_value)) {
                        (PropSlot::Listener(event, handler), _) => {
                            self.host.remove_listener(node, &event, handler)?;
                        }
                        (PropSlot::Property, PropSlot::Listener(..)) => {
                            self.host.remove_property(node, key)?;
                        }
                        (PropSlot::Property, PropSlot::Property) => {}
                    }
                    set_prop(&mut self.host, node, key, new_value)?;
                }
                None => set_prop(&mut self.host, node, key, new_value)?,
            }
        }
        Ok(())
    }

    fn commit_deletion(&mut self, id: FiberId) -> Result<(), RenderError> {
        let parent_node = self.host_parent_of(id);
        log::trace!("deleting subtree rooted at fiber {id:?}");
        self.detach_subtree(id, parent_node)
    }

    /// Remove the topmost real nodes of the subtree at `id` from
    /// `host_parent`. A fiber with a node is detached whole; a nodeless
    /// fiber's children are walked, siblings included.
    pub(crate) fn detach_subtree(
        &mut self,
        id: FiberId,
        host_parent: NodeId,
    ) -> Result<(), RenderError> {
        if let Some(node) = self.fibers[id].node {
            self.host.remove_child(host_parent, node)?;
            return Ok(());
        }
        let mut cursor = self.fibers[id].child;
        while let Some(child) = cursor {
            cursor = self.fibers[child].sibling;
            self.detach_subtree(child, host_parent)?;
        }
        Ok(())
    }

    /// Make `wip` the committed generation. Everything outside the new tree
    /// and its direct alternates is reclaimed, and the kept alternates lose
    /// their own history so exactly one previous generation survives.
    fn promote(&mut self, wip: FiberId) {
        let mut keep: SecondaryMap<FiberId, ()> = SecondaryMap::new();
        let mut alternates: Vec<FiberId> = Vec::new();
        let mut stack = vec![wip];
        while let Some(id) = stack.pop() {
            keep.insert(id, ());
            let fiber = &self.fibers[id];
            if let Some(alt) = fiber.alternate {
                alternates.push(alt);
            }
            if let Some(sibling) = fiber.sibling {
                stack.push(sibling);
            }
            if let Some(child) = fiber.child {
                stack.push(child);
            }
        }
        for alt in &alternates {
            keep.insert(*alt, ());
        }
        self.fibers.retain(|id, _| keep.contains_key(id));
        for alt in alternates {
            if let Some(fiber) = self.fibers.get_mut(alt) {
                fiber.alternate = None;
            }
        }
        self.current_root = Some(wip);
        self.wip_root = None;
    }
}
