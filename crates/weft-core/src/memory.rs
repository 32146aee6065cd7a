//! In-memory host adapter.
//!
//! Backs tests, demos and any headless embedding. Strict by intent: every
//! operation on a node the host does not know about is an error, and every
//! successful mutation is recorded in a journal that callers can drain, so a
//! test can assert exactly which mutations a commit performed.

use std::fmt::Write as _;
use std::mem;

use indexmap::IndexMap;

use crate::element::{EventHandler, HostEvent, PropValue, NODE_VALUE};
use crate::host::{HostAdapter, HostError, NodeId, NodeSpec};

/// One recorded host mutation, in application order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOp {
    Create { node: NodeId },
    SetProperty { node: NodeId, key: String },
    RemoveProperty { node: NodeId, key: String },
    AddListener { node: NodeId, event: String },
    RemoveListener { node: NodeId, event: String },
    AppendChild { parent: NodeId, child: NodeId },
    RemoveChild { parent: NodeId, child: NodeId },
}

impl HostOp {
    /// True for the structural ops (append/remove); property and listener
    /// traffic does not count.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            HostOp::AppendChild { .. } | HostOp::RemoveChild { .. }
        )
    }
}

enum NodeKind {
    Tag(String),
    Text,
}

struct MemoryNode {
    kind: NodeKind,
    attrs: IndexMap<String, PropValue>,
    listeners: Vec<(String, EventHandler)>,
    children: Vec<NodeId>,
}

impl MemoryNode {
    fn new(kind: NodeKind) -> Self {
        MemoryNode {
            kind,
            attrs: IndexMap::new(),
            listeners: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Node store plus mutation journal.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<MemoryNode>,
    ops: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        MemoryHost::default()
    }

    fn node(&self, id: NodeId) -> Result<&MemoryNode, HostError> {
        self.nodes.get(id).ok_or(HostError::Missing { id })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, HostError> {
        self.nodes.get_mut(id).ok_or(HostError::Missing { id })
    }

    /// Drain the journal.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        mem::take(&mut self.ops)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Tag of an element node; `None` for text nodes.
    pub fn tag_of(&self, id: NodeId) -> Result<Option<&str>, HostError> {
        Ok(match &self.node(id)?.kind {
            NodeKind::Tag(tag) => Some(tag.as_str()),
            NodeKind::Text => None,
        })
    }

    /// `nodeValue` payload, for text nodes that have received one.
    pub fn text_of(&self, id: NodeId) -> Result<Option<&str>, HostError> {
        Ok(self.node(id)?.attrs.get(NODE_VALUE).and_then(PropValue::as_text))
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Result<Option<&PropValue>, HostError> {
        Ok(self.node(id)?.attrs.get(key))
    }

    pub fn children_of(&self, id: NodeId) -> Result<&[NodeId], HostError> {
        Ok(&self.node(id)?.children)
    }

    pub fn listener_count(&self, id: NodeId, event: &str) -> Result<usize, HostError> {
        Ok(self
            .node(id)?
            .listeners
            .iter()
            .filter(|(name, _)| name == event)
            .count())
    }

    /// Fire every listener attached to `node` for the event's name. Returns
    /// how many ran. Handlers are cloned out first, so they may re-enter the
    /// runtime (enqueue state updates) freely.
    pub fn emit(&self, node: NodeId, event: &HostEvent) -> Result<usize, HostError> {
        let handlers: Vec<EventHandler> = self
            .node(node)?
            .listeners
            .iter()
            .filter(|(name, _)| *name == event.name)
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in &handlers {
            handler(event);
        }
        Ok(handlers.len())
    }

    /// Indented dump of the subtree under `root`, one node per line.
    pub fn dump_tree(&self, root: NodeId) -> String {
        let mut out = String::new();
        self.dump_node(root, 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        match self.node(id) {
            Err(_) => {
                let _ = writeln!(out, "<missing #{id}>");
            }
            Ok(node) => {
                match &node.kind {
                    NodeKind::Text => {
                        let text = node
                            .attrs
                            .get(NODE_VALUE)
                            .and_then(PropValue::as_text)
                            .unwrap_or("");
                        let _ = writeln!(out, "{text:?}");
                    }
                    NodeKind::Tag(tag) => {
                        let _ = write!(out, "<{tag}");
                        for (key, value) in &node.attrs {
                            let _ = write!(out, " {key}={value:?}");
                        }
                        for (event, _) in &node.listeners {
                            let _ = write!(out, " @{event}");
                        }
                        let _ = writeln!(out, ">");
                    }
                }
                for child in &node.children {
                    self.dump_node(*child, depth + 1, out);
                }
            }
        }
    }
}

impl HostAdapter for MemoryHost {
    fn create_node(&mut self, spec: NodeSpec<'_>) -> Result<NodeId, HostError> {
        let kind = match spec {
            NodeSpec::Tag(tag) if tag.is_empty() => {
                return Err(HostError::UnsupportedTag {
                    tag: tag.to_owned(),
                })
            }
            NodeSpec::Tag(tag) => NodeKind::Tag(tag.to_owned()),
            NodeSpec::Text => NodeKind::Text,
        };
        let id = self.nodes.len();
        self.nodes.push(MemoryNode::new(kind));
        self.ops.push(HostOp::Create { node: id });
        Ok(id)
    }

    fn set_property(
        &mut self,
        node: NodeId,
        key: &str,
        value: &PropValue,
    ) -> Result<(), HostError> {
        self.node_mut(node)?.attrs.insert(key.to_owned(), value.clone());
        self.ops.push(HostOp::SetProperty {
            node,
            key: key.to_owned(),
        });
        Ok(())
    }

    fn remove_property(&mut self, node: NodeId, key: &str) -> Result<(), HostError> {
        self.node_mut(node)?.attrs.shift_remove(key);
        self.ops.push(HostOp::RemoveProperty {
            node,
            key: key.to_owned(),
        });
        Ok(())
    }

    fn add_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError> {
        self.node_mut(node)?
            .listeners
            .push((event.to_owned(), handler));
        self.ops.push(HostOp::AddListener {
            node,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn remove_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        let listeners = &mut self.node_mut(node)?.listeners;
        let position = listeners
            .iter()
            .position(|(name, attached)| name == event && std::rc::Rc::ptr_eq(attached, handler));
        match position {
            Some(index) => {
                listeners.remove(index);
                self.ops.push(HostOp::RemoveListener {
                    node,
                    event: event.to_owned(),
                });
                Ok(())
            }
            None => Err(HostError::MissingListener {
                id: node,
                event: event.to_owned(),
            }),
        }
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        self.node(child)?;
        self.node_mut(parent)?.children.push(child);
        self.ops.push(HostOp::AppendChild { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        self.node(child)?;
        let children = &mut self.node_mut(parent)?.children;
        let position = children.iter().position(|c| *c == child);
        match position {
            Some(index) => {
                children.remove(index);
                self.ops.push(HostOp::RemoveChild { parent, child });
                Ok(())
            }
            None => Err(HostError::MissingChild { parent, child }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn missing_nodes_are_errors() {
        let mut host = MemoryHost::new();
        assert_eq!(
            host.set_property(7, "id", &PropValue::from("x")),
            Err(HostError::Missing { id: 7 })
        );
        assert_eq!(
            host.append_child(0, 1),
            Err(HostError::Missing { id: 1 })
        );
    }

    #[test]
    fn empty_tags_are_rejected() {
        let mut host = MemoryHost::new();
        assert_eq!(
            host.create_node(NodeSpec::Tag("")),
            Err(HostError::UnsupportedTag { tag: String::new() })
        );
    }

    #[test]
    fn journal_records_mutations_in_order() {
        let mut host = MemoryHost::new();
        let parent = host.create_node(NodeSpec::Tag("div")).unwrap();
        let child = host.create_node(NodeSpec::Text).unwrap();
        host.set_property(child, NODE_VALUE, &PropValue::from("hi")).unwrap();
        host.append_child(parent, child).unwrap();
        assert_eq!(
            host.take_ops(),
            vec![
                HostOp::Create { node: parent },
                HostOp::Create { node: child },
                HostOp::SetProperty { node: child, key: NODE_VALUE.into() },
                HostOp::AppendChild { parent, child },
            ]
        );
        assert!(host.take_ops().is_empty());
    }

    #[test]
    fn listener_removal_is_identity_keyed() {
        let mut host = MemoryHost::new();
        let node = host.create_node(NodeSpec::Tag("button")).unwrap();
        let attached: EventHandler = Rc::new(|_| {});
        let stranger: EventHandler = Rc::new(|_| {});
        host.add_listener(node, "click", attached.clone()).unwrap();
        assert_eq!(
            host.remove_listener(node, "click", &stranger),
            Err(HostError::MissingListener {
                id: node,
                event: "click".into()
            })
        );
        host.remove_listener(node, "click", &attached).unwrap();
        assert_eq!(host.listener_count(node, "click").unwrap(), 0);
    }

    #[test]
    fn emit_fires_only_matching_listeners() {
        let mut host = MemoryHost::new();
        let node = host.create_node(NodeSpec::Tag("input")).unwrap();
        let clicks = Rc::new(Cell::new(0));
        let seen = clicks.clone();
        host.add_listener(node, "click", Rc::new(move |_| seen.set(seen.get() + 1)))
            .unwrap();
        host.add_listener(node, "input", Rc::new(|_| panic!("wrong event fired")))
            .unwrap();
        let fired = host.emit(node, &HostEvent::new("click")).unwrap();
        assert_eq!(fired, 1);
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn remove_child_detaches_but_keeps_the_node() {
        let mut host = MemoryHost::new();
        let parent = host.create_node(NodeSpec::Tag("div")).unwrap();
        let child = host.create_node(NodeSpec::Tag("span")).unwrap();
        host.append_child(parent, child).unwrap();
        host.remove_child(parent, child).unwrap();
        assert!(host.children_of(parent).unwrap().is_empty());
        assert_eq!(host.tag_of(child).unwrap(), Some("span"));
        assert_eq!(host.node_count(), 2);
        assert_eq!(
            host.remove_child(parent, child),
            Err(HostError::MissingChild { parent, child })
        );
    }

    #[test]
    fn dump_tree_shows_structure() {
        let mut host = MemoryHost::new();
        let parent = host.create_node(NodeSpec::Tag("div")).unwrap();
        host.set_property(parent, "id", &PropValue::from("root")).unwrap();
        let text = host.create_node(NodeSpec::Text).unwrap();
        host.set_property(text, NODE_VALUE, &PropValue::from("hello")).unwrap();
        host.append_child(parent, text).unwrap();
        let dump = host.dump_tree(parent);
        assert_eq!(dump, "<div id=\"root\">\n  \"hello\"\n");
    }
}
