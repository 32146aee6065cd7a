//! Host adapter: the capability surface the runtime drives output through.
//!
//! The adapter owns its nodes; the runtime speaks in plain [`NodeId`]s and
//! never holds references into the host tree. Every capability is fallible
//! and failures propagate out of the runtime untouched.

use std::error::Error;
use std::fmt;

use crate::element::{EventHandler, PropValue};

/// Identifier of one realized host node, allocated by the adapter.
pub type NodeId = usize;

/// What kind of node to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeSpec<'a> {
    /// An element node for the given tag.
    Tag(&'a str),
    /// A text node; its payload arrives via the `nodeValue` property.
    Text,
}

/// Failure signaled by a host adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostError {
    /// The node id does not resolve to a live node.
    Missing { id: NodeId },
    /// `child` is not currently attached under `parent`.
    MissingChild { parent: NodeId, child: NodeId },
    /// No listener with that identity is attached for the event.
    MissingListener { id: NodeId, event: String },
    /// The adapter does not realize this tag.
    UnsupportedTag { tag: String },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Missing { id } => write!(f, "host node {id} is missing"),
            HostError::MissingChild { parent, child } => {
                write!(f, "node {child} is not a child of node {parent}")
            }
            HostError::MissingListener { id, event } => {
                write!(f, "node {id} has no such listener for {event:?}")
            }
            HostError::UnsupportedTag { tag } => write!(f, "unsupported host tag {tag:?}"),
        }
    }
}

impl Error for HostError {}

/// Capabilities the runtime needs from a rendering backend.
///
/// `remove_listener` matches by handler identity: only the exact handler
/// previously passed to `add_listener` (or a clone of it) detaches.
pub trait HostAdapter {
    fn create_node(&mut self, spec: NodeSpec<'_>) -> Result<NodeId, HostError>;

    fn set_property(&mut self, node: NodeId, key: &str, value: &PropValue)
        -> Result<(), HostError>;

    fn remove_property(&mut self, node: NodeId, key: &str) -> Result<(), HostError>;

    fn add_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError>;

    fn remove_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError>;

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError>;
}
