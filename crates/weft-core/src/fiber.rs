//! Fiber tree storage.
//!
//! Fibers live in a slotmap arena and refer to each other by key, so the
//! parent/child/sibling links and the cross-generation `alternate` link are
//! plain indices with no ownership cycles. A key whose fiber was reclaimed
//! simply stops resolving.

use std::fmt;
use std::ptr;

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::element::{Component, ElementKind, Props};
use crate::hooks::HookCell;
use crate::host::NodeId;

slotmap::new_key_type! {
    /// Arena key of one fiber.
    pub struct FiberId;
}

pub(crate) type FiberArena = SlotMap<FiberId, Fiber>;

/// What a fiber renders as, resolved once when the fiber is created.
#[derive(Clone)]
pub(crate) enum FiberKind {
    /// The per-generation root; its node is the container, never created by
    /// the runtime.
    Root,
    Host(String),
    Component(Component),
    Text,
}

impl FiberKind {
    pub fn from_element(kind: ElementKind) -> FiberKind {
        match kind {
            ElementKind::Host(tag) => FiberKind::Host(tag),
            ElementKind::Component(func) => FiberKind::Component(func),
            ElementKind::Text => FiberKind::Text,
        }
    }

    /// Positional type match against a new element. Root fibers are never
    /// compared: they are not children of anything.
    pub fn matches(&self, element: &ElementKind) -> bool {
        match (self, element) {
            (FiberKind::Host(a), ElementKind::Host(b)) => a == b,
            (FiberKind::Component(a), ElementKind::Component(b)) => ptr::fn_addr_eq(*a, *b),
            (FiberKind::Text, ElementKind::Text) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for FiberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FiberKind::Root => f.write_str("Root"),
            FiberKind::Host(tag) => write!(f, "Host({tag:?})"),
            FiberKind::Component(func) => write!(f, "Component({:p})", *func as *const ()),
            FiberKind::Text => f.write_str("Text"),
        }
    }
}

/// Patch classification assigned during reconciliation, applied at commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Effect {
    None,
    Add,
    Update,
    Delete,
}

/// Mutable unit of work and persistent tree node for one generation.
pub(crate) struct Fiber {
    pub kind: FiberKind,
    pub props: Props,
    pub parent: Option<FiberId>,
    /// First child; the rest of the level hangs off its `sibling` chain.
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    /// Same-position fiber in the previously committed generation. Lookup
    /// only; never traversed as part of this generation's tree.
    pub alternate: Option<FiberId>,
    /// Realized host node. Absent for component fibers, and for host/text
    /// fibers until their unit of work runs.
    pub node: Option<NodeId>,
    pub effect: Effect,
    /// State cells, in request order. Only component fibers use this.
    pub hooks: SmallVec<[HookCell; 4]>,
}

impl Fiber {
    /// Root fiber for a new generation. Its single child-to-be is carried in
    /// `props.children`.
    pub fn root(container: NodeId, props: Props, alternate: Option<FiberId>) -> Fiber {
        Fiber {
            kind: FiberKind::Root,
            props,
            parent: None,
            child: None,
            sibling: None,
            alternate,
            node: Some(container),
            effect: Effect::None,
            hooks: SmallVec::new(),
        }
    }

    /// Freshly added fiber for an element with no usable counterpart.
    pub fn added(kind: ElementKind, props: Props, parent: FiberId) -> Fiber {
        Fiber {
            kind: FiberKind::from_element(kind),
            props,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            node: None,
            effect: Effect::Add,
            hooks: SmallVec::new(),
        }
    }

    /// Fiber updating a same-type counterpart: keeps its kind and realized
    /// node, records it as the alternate.
    pub fn updating(
        kind: FiberKind,
        props: Props,
        parent: FiberId,
        old: FiberId,
        node: Option<NodeId>,
    ) -> Fiber {
        Fiber {
            kind,
            props,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: Some(old),
            node,
            effect: Effect::Update,
            hooks: SmallVec::new(),
        }
    }
}
