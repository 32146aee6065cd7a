//! A small fiber-based rendering runtime.
//!
//! Declarative element trees are rendered into an arbitrary host through a
//! [`HostAdapter`]. Rendering is split into two phases: an interruptible
//! render phase that rebuilds a work-in-progress fiber tree and computes the
//! patches the host needs, and an atomic commit phase that applies them.
//! The render phase is cooperatively time-sliced through a [`Deadline`], so
//! an embedder can bound how long any single [`Runtime::step`] call keeps
//! the thread, and a render request arriving mid-flight simply restarts the
//! work from the last committed tree.
//!
//! ```
//! use weft_core::{Element, HostAdapter, MemoryHost, NodeSpec, Props, Runtime};
//!
//! fn main() -> Result<(), weft_core::RenderError> {
//!     let mut host = MemoryHost::new();
//!     let container = host.create_node(NodeSpec::Tag("root"))?;
//!     let mut runtime = Runtime::new(host);
//!
//!     runtime.render(
//!         Element::host("h1", Props::new().attr("title", "greeting"), ["hello"]),
//!         container,
//!     );
//!     runtime.run_to_completion()?;
//!
//!     assert_eq!(runtime.host().children_of(container)?.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! Components are plain functions re-run on every render; their state lives
//! in the runtime, keyed by call order:
//!
//! ```
//! use weft_core::{Element, Props, Scope};
//!
//! fn counter(scope: &mut Scope<'_>, _props: &Props) -> Element {
//!     let (count, set_count) = scope.use_state(0i64);
//!     Element::host(
//!         "button",
//!         Props::new().on("click", move |_| set_count.update(|n| n + 1)),
//!         [Element::text(format!("clicked {count} times"))],
//!     )
//! }
//! ```

use std::fmt;

pub mod element;
pub mod hooks;
pub mod host;
pub mod memory;
pub mod platform;
pub mod runtime;
pub mod testing;

mod commit;
mod fiber;
mod reconcile;

pub use element::{Component, Element, ElementKind, EventHandler, HostEvent, PropValue, Props};
pub use hooks::{Scope, Setter};
pub use host::{HostAdapter, HostError, NodeId, NodeSpec};
pub use memory::{HostOp, MemoryHost};
pub use platform::{Deadline, RenderWaker, TimeSlice, Unbounded};
pub use runtime::{Progress, Runtime, RuntimeHandle};

/// Error surfaced by [`Runtime::step`] and the helpers built on it.
#[derive(Debug)]
pub enum RenderError {
    /// An element in the render input failed validation.
    InvalidElement { detail: String },
    /// The host adapter rejected an operation.
    Host(HostError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidElement { detail } => write!(f, "invalid element: {detail}"),
            RenderError::Host(err) => write!(f, "host adapter error: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Host(err) => Some(err),
            RenderError::InvalidElement { .. } => None,
        }
    }
}

impl From<HostError> for RenderError {
    fn from(err: HostError) -> Self {
        RenderError::Host(err)
    }
}
