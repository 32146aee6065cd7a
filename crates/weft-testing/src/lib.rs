//! Headless test harness for the weft rendering runtime.
//!
//! Thin façade over [`weft_core::testing`] so downstream crates can pull the
//! harness in as a dev-dependency without touching `weft-core` internals.

pub use weft_core::testing::{run_render_test, RenderTest, StepBudget};

pub mod prelude {
    pub use weft_core::testing::{run_render_test, RenderTest, StepBudget};
}
