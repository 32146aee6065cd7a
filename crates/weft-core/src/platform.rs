//! Platform abstractions used by the scheduler.
//!
//! The runtime never talks to a clock or an event loop directly. The embedder
//! calls [`Runtime::step`](crate::runtime::Runtime::step) whenever it has
//! idle time, passing a [`Deadline`] that says how much of the slice is left,
//! and may install a [`RenderWaker`] to learn when new work appears.

use std::time::{Duration, Instant};

/// Remaining-time signal for one scheduling slice.
///
/// The scheduler consults it between units of work, never inside one, and
/// never during commit.
pub trait Deadline {
    fn time_remaining(&self) -> Duration;

    /// Stop working when less than a millisecond of the slice remains.
    fn should_yield(&self) -> bool {
        self.time_remaining() < Duration::from_millis(1)
    }
}

/// Wall-clock slice of a fixed budget, measured from construction.
pub struct TimeSlice {
    end: Instant,
}

impl TimeSlice {
    pub fn new(budget: Duration) -> Self {
        TimeSlice {
            end: Instant::now() + budget,
        }
    }
}

impl Deadline for TimeSlice {
    fn time_remaining(&self) -> Duration {
        self.end.saturating_duration_since(Instant::now())
    }
}

/// Never yields: a single `step` call runs the whole render phase.
pub struct Unbounded;

impl Deadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }

    fn should_yield(&self) -> bool {
        false
    }
}

/// Callback poked when a state mutator requests a render, so an event-driven
/// embedder knows to schedule idle work. Embedders that poll
/// [`Runtime::has_work`](crate::runtime::Runtime::has_work) do not need one.
pub trait RenderWaker {
    fn wake(&self);
}

impl<F: Fn()> RenderWaker for F {
    fn wake(&self) {
        self()
    }
}
