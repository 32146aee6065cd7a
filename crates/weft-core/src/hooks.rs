//! Position-keyed hook state.
//!
//! Component fibers carry an ordered list of state cells. On every render the
//! component rebuilds its list through a [`Scope`]: cell `i` of the new list
//! seeds from cell `i` of the previous generation's list (the alternate),
//! folded with whatever transitions were queued on it since. Identity is call
//! order and nothing else, which is why hooks must be requested in the same
//! order on every render of a component.

use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::runtime::RuntimeHandle;

/// Inline capacity covers typical component state counts without a heap hop.
pub(crate) type HookList = SmallVec<[HookCell; 4]>;

/// Erased `T -> T` state transition. `Fn`, not `FnOnce`: a render that gets
/// superseded and restarted folds the same queue again.
type Transition = Rc<dyn Fn(Rc<dyn Any>) -> Rc<dyn Any>>;

struct CellState {
    value: Rc<dyn Any>,
    queue: Vec<Transition>,
}

/// Shared handle to one state cell. Clones refer to the same cell, which is
/// how a mutator captured in committed props reaches the cell that will be
/// the next render's alternate.
#[derive(Clone)]
pub(crate) struct HookCell {
    inner: Rc<RefCell<CellState>>,
}

impl HookCell {
    pub fn new(value: Rc<dyn Any>) -> Self {
        HookCell {
            inner: Rc::new(RefCell::new(CellState {
                value,
                queue: Vec::new(),
            })),
        }
    }

    /// Committed value folded with the transitions queued when the fold
    /// began, in enqueue order. Reads the queue without consuming it, and
    /// never holds the cell borrowed across a transition call; a transition
    /// enqueued mid-fold waits for the next fold.
    pub fn folded_value(&self) -> Rc<dyn Any> {
        let (mut value, pending) = {
            let state = self.inner.borrow();
            (Rc::clone(&state.value), state.queue.len())
        };
        for index in 0..pending {
            let transition = Rc::clone(&self.inner.borrow().queue[index]);
            value = transition(value);
        }
        value
    }

    fn enqueue(&self, transition: Transition) {
        self.inner.borrow_mut().queue.push(transition);
    }

    #[cfg(test)]
    fn queue_len(&self) -> usize {
        self.inner.borrow().queue.len()
    }
}

/// Execution context threaded into a component invocation. All state the
/// component holds is requested through it, in a fixed order.
pub struct Scope<'a> {
    alternate: &'a [HookCell],
    fresh: &'a mut HookList,
    cursor: usize,
    handle: RuntimeHandle,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        alternate: &'a [HookCell],
        fresh: &'a mut HookList,
        handle: RuntimeHandle,
    ) -> Self {
        Scope {
            alternate,
            fresh,
            cursor: 0,
            handle,
        }
    }

    /// Request the state cell at the current hook position.
    ///
    /// Returns the cell's current value and a [`Setter`] that queues
    /// transitions onto it. If the previous generation has no cell at this
    /// position, or holds a value of a different type there, the cell seeds
    /// from `initial`; a type change at a position is how hook-order
    /// violations surface (as reseeded state, not as an error).
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, Setter<T>) {
        let folded = self.alternate.get(self.cursor).map(HookCell::folded_value);
        self.cursor += 1;
        let current: T = folded
            .as_deref()
            .and_then(<dyn Any>::downcast_ref::<T>)
            .cloned()
            .unwrap_or(initial);
        let cell = HookCell::new(Rc::new(current.clone()));
        self.fresh.push(cell.clone());
        (
            current,
            Setter {
                cell,
                handle: self.handle.clone(),
                _marker: PhantomData,
            },
        )
    }
}

/// State mutator returned by [`Scope::use_state`].
///
/// Cheap to clone and `'static`, so it can move into event handler props.
/// Each call queues a transition on its cell and asks the runtime for a new
/// render; the transition is applied when that render reads the cell.
pub struct Setter<T> {
    cell: HookCell,
    handle: RuntimeHandle,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Setter {
            cell: self.cell.clone(),
            handle: self.handle.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Clone + 'static> Setter<T> {
    /// Queue a transition of the current value and request a render.
    pub fn update(&self, f: impl Fn(&T) -> T + 'static) {
        self.cell.enqueue(Rc::new(move |value: Rc<dyn Any>| {
            match value.downcast::<T>() {
                Ok(current) => Rc::new(f(&current)) as Rc<dyn Any>,
                // A different type sits at this position now; leave it alone.
                Err(untouched) => untouched,
            }
        }));
        self.handle.request_render();
    }

    /// Queue an outright replacement and request a render.
    pub fn set(&self, value: T) {
        self.update(move |_| value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope_over<'a>(
        alternate: &'a [HookCell],
        fresh: &'a mut HookList,
    ) -> Scope<'a> {
        Scope::new(alternate, fresh, RuntimeHandle::disconnected())
    }

    fn setter_for<T>(cell: &HookCell) -> Setter<T> {
        Setter {
            cell: cell.clone(),
            handle: RuntimeHandle::disconnected(),
            _marker: PhantomData,
        }
    }

    #[test]
    fn transitions_fold_in_enqueue_order() {
        let cell = HookCell::new(Rc::new(1i64));
        let setter = setter_for::<i64>(&cell);
        setter.update(|n| n + 1);
        setter.update(|n| n * 3);
        let folded = cell.folded_value();
        assert_eq!(folded.downcast_ref::<i64>(), Some(&6));
    }

    #[test]
    fn folding_does_not_consume_the_queue() {
        let cell = HookCell::new(Rc::new(10i64));
        setter_for::<i64>(&cell).update(|n| n - 3);
        assert_eq!(cell.folded_value().downcast_ref::<i64>(), Some(&7));
        assert_eq!(cell.folded_value().downcast_ref::<i64>(), Some(&7));
        assert_eq!(cell.queue_len(), 1);
    }

    #[test]
    fn cells_are_matched_by_position() {
        let previous: Vec<HookCell> = vec![
            HookCell::new(Rc::new(41i64)),
            HookCell::new(Rc::new(String::from("kept"))),
        ];
        let mut fresh = HookList::new();
        let mut scope = scope_over(&previous, &mut fresh);
        let (n, _) = scope.use_state(0i64);
        let (s, _) = scope.use_state(String::new());
        assert_eq!(n, 41);
        assert_eq!(s, "kept");
        assert_eq!(fresh.len(), 2);
    }

    #[test]
    fn fresh_cells_start_with_folded_state_and_empty_queue() {
        let previous = vec![HookCell::new(Rc::new(5i64))];
        setter_for::<i64>(&previous[0]).update(|n| n + 5);
        let mut fresh = HookList::new();
        let (value, _) = scope_over(&previous, &mut fresh).use_state(0i64);
        assert_eq!(value, 10);
        assert_eq!(fresh[0].queue_len(), 0);
        // the old cell still holds its queue for a possible restart
        assert_eq!(previous[0].queue_len(), 1);
    }

    #[test]
    fn type_change_at_a_position_reseeds_from_initial() {
        let previous = vec![HookCell::new(Rc::new(1i64))];
        let mut fresh = HookList::new();
        let (s, _) = scope_over(&previous, &mut fresh).use_state(String::from("fresh"));
        assert_eq!(s, "fresh");
    }

    #[test]
    fn wrong_shape_transitions_are_skipped() {
        let cell = HookCell::new(Rc::new(1i64));
        let wrong = setter_for::<String>(&cell);
        wrong.update(|s| format!("{s}!"));
        assert_eq!(cell.folded_value().downcast_ref::<i64>(), Some(&1));
    }

    #[test]
    fn transitions_enqueued_mid_fold_wait_for_the_next_fold() {
        let cell = HookCell::new(Rc::new(0i64));
        let setter = setter_for::<i64>(&cell);
        let chained = setter.clone();
        setter.update(move |n| {
            chained.update(|m| m + 10);
            n + 1
        });
        // the first fold covers only what was queued before it started
        assert_eq!(cell.folded_value().downcast_ref::<i64>(), Some(&1));
        assert_eq!(cell.queue_len(), 2);
        assert_eq!(cell.folded_value().downcast_ref::<i64>(), Some(&11));
    }

    #[test]
    fn missing_alternate_seeds_from_initial() {
        let mut fresh = HookList::new();
        let (value, _) = scope_over(&[], &mut fresh).use_state(7i64);
        assert_eq!(value, 7);
    }
}
