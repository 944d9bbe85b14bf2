// ============================================================================
// axon-cells - Dependency Tracking
// Marking stale deriveds, settling them in order, and cycle walks
// ============================================================================
//
// A write never recomputes anything directly. It marks the written cell's
// dependents DIRTY and everything further downstream MAYBE_DIRTY, queueing
// each newly marked derived once. Settlement then drains the queue in
// ascending graph height, so a derived with several changed inputs
// recomputes once, after all of them, and never exposes a half-updated
// combination.
// ============================================================================

use std::collections::HashSet;
use std::rc::Rc;

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::error::{CellError, Result};
use crate::core::types::{AnyCell, AnyDependent, CellId};

// =============================================================================
// MARK DEPENDENTS
// =============================================================================

/// Mark everything downstream of `source` as stale and queue it for settling.
///
/// Direct dependents become DIRTY, transitive ones MAYBE_DIRTY. A node that
/// was already stale is not re-queued and its subtree is not walked again.
///
/// # Borrow Safety
/// Dependents are collected into a Vec before any of them is touched
/// ("collect-then-mutate"), so no RefCell borrow on `source` is held while
/// marking.
pub fn mark_dependents(source: &dyn AnyCell) {
    let mut stack: Vec<(Vec<Rc<dyn AnyDependent>>, u32)> =
        vec![(source.collect_dependents(), DIRTY)];

    while let Some((dependents, status)) = stack.pop() {
        for dependent in dependents {
            if !dependent.mark(status) {
                continue;
            }
            enqueue(&dependent);
            if let Some(cell) = dependent.as_cell() {
                stack.push((cell.collect_dependents(), MAYBE_DIRTY));
            }
        }
    }
}

/// Queue a derived for the next settlement pass.
pub fn enqueue(dependent: &Rc<dyn AnyDependent>) {
    with_context(|ctx| ctx.enqueue_pending(Rc::downgrade(dependent)));
}

/// Refresh the heights of everything downstream of `source` after its own
/// height changed, so settlement keeps running upstream cells first.
pub(crate) fn update_downstream_heights(source: &dyn AnyCell) {
    let mut stack: Vec<Rc<dyn AnyDependent>> = source.collect_dependents();
    while let Some(dependent) = stack.pop() {
        let Some(cell) = dependent.as_cell() else {
            continue;
        };
        if cell.update_height() {
            stack.extend(cell.collect_dependents());
        }
    }
}

// =============================================================================
// SETTLE
// =============================================================================

/// Settle every queued derived: recompute the stale ones and notify the
/// listeners of those whose value changed.
///
/// Runs until the queue is empty, since listeners may write other cells and
/// queue more work. Does nothing inside a transaction; the outermost
/// transaction settles on exit.
pub fn settle_pending() {
    if with_context(|ctx| ctx.in_transaction()) {
        return;
    }

    loop {
        let queued = with_context(|ctx| ctx.take_pending());
        if queued.is_empty() {
            break;
        }

        let mut ready: Vec<(usize, Rc<dyn AnyDependent>)> = queued
            .into_iter()
            .filter_map(|weak| weak.upgrade())
            .map(|dependent| (dependent.rank(), dependent))
            .collect();

        // Stable: equal heights keep marking order
        ready.sort_by_key(|(rank, _)| *rank);

        for (_, dependent) in ready {
            dependent.settle();
        }
    }
}

// =============================================================================
// NOTIFYING GUARD
// =============================================================================

/// Holds a cell in the NOTIFYING state for the duration of one wave.
///
/// The flag is cleared on drop, so a panicking listener does not leave the
/// cell rejecting every later write.
pub(crate) struct NotifyingGuard<'a> {
    cell: &'a dyn AnyCell,
}

impl<'a> NotifyingGuard<'a> {
    pub(crate) fn enter(cell: &'a dyn AnyCell) -> Self {
        cell.set_flags(cell.flags() | NOTIFYING);
        with_context(|ctx| ctx.enter_wave());
        Self { cell }
    }
}

impl Drop for NotifyingGuard<'_> {
    fn drop(&mut self) {
        self.cell.set_flags(self.cell.flags() & !NOTIFYING);
        with_context(|ctx| ctx.exit_wave());
    }
}

// =============================================================================
// CYCLE DETECTION
// =============================================================================

/// Fail if installing `upstream` as a dependency of `node` would make `node`
/// depend on itself.
///
/// Walks `upstream` and everything it transitively reads from, iteratively,
/// visiting each cell once.
pub fn ensure_acyclic(node: CellId, node_label: &str, upstream: &Rc<dyn AnyCell>) -> Result<()> {
    let mut visited: HashSet<CellId> = HashSet::new();
    let mut stack: Vec<Rc<dyn AnyCell>> = vec![upstream.clone()];

    while let Some(cell) = stack.pop() {
        if cell.id() == node {
            tracing::debug!(cell = node_label, "rejected cyclic dependency");
            return Err(CellError::CyclicDependency {
                cell: node_label.to_string(),
            });
        }
        if !visited.insert(cell.id()) {
            continue;
        }
        cell.for_each_dependency(&mut |dep| stack.push(dep.clone()));
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Derived, Observable, ReadCell};
    use std::cell::Cell;

    #[test]
    fn marking_sets_direct_dirty_and_transitive_maybe_dirty() {
        let a = Observable::new(1);
        let b = a.map(|v| v + 1).unwrap();
        let c = b.map(|v| v * 2).unwrap();

        crate::reactivity::batching::transaction(|| {
            a.set(5).unwrap();
            assert!(b.any_cell().is_dirty());
            assert!(c.any_cell().is_maybe_dirty());
        })
        .unwrap();

        assert!(b.any_cell().is_clean());
        assert!(c.any_cell().is_clean());
        assert_eq!(c.get().unwrap(), 12);
    }

    #[test]
    fn unchanged_intermediate_skips_downstream_recompute() {
        let runs = Rc::new(Cell::new(0));
        let a = Observable::new(3);
        let clamped = a.map(|v| (*v).clamp(0, 10)).unwrap();
        let scaled = {
            let runs = runs.clone();
            clamped
                .map(move |v| {
                    runs.set(runs.get() + 1);
                    v * 100
                })
                .unwrap()
        };
        assert_eq!(runs.get(), 1);

        // 20 and 30 both clamp to 10: only the first changes `clamped`
        a.set(20).unwrap();
        assert_eq!(runs.get(), 2);
        a.set(30).unwrap();
        assert_eq!(runs.get(), 2);
        assert_eq!(scaled.get().unwrap(), 1000);
    }

    #[test]
    fn settle_orders_by_height() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let a = Observable::new(0);
        let low = a.map(|v| v + 1).unwrap();
        let high = Derived::new((low.clone(), a.clone()), |(l, a)| l + a).unwrap();

        for (cell_name, cell) in [("high", high.clone()), ("low", low.clone())] {
            let order = order.clone();
            cell.lazy_link(move |_, _| order.borrow_mut().push(cell_name))
                .unwrap();
        }

        a.set(1).unwrap();
        assert_eq!(*order.borrow(), vec!["low", "high"]);
    }

    #[test]
    fn acyclic_walk_accepts_unrelated_upstream() {
        let a = Observable::new(1);
        let b = a.map(|v| v * 2).unwrap();
        let unrelated = CellId::next();
        assert!(ensure_acyclic(unrelated, "x", &b.any_cell()).is_ok());
        assert!(ensure_acyclic(a.id(), "a", &b.any_cell()).is_err());
    }
}
