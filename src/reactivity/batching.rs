// ============================================================================
// axon-cells - Transactions
// Group several writes into a single propagation wave
// ============================================================================

use crate::core::context::with_context;
use crate::core::error::Result;
use crate::reactivity::tracking::settle_pending;

// =============================================================================
// TRANSACTION
// =============================================================================

/// Run `f` as one transaction: the combined setter for several cells.
///
/// Writes inside `f` commit immediately, so reads inside see them, but
/// listeners and derived recomputation wait for the outermost transaction to
/// end. Then each written observable notifies once with its first previous
/// value and its final value (nothing if they are equal), and each affected
/// derived recomputes exactly once over the final values.
///
/// Returns the first error raised while delivering the deferred
/// notifications, such as a `ReentrancyOverflow`.
///
/// # Example
///
/// ```
/// use axon_cells::{transaction, Derived, Observable};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let width = Observable::new(2);
/// let height = Observable::new(3);
/// let runs = Rc::new(Cell::new(0));
/// let area = {
///     let runs = runs.clone();
///     Derived::new((width.clone(), height.clone()), move |(w, h)| {
///         runs.set(runs.get() + 1);
///         w * h
///     })
///     .unwrap()
/// };
///
/// transaction(|| {
///     width.set(4).unwrap();
///     height.set(5).unwrap();
/// })
/// .unwrap();
///
/// assert_eq!(area.get().unwrap(), 20);
/// assert_eq!(runs.get(), 2); // construction + one recompute
/// ```
pub fn transaction<R>(f: impl FnOnce() -> R) -> Result<R> {
    with_context(|ctx| ctx.enter_transaction());

    // Restores depth even if `f` panics; deferred work is dropped then
    struct TransactionGuard;

    impl Drop for TransactionGuard {
        fn drop(&mut self) {
            let depth = with_context(|ctx| ctx.exit_transaction());
            if depth == 0 && std::thread::panicking() {
                let deferred = with_context(|ctx| {
                    ctx.take_pending();
                    ctx.take_deferred()
                });
                for cell in deferred {
                    cell.discard_deferred();
                }
            }
        }
    }

    let guard = TransactionGuard;
    let result = f();
    drop(guard);

    if with_context(|ctx| ctx.in_transaction()) {
        return Ok(result);
    }

    flush_deferred()?;
    Ok(result)
}

/// Deliver everything postponed by the transaction that just closed.
fn flush_deferred() -> Result<()> {
    let deferred = with_context(|ctx| ctx.take_deferred());
    tracing::trace!(cells = deferred.len(), "flushing transaction");

    let mut first_error = None;
    for cell in deferred {
        if let Err(err) = cell.flush_deferred() {
            first_error.get_or_insert(err);
        }
    }
    settle_pending();

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
