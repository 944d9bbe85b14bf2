// ============================================================================
// axon-cells - Observable Cells with Eager, Glitch-Free Propagation
// ============================================================================
//
// Writable observables, derived cells computed from them, and the listener
// registry that connects both to the rest of a program. A write settles the
// whole graph before it returns: listeners run in registration order and
// every affected derived recomputes once, over current values only.
// ============================================================================

//! # axon-cells
//!
//! ```
//! use axon_cells::{Observable, ReadCell};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let temperature = Observable::new(300);
//! let is_hot = temperature.map(|t| *t > 373).unwrap();
//!
//! let notices = Rc::new(Cell::new(0));
//! {
//!     let notices = notices.clone();
//!     is_hot.lazy_link(move |_, _| notices.set(notices.get() + 1)).unwrap();
//! }
//!
//! temperature.set(400).unwrap();
//! assert_eq!(notices.get(), 1);
//! ```

pub mod core;
mod macros;
pub mod primitives;
pub mod reactivity;

// Re-export core items at crate root for ergonomic access
pub use core::constants;
pub use core::context::{
    config, configure, current_version, in_transaction, with_context, PropagationConfig,
    PropagationContext,
};
pub use core::error::{CellError, Result};
pub use core::registry::{Listener, ListenerRegistry};
pub use core::types::{
    default_equals, AnyCell, AnyDependent, CellId, CellState, EqualsFn, ListenerId, OwnerId,
};

// Re-export primitives at crate root
pub use primitives::coupled::CoupledPair;
pub use primitives::dependencies::Dependencies;
pub use primitives::derived::{derived, Derived};
pub use primitives::dynamic::DynamicCell;
pub use primitives::multilink::{lazy_multilink, multilink, Multilink};
pub use primitives::observable::{observable, observable_f64, Observable, WeakObservable};
pub use primitives::options::{CellOptions, DerivedOptions, LinkOptions, Validator};
pub use primitives::owner::ListenerOwner;
pub use primitives::read_cell::ReadCell;
pub use primitives::read_only::ReadOnly;

// Re-export reactivity functions
pub use reactivity::batching::transaction;
pub use reactivity::equality::{
    always_equals, equals, never_equals, safe_equals_f32, safe_equals_f64,
    safe_equals_option_f64, shallow_equals_vec,
};

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn counter<C: ReadCell>(cell: &C) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let sink = count.clone();
        cell.lazy_link(move |_, _| sink.set(sink.get() + 1))
            .unwrap();
        count
    }

    // =========================================================================
    // Graph
    // =========================================================================

    #[test]
    fn heterogeneous_cells_share_one_graph() {
        let count = Observable::new(1);
        let name = Observable::new(String::from("cell"));
        let label = Derived::new((name.clone(), count.clone()), |(n, c)| format!("{n}{c}")).unwrap();

        let cells: Vec<Rc<dyn AnyCell>> = vec![count.any_cell(), name.any_cell(), label.any_cell()];
        assert!(cells.iter().all(|cell| cell.is_clean()));
        assert_eq!(cells.iter().filter(|cell| cell.is_derived()).count(), 1);
    }

    // =========================================================================
    // Observable scenarios
    // =========================================================================

    #[test]
    fn temperature_and_is_hot() {
        let temperature = Observable::with_options(
            300.0,
            CellOptions::new().named("temperature").equality(safe_equals_f64),
        )
        .unwrap();
        let is_hot = temperature.map(|t| *t > 373.0).unwrap();
        let temperature_fired = counter(&temperature);
        let is_hot_fired = counter(&is_hot);

        temperature.set(400.0).unwrap();
        assert_eq!(temperature_fired.get(), 1);
        assert_eq!(is_hot_fired.get(), 1);
        assert!(is_hot.get().unwrap());

        temperature.set(450.0).unwrap();
        assert_eq!(temperature_fired.get(), 2);
        assert_eq!(is_hot_fired.get(), 1);
    }

    #[test]
    fn listener_of_derived_cannot_write_the_notifying_source() {
        let temperature =
            Observable::with_options(300, CellOptions::new().named("temperature")).unwrap();
        let is_hot = temperature.map(|t| *t > 373).unwrap();
        let failure = Rc::new(RefCell::new(None));
        {
            let temperature = temperature.downgrade();
            let failure = failure.clone();
            is_hot
                .lazy_link(move |_, _| {
                    if let Some(temperature) = temperature.upgrade() {
                        *failure.borrow_mut() = temperature.set(0).err();
                    }
                })
                .unwrap();
        }

        temperature.set(400).unwrap();
        let err = failure.borrow_mut().take().unwrap();
        assert!(err.to_string().contains("temperature#"));
        assert!(err.to_string().contains("while already notifying"));
        assert_eq!(temperature.get(), 400);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let a = Observable::new(0);
        for tag in ["l1", "l2", "l3"] {
            let order = order.clone();
            a.lazy_link(move |_, _| order.borrow_mut().push(tag)).unwrap();
        }
        a.set(1).unwrap();
        assert_eq!(*order.borrow(), vec!["l1", "l2", "l3"]);
    }

    #[test]
    fn unlink_unknown_listener_fails() {
        let a = Observable::new(0);
        let b = Observable::new(0);
        let id = b.link(|_, _| {}).unwrap();
        assert_eq!(
            a.unlink(id),
            Err(CellError::NotRegistered {
                cell: a.label(),
                listener: id
            })
        );
    }

    #[test]
    fn owner_tag_removes_in_bulk() {
        let a = Observable::new(0);
        let owner = OwnerId::next();
        a.link_with(|_, _| {}, LinkOptions::default().owned_by(owner))
            .unwrap();
        a.link_with(|_, _| {}, LinkOptions::default().lazy().owned_by(owner))
            .unwrap();
        a.link(|_, _| {}).unwrap();
        assert_eq!(a.unlink_owner(owner), 2);
        assert_eq!(a.listener_count(), 1);
    }

    #[test]
    fn per_thread_replay_limit() {
        let previous = config();
        configure(PropagationConfig {
            max_reentrant_replays: 3,
        });

        let a = Observable::with_options(0, CellOptions::new().reentrant(true)).unwrap();
        {
            let handle = a.downgrade();
            a.lazy_link(move |v, _| {
                if let Some(a) = handle.upgrade() {
                    a.set(v + 1).unwrap();
                }
            })
            .unwrap();
        }
        let err = a.set(1).unwrap_err();
        configure(previous);

        assert!(matches!(err, CellError::ReentrancyOverflow { limit: 3, .. }));
        assert_eq!(a.get(), 4);
    }

    #[test]
    fn version_clock_advances_on_change_only() {
        let a = Observable::new(0);
        let before = current_version();
        a.set(0).unwrap();
        assert_eq!(current_version(), before);
        a.set(1).unwrap();
        assert!(current_version() > before);
    }
}
