// Disposal and drop behaviour: what stops running, and what is released,
// when cells, owners and multilinks go away.

mod common;

use axon_cells::{
    multilink, CellError, CellState, CoupledPair, Derived, ListenerOwner, Observable, ReadCell,
};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_dropped_derived_stops_recomputing() {
    common::init_tracing();

    let runs = Rc::new(Cell::new(0));
    let source = Observable::new(0);

    {
        let counter = runs.clone();
        let _doubled = Derived::new((source.clone(),), move |(v,)| {
            counter.set(counter.get() + 1);
            v * 2
        })
        .unwrap();
        assert_eq!(runs.get(), 1);

        source.set(1).unwrap();
        assert_eq!(runs.get(), 2);
        // _doubled drops here
    }

    source.set(2).unwrap();
    assert_eq!(runs.get(), 2, "dropped derived should not recompute");
    assert_eq!(source.any_cell().dependent_count(), 0);
}

#[test]
fn test_disposed_derived_releases_its_closure() {
    let captured = Rc::new(());
    let source = Observable::new(0);
    let derived = {
        let captured = captured.clone();
        source
            .map(move |v| {
                let _ = &captured;
                *v
            })
            .unwrap()
    };
    assert_eq!(Rc::strong_count(&captured), 2);

    derived.dispose();
    assert_eq!(Rc::strong_count(&captured), 1);
}

#[test]
fn test_derived_keeps_dependencies_alive() {
    let derived = {
        let source = Observable::new(5);
        source.map(|v| v + 1).unwrap()
    };
    // The only handle to the source was dropped; the derived still reads it
    assert_eq!(derived.get().unwrap(), 6);
}

#[test]
fn test_disposal_is_idempotent_everywhere() {
    let source = Observable::new(1);
    let derived = source.map(|v| v * 3).unwrap();
    let owner = ListenerOwner::new();
    owner.link(&derived, |_, _| {}).unwrap();

    for _ in 0..2 {
        owner.dispose();
        derived.dispose();
        source.dispose();
    }

    assert_eq!(source.state(), CellState::Disposed);
    assert_eq!(derived.state(), CellState::Disposed);
    assert!(owner.is_disposed());
}

#[test]
fn test_operations_after_dispose_fail_with_disposed() {
    let source = Observable::new(1);
    let id = source.link(|_, _| {}).unwrap();
    source.dispose();

    assert!(matches!(source.set(2), Err(CellError::Disposed { .. })));
    assert!(matches!(source.unlink(id), Err(CellError::Disposed { .. })));
    assert!(matches!(source.lazy_link(|_, _| {}), Err(CellError::Disposed { .. })));
    assert!(matches!(source.map(|v| v + 1), Err(CellError::Disposed { .. })));
    assert_eq!(source.get(), 1);
}

#[test]
fn test_owner_drop_unlinks_everything() {
    let a = Observable::new(0);
    let b = Observable::new(0);
    let fired = Rc::new(Cell::new(0));

    {
        let view = ListenerOwner::new();
        for cell in [&a, &b] {
            let fired = fired.clone();
            view.lazy_link(cell, move |_, _| fired.set(fired.get() + 1))
                .unwrap();
        }
        a.set(1).unwrap();
        assert_eq!(fired.get(), 1);
        // view drops here
    }

    a.set(2).unwrap();
    b.set(2).unwrap();
    assert_eq!(fired.get(), 1, "listeners should be gone with their owner");
}

#[test]
fn test_multilink_drop_stops_listener() {
    let a = Observable::new(0);
    let b = Observable::new(0);
    let fired = Rc::new(Cell::new(0));

    {
        let sink = fired.clone();
        let _link = multilink((a.clone(), b.clone()), move |_| sink.set(sink.get() + 1))
            .unwrap();
        a.set(1).unwrap();
        assert_eq!(fired.get(), 2);
    }

    a.set(2).unwrap();
    assert_eq!(fired.get(), 2);
    assert_eq!(a.any_cell().dependent_count(), 0);
    assert_eq!(b.any_cell().dependent_count(), 0);
}

#[test]
fn test_coupled_pair_does_not_leak_through_its_links() {
    let pair = CoupledPair::new(1, |p: &i32| p * 10, |s: &i32| s / 10).unwrap();
    let primary = pair.primary();
    drop(pair);

    // The pair's listeners hold only weak handles, so the views outlive it
    // and still read the last value.
    assert_eq!(primary.get(), 1);
}
