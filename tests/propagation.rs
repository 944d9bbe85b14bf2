// End-to-end propagation scenarios: observables, chains of deriveds,
// transactions, reentrancy and cycles working together.

mod common;

use axon_cells::{
    multilink, observable_f64, transaction, CellError, CellOptions, CellState, Derived,
    DynamicCell, Observable, ReadCell,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn log_changes<C: ReadCell>(cell: &C) -> Rc<RefCell<Vec<(C::Value, Option<C::Value>)>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    cell.lazy_link(move |value: &C::Value, previous: Option<&C::Value>| {
        sink.borrow_mut().push((value.clone(), previous.cloned()))
    })
    .unwrap();
    log
}

// =============================================================================
// Heat model: temperature -> is_hot -> warning text
// =============================================================================

#[test]
fn heat_model_notifies_only_real_changes() {
    common::init_tracing();

    let temperature = observable_f64(300.0);
    let is_hot = temperature.map(|t| *t > 373.0).unwrap();
    let warning = is_hot
        .map(|hot| if *hot { "boiling" } else { "calm" }.to_string())
        .unwrap();

    let temperature_log = log_changes(&temperature);
    let is_hot_log = log_changes(&is_hot);
    let warning_log = log_changes(&warning);

    temperature.set(400.0).unwrap();
    temperature.set(450.0).unwrap();
    temperature.set(450.0).unwrap();
    temperature.set(20.0).unwrap();

    assert_eq!(
        *temperature_log.borrow(),
        vec![(400.0, Some(300.0)), (450.0, Some(400.0)), (20.0, Some(450.0))]
    );
    assert_eq!(*is_hot_log.borrow(), vec![(true, Some(false)), (false, Some(true))]);
    assert_eq!(
        *warning_log.borrow(),
        vec![
            ("boiling".to_string(), Some("calm".to_string())),
            ("calm".to_string(), Some("boiling".to_string())),
        ]
    );
}

#[test]
fn listeners_see_every_derived_already_updated() {
    common::init_tracing();

    let x = Observable::new(1);
    let squared = x.map(|v| v * v).unwrap();
    let cubed = Derived::new((x.clone(), squared.clone()), |(x, sq)| x * sq).unwrap();

    let snapshots = Rc::new(RefCell::new(Vec::new()));
    {
        let squared = squared.clone();
        let cubed = cubed.clone();
        let snapshots = snapshots.clone();
        x.lazy_link(move |x, _| {
            snapshots
                .borrow_mut()
                .push((*x, squared.get().unwrap(), cubed.get().unwrap()))
        })
        .unwrap();
    }

    x.set(2).unwrap();
    x.set(3).unwrap();
    assert_eq!(*snapshots.borrow(), vec![(2, 4, 8), (3, 9, 27)]);
}

#[test]
fn long_chain_settles_before_set_returns() {
    let source = Observable::new(0u64);
    let mut chain: Vec<Derived<u64>> = Vec::new();
    let mut last = source.map(|v| v + 1).unwrap();
    for _ in 0..50 {
        chain.push(last.clone());
        last = last.map(|v| v + 1).unwrap();
    }

    source.set(100).unwrap();
    assert!(chain.iter().all(|cell| cell.any_cell().is_clean()));
    assert_eq!(last.get().unwrap(), 151);
}

// =============================================================================
// Combined setter
// =============================================================================

#[test]
fn transaction_is_glitch_free_for_every_reader() {
    common::init_tracing();

    let width = Observable::new(2);
    let height = Observable::new(3);
    let runs = Rc::new(Cell::new(0));
    let area = {
        let runs = runs.clone();
        Derived::new((width.clone(), height.clone()), move |(w, h)| {
            runs.set(runs.get() + 1);
            w * h
        })
        .unwrap()
    };
    let seen = Rc::new(RefCell::new(Vec::new()));
    let _both = {
        let seen = seen.clone();
        multilink((width.clone(), height.clone(), area.clone()), move |(w, h, a)| {
            seen.borrow_mut().push((*w, *h, *a))
        })
        .unwrap()
    };

    transaction(|| {
        width.set(5).unwrap();
        height.set(7).unwrap();
    })
    .unwrap();

    assert_eq!(runs.get(), 2);
    assert_eq!(*seen.borrow(), vec![(2, 3, 6), (5, 7, 35)]);
}

#[test]
fn transaction_result_is_returned() {
    let a = Observable::new(1);
    let doubled = transaction(|| {
        a.set(21).unwrap();
        a.get() * 2
    })
    .unwrap();
    assert_eq!(doubled, 42);
}

#[test]
fn transaction_surfaces_deferred_overflow() {
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

    let outcome = transaction(|| a.set(1).unwrap());
    assert!(matches!(outcome, Err(CellError::ReentrancyOverflow { .. })));
    assert_eq!(a.state(), CellState::Active);
}

// =============================================================================
// Reentrancy
// =============================================================================

#[test]
fn reentrant_correction_is_notified_exactly_once_more() {
    common::init_tracing();

    let angle = Observable::with_options(0, CellOptions::new().named("angle").reentrant(true))
        .unwrap();
    let log = log_changes(&angle);
    {
        // Keep the angle in [0, 360)
        let handle = angle.downgrade();
        angle
            .lazy_link(move |v: &i32, _| {
                if let Some(angle) = handle.upgrade() {
                    angle.set(v.rem_euclid(360)).unwrap();
                }
            })
            .unwrap();
    }

    angle.set(370).unwrap();
    assert_eq!(angle.get(), 10);
    assert_eq!(*log.borrow(), vec![(370, Some(0)), (10, Some(370))]);
}

#[test]
fn nested_waves_across_cells() {
    let a = Observable::new(0);
    let b = Observable::new(0);
    let b_doubled = b.map(|v| v * 2).unwrap();
    {
        let b = b.clone();
        a.lazy_link(move |v, _| {
            b.set(v + 1).unwrap();
        })
        .unwrap();
    }
    let seen = Rc::new(Cell::new(0));
    {
        let seen = seen.clone();
        let b_doubled = b_doubled.clone();
        a.lazy_link(move |_, _| seen.set(b_doubled.get().unwrap()))
            .unwrap();
    }

    a.set(4).unwrap();
    assert_eq!(b.get(), 5);
    assert_eq!(seen.get(), 10);
}

// =============================================================================
// Cycles
// =============================================================================

#[test]
fn closing_a_loop_through_a_dynamic_cell_is_rejected() {
    common::init_tracing();

    let seed = Observable::new(1);
    let selector = DynamicCell::new(0);
    selector.retarget(&seed).unwrap();
    let total = Derived::new((selector.clone(), seed.clone()), |(s, x)| s + x).unwrap();
    let log = log_changes(&total);

    let err = selector.retarget(&total).unwrap_err();
    assert!(matches!(err, CellError::CyclicDependency { .. }));
    assert!(log.borrow().is_empty());
    assert_eq!(total.get().unwrap(), 2);
}
