// ============================================================================
// axon-cells - Dynamic Cells
// A derived whose single upstream can be switched at runtime
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::constants::*;
use crate::core::error::{CellError, Result};
use crate::core::registry::ListenerRegistry;
use crate::core::types::{default_equals, AnyCell, AnyDependent};
use crate::primitives::derived::{ComputeFn, DerivedInner};
use crate::primitives::read_cell::ReadCell;
use crate::reactivity::tracking::{enqueue, ensure_acyclic, mark_dependents, settle_pending};

/// Mirrors whichever cell it currently targets, or a fallback value when it
/// has none.
///
/// Retargeting is the only way to close a loop in the graph, so `retarget`
/// checks the new target's upstream graph first and refuses with
/// `CyclicDependency` if it reaches this cell. A refused retarget changes
/// nothing.
///
/// # Example
///
/// ```
/// use axon_cells::{DynamicCell, Observable, ReadCell};
///
/// let left = Observable::new(1);
/// let right = Observable::new(2);
/// let selected = DynamicCell::new(0);
///
/// selected.retarget(&left).unwrap();
/// assert_eq!(selected.get().unwrap(), 1);
///
/// selected.retarget(&right).unwrap();
/// right.set(5).unwrap();
/// assert_eq!(selected.get().unwrap(), 5);
///
/// let echo = selected.map(|v| *v).unwrap();
/// assert!(selected.retarget(&echo).is_err());
/// ```
pub struct DynamicCell<T> {
    inner: Rc<DerivedInner<T>>,
    fallback: Rc<T>,
}

impl<T> Clone for DynamicCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

impl<T: PartialEq + Clone + 'static> DynamicCell<T> {
    /// An untargeted cell holding `fallback`.
    pub fn new(fallback: T) -> Self {
        let fallback = Rc::new(fallback);
        let inner = DerivedInner::build(
            None,
            default_equals,
            Vec::new(),
            Self::fallback_fn(&fallback),
            DERIVED | DYNAMIC,
        );
        Self { inner, fallback }
    }

    fn fallback_fn(fallback: &Rc<T>) -> ComputeFn<T> {
        let fallback = fallback.clone();
        Box::new(move || (*fallback).clone())
    }

    /// Follow `target` from now on. Listeners hear about the switch if the
    /// value changes.
    pub fn retarget<C>(&self, target: &C) -> Result<()>
    where
        C: ReadCell<Value = T>,
    {
        if self.inner.is_disposed() {
            return Err(CellError::Disposed {
                cell: self.inner.label(),
            });
        }
        let upstream = target.any_cell();
        if upstream.is_disposed() {
            return Err(CellError::Disposed {
                cell: upstream.label(),
            });
        }
        ensure_acyclic(self.inner.id(), &self.inner.label(), &upstream)?;

        tracing::debug!(cell = %self.inner.label(), target = %upstream.label(), "retargeted");
        let source = target.clone();
        self.inner
            .rewire(vec![upstream], Box::new(move || source.current()));
        self.propagate();
        Ok(())
    }

    /// Drop the target and fall back to the fallback value.
    pub fn clear_target(&self) -> Result<()> {
        if self.inner.is_disposed() {
            return Err(CellError::Disposed {
                cell: self.inner.label(),
            });
        }
        self.inner
            .rewire(Vec::new(), Self::fallback_fn(&self.fallback));
        self.propagate();
        Ok(())
    }

    /// Push the rewired value through the graph as one wave.
    fn propagate(&self) {
        mark_dependents(&*self.inner);
        let dependent: Rc<dyn AnyDependent> = self.inner.clone();
        enqueue(&dependent);
        settle_pending();
    }

    pub fn has_target(&self) -> bool {
        self.inner.has_dependencies()
    }

    pub fn get(&self) -> Result<T> {
        self.inner.read()
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl<T: Clone + 'static> ReadCell for DynamicCell<T> {
    type Value = T;

    fn any_cell(&self) -> Rc<dyn AnyCell> {
        self.inner.clone()
    }

    fn listeners(&self) -> &ListenerRegistry<T> {
        self.inner.listeners()
    }

    fn current(&self) -> T {
        self.inner.current()
    }

    fn try_get(&self) -> Result<T> {
        self.inner.read()
    }
}

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for DynamicCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicCell")
            .field("cell", &self.inner.label())
            .field("fallback", &*self.fallback)
            .field("targeted", &self.inner.has_dependencies())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
