// ============================================================================
// axon-cells - Observable Cell
// The writable cell: stores a value and drives propagation waves
// ============================================================================
//
// A successful write commits the value, marks every derived downstream as
// stale and then runs one wave: this cell's listeners in registration order,
// followed by settlement of the stale deriveds. The cell stays NOTIFYING for
// the whole wave. Writes to it from inside the wave are rejected, or queued
// and replayed after the wave when the cell is reentrant.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::context::{config, in_transaction, tick, with_context};
use crate::core::error::{CellError, Result};
use crate::core::registry::ListenerRegistry;
use crate::core::types::{
    cell_label, default_equals, AnyCell, AnyDependent, CellId, EqualsFn, OwnerId,
};
use crate::primitives::options::{CellOptions, Validator};
use crate::primitives::read_cell::ReadCell;
use crate::primitives::read_only::ReadOnly;
use crate::reactivity::equality::safe_equals_f64;
use crate::reactivity::tracking::{mark_dependents, settle_pending, NotifyingGuard};

// =============================================================================
// OBSERVABLE INNER
// =============================================================================

/// Shared state behind every handle to one observable.
pub struct ObservableInner<T> {
    id: CellId,
    name: Option<String>,

    /// Flags bitmask (OBSERVABLE | CLEAN | REENTRANT? | NOTIFYING? | DISPOSED?)
    flags: Cell<u32>,

    value: RefCell<T>,

    /// Value `reset()` returns to
    initial: T,

    equals: EqualsFn<T>,
    validator: Option<Validator<T>>,

    /// Global version of the last committed change
    changed_at: Cell<u64>,

    /// Listeners, plus weak back-references to dependent deriveds
    listeners: ListenerRegistry<T>,

    /// Last write made while notifying (reentrant cells only)
    reentrant_queue: RefCell<Option<T>>,

    /// Value before the first write of the open transaction
    batch_previous: RefCell<Option<T>>,

    self_ref: Weak<ObservableInner<T>>,
}

impl<T: Clone + 'static> ObservableInner<T> {
    fn new(
        id: CellId,
        value: T,
        name: Option<String>,
        equals: EqualsFn<T>,
        validator: Option<Validator<T>>,
        reentrant: bool,
    ) -> Rc<Self> {
        let mut flags = OBSERVABLE | CLEAN;
        if reentrant {
            flags |= REENTRANT;
        }

        Rc::new_cyclic(|self_ref| Self {
            id,
            name,
            flags: Cell::new(flags),
            initial: value.clone(),
            value: RefCell::new(value),
            equals,
            validator,
            changed_at: Cell::new(0),
            listeners: ListenerRegistry::new(),
            reentrant_queue: RefCell::new(None),
            batch_previous: RefCell::new(None),
            self_ref: self_ref.clone(),
        })
    }

    pub(crate) fn get(&self) -> T {
        self.value.borrow().clone()
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    pub(crate) fn listeners(&self) -> &ListenerRegistry<T> {
        &self.listeners
    }

    // =========================================================================
    // WRITE PATH
    // =========================================================================

    fn set(&self, value: T) -> Result<bool> {
        if self.is_disposed() {
            return Err(CellError::Disposed { cell: self.label() });
        }

        if let Some(validator) = &self.validator {
            if let Err(err) = validator.validate(&self.label(), &value) {
                tracing::debug!(cell = %self.label(), error = %err, "rejected write");
                return Err(err);
            }
        }

        if self.is_notifying() {
            if self.is_reentrant() {
                // Last write wins, even one that restores the current value
                *self.reentrant_queue.borrow_mut() = Some(value);
                return Ok(false);
            }
            if (self.equals)(&self.value.borrow(), &value) {
                return Ok(false);
            }
            tracing::debug!(cell = %self.label(), "rejected reentrant write");
            return Err(CellError::Reentrancy { cell: self.label() });
        }

        let Some(previous) = self.commit(value) else {
            return Ok(false);
        };

        if in_transaction() {
            self.defer(previous);
            return Ok(true);
        }

        // Mid-flush writes take over the first previous value still deferred
        let first = self.batch_previous.borrow_mut().take();
        let previous = first.unwrap_or(previous);
        if (self.equals)(&self.value.borrow(), &previous) {
            settle_pending();
            return Ok(true);
        }

        self.run_wave(previous)?;
        Ok(true)
    }

    /// Store `value` and mark downstream stale. Returns the replaced value,
    /// or None if `value` is equal to the current one.
    fn commit(&self, value: T) -> Option<T> {
        let previous = {
            let mut current = self.value.borrow_mut();
            if (self.equals)(&current, &value) {
                return None;
            }
            std::mem::replace(&mut *current, value)
        };
        self.changed_at.set(tick());
        mark_dependents(self);
        Some(previous)
    }

    /// Keep the first previous value of this transaction and queue the
    /// notification for its end.
    fn defer(&self, previous: T) {
        let mut slot = self.batch_previous.borrow_mut();
        if slot.is_some() {
            return;
        }
        *slot = Some(previous);
        drop(slot);

        if let Some(me) = self.self_ref.upgrade() {
            let me: Rc<dyn AnyCell> = me;
            with_context(|ctx| ctx.defer(me));
        }
    }

    /// Notify listeners, settle downstream, then replay queued reentrant
    /// writes until none is left.
    fn run_wave(&self, previous: T) -> Result<()> {
        let limit = config().max_reentrant_replays;
        let mut previous = previous;
        let mut replays = 0;

        loop {
            {
                let _guard = NotifyingGuard::enter(self);
                let current = self.get();
                tracing::trace!(
                    cell = %self.label(),
                    depth = with_context(|ctx| ctx.wave_depth.get()),
                    listeners = self.listeners.len(),
                    "propagation wave"
                );
                self.listeners.notify(&current, Some(&previous));
                settle_pending();
            }

            let Some(next) = self.reentrant_queue.borrow_mut().take() else {
                return Ok(());
            };
            if self.is_disposed() {
                return Ok(());
            }
            if (self.equals)(&self.value.borrow(), &next) {
                return Ok(());
            }
            if replays >= limit {
                tracing::debug!(cell = %self.label(), limit, "reentrant writes did not settle");
                return Err(CellError::ReentrancyOverflow {
                    cell: self.label(),
                    limit,
                });
            }
            replays += 1;

            match self.commit(next) {
                Some(replaced) => previous = replaced,
                None => return Ok(()),
            }
        }
    }
}

// =============================================================================
// ANY CELL IMPLEMENTATION
// =============================================================================

impl<T: Clone + 'static> AnyCell for ObservableInner<T> {
    fn id(&self) -> CellId {
        self.id
    }

    fn label(&self) -> String {
        cell_label(self.name.as_deref(), self.id)
    }

    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn changed_at(&self) -> u64 {
        self.changed_at.get()
    }

    fn add_dependent(&self, dependent: Weak<dyn AnyDependent>) {
        if let Some(strong) = dependent.upgrade() {
            self.listeners.add_dependent(strong.dependent_id(), dependent);
        }
    }

    fn remove_dependent(&self, id: CellId) {
        self.listeners.remove_dependent(id);
    }

    fn dependent_count(&self) -> usize {
        self.listeners.dependent_count()
    }

    fn collect_dependents(&self) -> Vec<Rc<dyn AnyDependent>> {
        self.listeners.collect_dependents()
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn remove_owner_listeners(&self, owner: OwnerId) -> usize {
        self.listeners.remove_owner(owner)
    }

    fn flush_deferred(&self) -> Result<()> {
        let Some(previous) = self.batch_previous.borrow_mut().take() else {
            return Ok(());
        };
        if self.is_disposed() || (self.equals)(&self.value.borrow(), &previous) {
            return Ok(());
        }
        self.run_wave(previous)
    }

    fn discard_deferred(&self) {
        self.batch_previous.borrow_mut().take();
    }

    fn dispose(&self) {
        if self.is_disposed() {
            return;
        }
        self.set_flags(self.flags() | DISPOSED);
        let removed = self.listeners.clear();
        self.listeners.clear_dependents();
        self.reentrant_queue.borrow_mut().take();
        self.batch_previous.borrow_mut().take();
        tracing::debug!(cell = %self.label(), listeners = removed, "disposed observable");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// OBSERVABLE<T> - The public handle
// =============================================================================

/// A writable cell holding a value of type `T`.
///
/// Writing a different value notifies listeners and recomputes every derived
/// cell downstream before `set` returns. Writing an equal value does nothing.
///
/// # Example
///
/// ```
/// use axon_cells::{Observable, ReadCell};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let temperature = Observable::new(300.0);
/// let is_hot = temperature.map(|t| *t > 373.0).unwrap();
///
/// let flips = Rc::new(Cell::new(0));
/// {
///     let flips = flips.clone();
///     is_hot.lazy_link(move |_, _| flips.set(flips.get() + 1)).unwrap();
/// }
///
/// temperature.set(400.0).unwrap();
/// temperature.set(450.0).unwrap();
/// assert_eq!(flips.get(), 1);
/// assert!(is_hot.get().unwrap());
/// ```
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// Create an observable using `PartialEq` to detect changes.
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::new_with_equals(value, default_equals)
    }

    /// Create an observable with a custom equality function.
    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: ObservableInner::new(CellId::next(), value, None, equals, None, false),
        }
    }

    /// Create an observable from options. Fails with `InvalidValue` if the
    /// validator rejects the initial value.
    pub fn with_options(value: T, options: CellOptions<T>) -> Result<Self>
    where
        T: PartialEq,
    {
        let CellOptions {
            name,
            equality,
            validator,
            reentrant,
        } = options;

        let id = CellId::next();
        if let Some(validator) = &validator {
            validator.validate(&cell_label(name.as_deref(), id), &value)?;
        }

        Ok(Self {
            inner: ObservableInner::new(
                id,
                value,
                name,
                equality.unwrap_or(default_equals),
                validator,
                reentrant.unwrap_or(false),
            ),
        })
    }

    /// The current value. Never fails, also after disposal.
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Borrow the current value without cloning it.
    ///
    /// # Example
    ///
    /// ```
    /// use axon_cells::Observable;
    ///
    /// let items = Observable::new(vec![1, 2, 3]);
    /// assert_eq!(items.with(|v| v.iter().sum::<i32>()), 6);
    /// ```
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    /// Write a value, returning whether it changed.
    ///
    /// Fails with `Disposed`, `InvalidValue`, `Reentrancy` (a non-reentrant
    /// cell written from inside its own wave) or `ReentrancyOverflow`. A
    /// reentrant cell written from inside its own wave queues the value,
    /// returns `Ok(false)` and applies it once the wave completes.
    pub fn set(&self, value: T) -> Result<bool> {
        self.inner.set(value)
    }

    /// Modify a copy of the value in place and write it back.
    ///
    /// # Example
    ///
    /// ```
    /// use axon_cells::Observable;
    ///
    /// let count = Observable::new(0);
    /// count.update(|n| *n += 1).unwrap();
    /// assert_eq!(count.get(), 1);
    /// ```
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<bool> {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Write the value the cell was created with.
    pub fn reset(&self) -> Result<bool> {
        self.set(self.inner.initial.clone())
    }

    pub fn initial_value(&self) -> T {
        self.inner.initial.clone()
    }

    /// A view that can be read and linked but not written.
    pub fn read_only(&self) -> ReadOnly<T> {
        ReadOnly::from_inner(self.inner.clone())
    }

    /// A handle that does not keep the cell alive.
    pub fn downgrade(&self) -> WeakObservable<T> {
        WeakObservable {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn is_reentrant(&self) -> bool {
        self.inner.is_reentrant()
    }

    /// Idempotent. Clears listeners and dependents; later `set`, `link` and
    /// `unlink` fail with `Disposed`. `get` keeps returning the last value.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl Observable<bool> {
    /// Flip a boolean cell.
    pub fn toggle(&self) -> Result<bool> {
        self.set(!self.get())
    }
}

impl<T: Clone + 'static> ReadCell for Observable<T> {
    type Value = T;

    fn any_cell(&self) -> Rc<dyn AnyCell> {
        self.inner.clone()
    }

    fn listeners(&self) -> &ListenerRegistry<T> {
        self.inner.listeners()
    }

    fn current(&self) -> T {
        self.inner.get()
    }

    fn try_get(&self) -> Result<T> {
        Ok(self.inner.get())
    }
}

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("cell", &self.inner.label())
            .field("value", &*self.inner.value.borrow())
            .field("state", &self.inner.state())
            .finish()
    }
}

// =============================================================================
// WEAK HANDLE
// =============================================================================

/// Non-owning handle to an observable, for listeners that write back into a
/// cell without keeping it alive.
pub struct WeakObservable<T> {
    inner: Weak<ObservableInner<T>>,
}

impl<T> Clone for WeakObservable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> WeakObservable<T> {
    pub fn upgrade(&self) -> Option<Observable<T>> {
        self.inner.upgrade().map(|inner| Observable { inner })
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Create an observable.
///
/// # Example
///
/// ```
/// use axon_cells::observable;
///
/// let count = observable(0);
/// assert!(count.set(5).unwrap());
/// assert!(!count.set(5).unwrap());
/// ```
pub fn observable<T>(value: T) -> Observable<T>
where
    T: PartialEq + Clone + 'static,
{
    Observable::new(value)
}

/// Create an `f64` observable where NaN equals NaN.
pub fn observable_f64(value: f64) -> Observable<f64> {
    Observable::new_with_equals(value, safe_equals_f64)
}

// =============================================================================
// TESTS
// =============================================================================
