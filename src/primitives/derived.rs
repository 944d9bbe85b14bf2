// ============================================================================
// axon-cells - Derived Cells
// Cached values recomputed from an ordered list of upstream cells
// ============================================================================
//
// A derived is both a cell (it has a value, listeners and dependents of its
// own) and a dependent (upstream cells mark it stale). Marking never
// recomputes. Recomputation happens when the derived is settled at the end
// of a wave, or earlier if something reads it while it is stale; either way
// it happens at most once per wave, over current values only.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::context::{current_version, tick};
use crate::core::error::{CellError, Result};
use crate::core::registry::ListenerRegistry;
use crate::core::types::{
    cell_label, default_equals, AnyCell, AnyDependent, CellId, EqualsFn, OwnerId,
};
use crate::primitives::dependencies::Dependencies;
use crate::primitives::options::DerivedOptions;
use crate::primitives::read_cell::ReadCell;
use crate::reactivity::tracking::{update_downstream_heights, NotifyingGuard};

/// Type-erased combination function: reads its inputs and combines them.
pub(crate) type ComputeFn<T> = Box<dyn Fn() -> T>;

// =============================================================================
// DERIVED INNER
// =============================================================================

/// Shared state behind a derived or dynamic cell.
pub struct DerivedInner<T> {
    id: CellId,
    name: Option<String>,

    /// Flags bitmask (DERIVED | DYNAMIC? | status | NOTIFYING? | DISPOSED?)
    flags: Cell<u32>,

    /// Dropped on disposal, releasing whatever it captured
    compute: RefCell<Option<ComputeFn<T>>>,

    value: RefCell<T>,
    equals: EqualsFn<T>,

    /// Upstream cells, in the order the combination function reads them
    deps: RefCell<Vec<Rc<dyn AnyCell>>>,

    height: Cell<usize>,

    /// Global version of the last change to `value`
    changed_at: Cell<u64>,

    /// Global version at which `value` was last known to be current
    verified_at: Cell<u64>,

    /// Earliest value not yet reported to listeners
    pending_previous: RefCell<Option<T>>,

    listeners: ListenerRegistry<T>,

    self_ref: Weak<DerivedInner<T>>,
}

impl<T: Clone + 'static> DerivedInner<T> {
    /// Compute the first value, then register with every upstream cell.
    pub(crate) fn build(
        name: Option<String>,
        equals: EqualsFn<T>,
        deps: Vec<Rc<dyn AnyCell>>,
        compute: ComputeFn<T>,
        type_flags: u32,
    ) -> Rc<Self> {
        let value = compute();
        let height = deps.iter().map(|dep| dep.height() + 1).max().unwrap_or(0);
        let version = current_version();

        let inner = Rc::new_cyclic(|self_ref| Self {
            id: CellId::next(),
            name,
            flags: Cell::new(type_flags | CLEAN),
            compute: RefCell::new(Some(compute)),
            value: RefCell::new(value),
            equals,
            deps: RefCell::new(deps),
            height: Cell::new(height),
            changed_at: Cell::new(version),
            verified_at: Cell::new(version),
            pending_previous: RefCell::new(None),
            listeners: ListenerRegistry::new(),
            self_ref: self_ref.clone(),
        });

        let weak: Weak<DerivedInner<T>> = Rc::downgrade(&inner);
        let weak: Weak<dyn AnyDependent> = weak;
        for dep in inner.deps.borrow().iter() {
            dep.add_dependent(weak.clone());
        }
        inner
    }

    pub(crate) fn listeners(&self) -> &ListenerRegistry<T> {
        &self.listeners
    }

    /// Up-to-date value, ignoring disposal.
    pub(crate) fn current(&self) -> T {
        self.refresh();
        self.value.borrow().clone()
    }

    pub(crate) fn read(&self) -> Result<T> {
        if self.is_disposed() {
            return Err(CellError::Disposed { cell: self.label() });
        }
        Ok(self.current())
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        if self.is_disposed() {
            return Err(CellError::Disposed { cell: self.label() });
        }
        self.refresh();
        Ok(f(&self.value.borrow()))
    }

    pub(crate) fn has_dependencies(&self) -> bool {
        !self.deps.borrow().is_empty()
    }

    // =========================================================================
    // RECOMPUTATION
    // =========================================================================

    /// Bring the value up to date if it is stale.
    ///
    /// Upstream deriveds are refreshed first. The combination function runs
    /// only if this cell is DIRTY or an upstream value changed since the
    /// last verification; a MAYBE_DIRTY cell whose inputs all turned out
    /// unchanged is just marked clean.
    fn refresh(&self) {
        let flags = self.flags();
        if flags & (CLEAN | DISPOSED) != 0 {
            return;
        }

        // Collect first: refreshing upstream must not overlap a deps borrow
        let deps: Vec<Rc<dyn AnyCell>> = self.deps.borrow().clone();
        for dep in &deps {
            dep.update_if_stale();
        }

        let verified_at = self.verified_at.get();
        let stale = flags & DIRTY != 0 || deps.iter().any(|dep| dep.changed_at() > verified_at);
        if stale {
            self.recompute();
        }

        self.verified_at.set(current_version());
        self.set_flags((self.flags() & STATUS_MASK) | CLEAN);
    }

    fn recompute(&self) {
        let next = {
            let compute = self.compute.borrow();
            match compute.as_ref() {
                Some(compute) => compute(),
                None => return,
            }
        };
        tracing::trace!(cell = %self.label(), "recomputed");

        let previous = {
            let mut value = self.value.borrow_mut();
            if (self.equals)(&value, &next) {
                return;
            }
            std::mem::replace(&mut *value, next)
        };
        self.changed_at.set(tick());

        let mut pending = self.pending_previous.borrow_mut();
        if pending.is_none() {
            *pending = Some(previous);
        }
    }

    /// Swap the upstream list and combination function, leaving the cell
    /// DIRTY. Used by dynamic cells when retargeted.
    pub(crate) fn rewire(self: &Rc<Self>, deps: Vec<Rc<dyn AnyCell>>, compute: ComputeFn<T>) {
        let old = self.deps.replace(Vec::new());
        for dep in &old {
            dep.remove_dependent(self.id);
        }

        let weak: Weak<DerivedInner<T>> = Rc::downgrade(self);
        let weak: Weak<dyn AnyDependent> = weak;
        for dep in &deps {
            dep.add_dependent(weak.clone());
        }
        *self.deps.borrow_mut() = deps;
        *self.compute.borrow_mut() = Some(compute);
        self.set_flags((self.flags() & STATUS_MASK) | DIRTY);
        if self.update_height() {
            update_downstream_heights(&**self);
        }
    }
}

// =============================================================================
// ANY CELL IMPLEMENTATION
// =============================================================================

impl<T: Clone + 'static> AnyCell for DerivedInner<T> {
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

    fn height(&self) -> usize {
        self.height.get()
    }

    fn update_height(&self) -> bool {
        let height = self
            .deps
            .borrow()
            .iter()
            .map(|dep| dep.height() + 1)
            .max()
            .unwrap_or(0);
        self.height.replace(height) != height
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

    fn for_each_dependency(&self, f: &mut dyn FnMut(&Rc<dyn AnyCell>)) {
        let deps: Vec<Rc<dyn AnyCell>> = self.deps.borrow().clone();
        for dep in &deps {
            f(dep);
        }
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn remove_owner_listeners(&self, owner: OwnerId) -> usize {
        self.listeners.remove_owner(owner)
    }

    fn update_if_stale(&self) {
        self.refresh();
    }

    fn dispose(&self) {
        if self.is_disposed() {
            return;
        }
        self.set_flags(self.flags() | DISPOSED);

        let deps = self.deps.replace(Vec::new());
        for dep in &deps {
            dep.remove_dependent(self.id);
        }
        self.compute.borrow_mut().take();
        self.pending_previous.borrow_mut().take();
        let removed = self.listeners.clear();
        self.listeners.clear_dependents();
        tracing::debug!(
            cell = %self.label(),
            dependencies = deps.len(),
            listeners = removed,
            "disposed derived"
        );
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// ANY DEPENDENT IMPLEMENTATION
// =============================================================================

impl<T: Clone + 'static> AnyDependent for DerivedInner<T> {
    fn dependent_id(&self) -> CellId {
        self.id
    }

    fn mark(&self, status: u32) -> bool {
        let flags = self.flags();
        if flags & DISPOSED != 0 {
            return false;
        }
        if flags & CLEAN != 0 {
            self.set_flags((flags & STATUS_MASK) | status);
            return true;
        }
        // Already queued; a direct change still upgrades MAYBE_DIRTY
        if status == DIRTY && flags & MAYBE_DIRTY != 0 {
            self.set_flags((flags & STATUS_MASK) | DIRTY);
        }
        false
    }

    fn rank(&self) -> usize {
        self.height.get()
    }

    fn settle(&self) {
        self.refresh();

        let Some(previous) = self.pending_previous.borrow_mut().take() else {
            return;
        };
        if self.is_disposed() {
            return;
        }

        let _guard = NotifyingGuard::enter(self);
        let current = self.value.borrow().clone();
        self.listeners.notify(&current, Some(&previous));
    }

    fn as_cell(&self) -> Option<Rc<dyn AnyCell>> {
        self.self_ref
            .upgrade()
            .map(|inner| inner as Rc<dyn AnyCell>)
    }
}

impl<T> Drop for DerivedInner<T> {
    fn drop(&mut self) {
        for dep in self.deps.get_mut().iter() {
            dep.remove_dependent(self.id);
        }
    }
}

// =============================================================================
// DERIVED<T> - The public handle
// =============================================================================

/// A read-only cell whose value is a pure function of other cells.
///
/// `get()` always equals the combination function applied to the current
/// values of the dependencies. When a dependency changes, the derived
/// recomputes once, after every other input written in the same wave has
/// been committed, and notifies its listeners only if its value changed.
///
/// The derived keeps its dependencies alive; they refer back to it weakly,
/// so dropping the last handle detaches it.
///
/// # Example
///
/// ```
/// use axon_cells::{Derived, Observable};
///
/// let mass = Observable::new(2.0);
/// let velocity = Observable::new(3.0);
/// let momentum = Derived::new((mass.clone(), velocity.clone()), |(m, v)| m * v).unwrap();
///
/// velocity.set(5.0).unwrap();
/// assert_eq!(momentum.get().unwrap(), 10.0);
/// ```
pub struct Derived<T> {
    inner: Rc<DerivedInner<T>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Derived<T> {
    /// Create a derived using `PartialEq` to detect changes.
    ///
    /// Fails with `Disposed` if any dependency has been disposed.
    pub fn new<D, F>(deps: D, f: F) -> Result<Self>
    where
        T: PartialEq,
        D: Dependencies,
        F: Fn(D::Values) -> T + 'static,
    {
        Self::build(deps, f, default_equals, None)
    }

    /// Create a derived with a custom equality function.
    pub fn new_with_equals<D, F>(deps: D, f: F, equals: EqualsFn<T>) -> Result<Self>
    where
        D: Dependencies,
        F: Fn(D::Values) -> T + 'static,
    {
        Self::build(deps, f, equals, None)
    }

    pub fn with_options<D, F>(deps: D, f: F, options: DerivedOptions<T>) -> Result<Self>
    where
        T: PartialEq,
        D: Dependencies,
        F: Fn(D::Values) -> T + 'static,
    {
        let equals = options.equality.unwrap_or(default_equals);
        Self::build(deps, f, equals, options.name)
    }

    fn build<D, F>(deps: D, f: F, equals: EqualsFn<T>, name: Option<String>) -> Result<Self>
    where
        D: Dependencies,
        F: Fn(D::Values) -> T + 'static,
    {
        let cells = deps.cells();
        if let Some(dead) = cells.iter().find(|cell| cell.is_disposed()) {
            return Err(CellError::Disposed { cell: dead.label() });
        }

        let compute: ComputeFn<T> = Box::new(move || f(deps.values()));
        Ok(Self {
            inner: DerivedInner::build(name, equals, cells, compute, DERIVED),
        })
    }

    /// The current value. Fails with `Disposed` after disposal.
    pub fn get(&self) -> Result<T> {
        self.inner.read()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.inner.with(f)
    }

    /// Idempotent. Unregisters from every dependency and drops the
    /// combination function and listeners.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl<T: Clone + 'static> ReadCell for Derived<T> {
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

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("cell", &self.inner.label())
            .field("value", &*self.inner.value.borrow())
            .field("state", &self.inner.state())
            .finish()
    }
}

/// Create a derived cell.
///
/// # Example
///
/// ```
/// use axon_cells::{derived, observable};
///
/// let celsius = observable(100.0);
/// let fahrenheit = derived((celsius.clone(),), |(c,)| c * 9.0 / 5.0 + 32.0).unwrap();
/// assert_eq!(fahrenheit.get().unwrap(), 212.0);
/// ```
pub fn derived<T, D, F>(deps: D, f: F) -> Result<Derived<T>>
where
    T: PartialEq + Clone + 'static,
    D: Dependencies,
    F: Fn(D::Values) -> T + 'static,
{
    Derived::new(deps, f)
}

// =============================================================================
// TESTS
// =============================================================================
