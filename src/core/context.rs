// ============================================================================
// axon-cells - Propagation Context
// Thread-local state shared by every cell on this thread
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::constants::MAX_REENTRANT_REPLAYS;
use super::types::{AnyCell, AnyDependent};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Per-thread propagation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationConfig {
    /// How many queued reentrant writes one `set` call may replay before
    /// failing with `ReentrancyOverflow`.
    pub max_reentrant_replays: u32,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            max_reentrant_replays: MAX_REENTRANT_REPLAYS,
        }
    }
}

// =============================================================================
// PROPAGATION CONTEXT
// =============================================================================

/// Thread-local graph state.
///
/// Cells are `Rc`-based and never leave their thread, so a thread-local is
/// enough: every wave runs to completion on the thread that started it.
pub struct PropagationContext {
    /// Allocator for cell, listener and owner ids
    pub next_id: Cell<u64>,

    /// Global change clock, bumped on every committed change
    pub version: Cell<u64>,

    /// Nesting depth of `transaction()` calls
    pub transaction_depth: Cell<u32>,

    /// Derived cells marked stale and waiting to settle
    pub pending: RefCell<Vec<Weak<dyn AnyDependent>>>,

    /// Observables whose notifications wait for the outermost transaction
    pub deferred: RefCell<Vec<Rc<dyn AnyCell>>>,

    /// Depth of nested propagation waves (for tracing)
    pub wave_depth: Cell<u32>,

    pub config: Cell<PropagationConfig>,
}

impl PropagationContext {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            version: Cell::new(1),
            transaction_depth: Cell::new(0),
            pending: RefCell::new(Vec::new()),
            deferred: RefCell::new(Vec::new()),
            wave_depth: Cell::new(0),
            config: Cell::new(PropagationConfig::default()),
        }
    }

    // =========================================================================
    // IDS AND VERSIONS
    // =========================================================================

    pub fn allocate_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Increment and return the change clock
    pub fn tick(&self) -> u64 {
        let v = self.version.get() + 1;
        self.version.set(v);
        v
    }

    pub fn current_version(&self) -> u64 {
        self.version.get()
    }

    // =========================================================================
    // PENDING DERIVEDS
    // =========================================================================

    pub fn enqueue_pending(&self, dependent: Weak<dyn AnyDependent>) {
        self.pending.borrow_mut().push(dependent);
    }

    pub fn take_pending(&self) -> Vec<Weak<dyn AnyDependent>> {
        self.pending.replace(Vec::new())
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Increment transaction depth, returns new depth
    pub fn enter_transaction(&self) -> u32 {
        let depth = self.transaction_depth.get() + 1;
        self.transaction_depth.set(depth);
        depth
    }

    /// Decrement transaction depth, returns new depth
    pub fn exit_transaction(&self) -> u32 {
        let depth = self.transaction_depth.get().saturating_sub(1);
        self.transaction_depth.set(depth);
        depth
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction_depth.get() > 0
    }

    pub fn defer(&self, cell: Rc<dyn AnyCell>) {
        self.deferred.borrow_mut().push(cell);
    }

    pub fn take_deferred(&self) -> Vec<Rc<dyn AnyCell>> {
        self.deferred.replace(Vec::new())
    }

    // =========================================================================
    // WAVES
    // =========================================================================

    pub fn enter_wave(&self) -> u32 {
        let depth = self.wave_depth.get() + 1;
        self.wave_depth.set(depth);
        depth
    }

    pub fn exit_wave(&self) {
        self.wave_depth.set(self.wave_depth.get().saturating_sub(1));
    }
}

impl Default for PropagationContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    static CONTEXT: PropagationContext = PropagationContext::new();
}

/// Access the thread-local propagation context.
pub fn with_context<R>(f: impl FnOnce(&PropagationContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

pub(crate) fn next_id() -> u64 {
    with_context(|ctx| ctx.allocate_id())
}

pub(crate) fn tick() -> u64 {
    with_context(|ctx| ctx.tick())
}

pub fn current_version() -> u64 {
    with_context(|ctx| ctx.current_version())
}

/// Whether a `transaction()` is open on this thread.
pub fn in_transaction() -> bool {
    with_context(|ctx| ctx.in_transaction())
}

/// Replace this thread's propagation settings.
pub fn configure(config: PropagationConfig) {
    with_context(|ctx| ctx.config.set(config));
}

/// This thread's propagation settings.
pub fn config() -> PropagationConfig {
    with_context(|ctx| ctx.config.get())
}
