// ============================================================================
// axon-cells - Type Definitions
// Identifiers and the type-erased traits the propagation graph runs on
// ============================================================================

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use super::constants::*;
use super::context::next_id;
use super::error::Result;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identity of a cell. Unique per thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    pub(crate) fn next() -> Self {
        Self(next_id())
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle returned by `link`, used to `unlink` that listener later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        Self(next_id())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Token tagging listeners that belong to one component, for bulk removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
    pub(crate) fn next() -> Self {
        Self(next_id())
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner#{}", self.0)
    }
}

/// Builds the `name#id` label used in errors and logs.
pub(crate) fn cell_label(name: Option<&str>, id: CellId) -> String {
    match name {
        Some(name) => format!("{name}{id}"),
        None => format!("cell{id}"),
    }
}

// =============================================================================
// EQUALITY
// =============================================================================

/// Equality function deciding whether a write is a change.
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Default equality using PartialEq
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// CELL STATE
// =============================================================================

/// Lifecycle state of a cell.
///
/// `Active -> Notifying -> Active` once per propagation wave,
/// `Active -> Disposed` once, with no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Active,
    Notifying,
    Disposed,
}

// =============================================================================
// TYPE-ERASED TRAITS
// =============================================================================
//
// Graph operations (marking, settling, cycle walks, bulk unlinking) never
// need the value type. Observables and deriveds implement `AnyCell` so they
// can sit together in `Vec<Rc<dyn AnyCell>>` dependency lists; deriveds also
// implement `AnyDependent` so upstream cells can hold `Weak` back-references
// to them without knowing `T`.
// =============================================================================

/// Type-erased view of any cell (observable or derived).
pub trait AnyCell: Any {
    fn id(&self) -> CellId;

    /// `name#id`, used in errors and logs
    fn label(&self) -> String;

    fn flags(&self) -> u32;

    fn set_flags(&self, flags: u32);

    /// Global version at which the value last changed
    fn changed_at(&self) -> u64;

    /// Distance from the furthest observable upstream (observables are 0)
    fn height(&self) -> usize {
        0
    }

    /// Recompute the height from the current dependencies. Returns true if
    /// it changed. Observables always stay at 0.
    fn update_height(&self) -> bool {
        false
    }

    /// Register a derived cell to be marked when this cell changes.
    fn add_dependent(&self, dependent: Weak<dyn AnyDependent>);

    fn remove_dependent(&self, id: CellId);

    fn dependent_count(&self) -> usize;

    /// Live dependents, in registration order. Dead entries are pruned.
    fn collect_dependents(&self) -> Vec<Rc<dyn AnyDependent>>;

    /// Visit the cells this one reads from (none for observables).
    fn for_each_dependency(&self, _f: &mut dyn FnMut(&Rc<dyn AnyCell>)) {}

    fn listener_count(&self) -> usize;

    /// Remove every listener tagged with `owner`, returning how many.
    fn remove_owner_listeners(&self, owner: OwnerId) -> usize;

    /// Bring a stale derived up to date. No-op for observables.
    fn update_if_stale(&self) {}

    /// Deliver a notification postponed by a transaction.
    fn flush_deferred(&self) -> Result<()> {
        Ok(())
    }

    /// Forget a postponed notification (the transaction panicked).
    fn discard_deferred(&self) {}

    fn dispose(&self);

    fn as_any(&self) -> &dyn Any;

    fn is_derived(&self) -> bool {
        self.flags() & DERIVED != 0
    }

    fn is_reentrant(&self) -> bool {
        self.flags() & REENTRANT != 0
    }

    fn is_notifying(&self) -> bool {
        self.flags() & NOTIFYING != 0
    }

    fn is_disposed(&self) -> bool {
        self.flags() & DISPOSED != 0
    }

    fn is_dirty(&self) -> bool {
        self.flags() & DIRTY != 0
    }

    fn is_maybe_dirty(&self) -> bool {
        self.flags() & MAYBE_DIRTY != 0
    }

    fn is_clean(&self) -> bool {
        self.flags() & CLEAN != 0
    }

    fn state(&self) -> CellState {
        let flags = self.flags();
        if flags & DISPOSED != 0 {
            CellState::Disposed
        } else if flags & NOTIFYING != 0 {
            CellState::Notifying
        } else {
            CellState::Active
        }
    }
}

/// Type-erased view of a cell that recomputes from upstream cells.
pub trait AnyDependent: Any {
    fn dependent_id(&self) -> CellId;

    /// Raise freshness to `status` (DIRTY or MAYBE_DIRTY).
    /// Returns true only if the cell was clean before, i.e. newly queued.
    fn mark(&self, status: u32) -> bool;

    /// Ordering key for settlement: dependencies settle before dependents.
    fn rank(&self) -> usize;

    /// Recompute if stale, then notify listeners if the value changed.
    fn settle(&self);

    /// The same node seen as a cell, so marking can cascade through it.
    fn as_cell(&self) -> Option<Rc<dyn AnyCell>>;
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = CellId::next();
        let b = CellId::next();
        assert_ne!(a, b);
        assert_ne!(ListenerId::next(), ListenerId::next());
    }

    #[test]
    fn labels_include_name_and_id() {
        let id = CellId::next();
        assert_eq!(cell_label(Some("temperature"), id), format!("temperature#{}", id.as_u64()));
        assert_eq!(cell_label(None, id), format!("cell#{}", id.as_u64()));
    }

    #[test]
    fn default_equality_uses_partial_eq() {
        assert!(default_equals(&3, &3));
        assert!(!default_equals(&"a", &"b"));
    }
}
