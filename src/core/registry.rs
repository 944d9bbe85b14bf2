// ============================================================================
// axon-cells - Listener Registry
// Ordered listener list plus weak back-references to dependent cells
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::types::{AnyDependent, CellId, ListenerId, OwnerId};

/// Listener callback: `(new value, previous value)`.
/// The previous value is `None` for the immediate call made by `link`.
pub type Listener<T> = Rc<dyn Fn(&T, Option<&T>)>;

struct ListenerEntry<T> {
    id: ListenerId,
    owner: Option<OwnerId>,
    callback: Listener<T>,
    /// Cleared on removal so an in-flight snapshot skips the entry
    live: Rc<Cell<bool>>,
}

/// Per-cell subscriptions.
///
/// Listeners run in registration order. Notification walks a snapshot, so
/// listeners may link, unlink or dispose during a wave: a listener removed
/// before its turn is skipped, one added mid-wave first runs next wave.
pub struct ListenerRegistry<T> {
    entries: RefCell<Vec<ListenerEntry<T>>>,
    dependents: RefCell<Vec<(CellId, Weak<dyn AnyDependent>)>>,
}

impl<T> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            dependents: RefCell::new(Vec::new()),
        }
    }

    // =========================================================================
    // LISTENERS
    // =========================================================================

    pub fn add_listener(&self, callback: Listener<T>, owner: Option<OwnerId>) -> ListenerId {
        let id = ListenerId::next();
        self.entries.borrow_mut().push(ListenerEntry {
            id,
            owner,
            callback,
            live: Rc::new(Cell::new(true)),
        });
        id
    }

    /// Returns false if `id` was not registered here.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().position(|entry| entry.id == id) {
            Some(index) => {
                let entry = entries.remove(index);
                entry.live.set(false);
                true
            }
            None => false,
        }
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.entries.borrow().iter().any(|entry| entry.id == id)
    }

    pub fn remove_owner(&self, owner: OwnerId) -> usize {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|entry| {
            let keep = entry.owner != Some(owner);
            if !keep {
                entry.live.set(false);
            }
            keep
        });
        before - entries.len()
    }

    pub fn clear(&self) -> usize {
        let removed: Vec<_> = self.entries.borrow_mut().drain(..).collect();
        for entry in &removed {
            entry.live.set(false);
        }
        removed.len()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Invoke every listener registered when the call starts.
    ///
    /// BORROW SAFETY: the entry list is copied out first, so listeners are
    /// free to touch this registry while running.
    pub fn notify(&self, value: &T, previous: Option<&T>) {
        let snapshot: Vec<(Rc<Cell<bool>>, Listener<T>)> = self
            .entries
            .borrow()
            .iter()
            .map(|entry| (entry.live.clone(), entry.callback.clone()))
            .collect();

        for (live, callback) in snapshot {
            if live.get() {
                callback(value, previous);
            }
        }
    }

    // =========================================================================
    // DEPENDENTS
    // =========================================================================

    pub fn add_dependent(&self, id: CellId, dependent: Weak<dyn AnyDependent>) {
        let mut dependents = self.dependents.borrow_mut();
        if !dependents.iter().any(|(existing, _)| *existing == id) {
            dependents.push((id, dependent));
        }
    }

    pub fn remove_dependent(&self, id: CellId) {
        self.dependents
            .borrow_mut()
            .retain(|(existing, _)| *existing != id);
    }

    pub fn dependent_count(&self) -> usize {
        self.dependents.borrow().len()
    }

    pub fn collect_dependents(&self) -> Vec<Rc<dyn AnyDependent>> {
        let mut dependents = self.dependents.borrow_mut();
        dependents.retain(|(_, weak)| weak.strong_count() > 0);
        dependents
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .collect()
    }

    pub fn clear_dependents(&self) {
        self.dependents.borrow_mut().clear();
    }
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
