// ============================================================================
// axon-cells - Listener Owners
// Group listeners and cells a component created, and tear them down together
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::error::{CellError, Result};
use crate::core::types::{AnyCell, CellId, ListenerId, OwnerId};
use crate::primitives::options::LinkOptions;
use crate::primitives::read_cell::ReadCell;

struct OwnerInner {
    id: OwnerId,
    /// Cells holding at least one listener tagged with `id`
    linked: RefCell<Vec<(CellId, Weak<dyn AnyCell>)>>,
    /// Cells disposed together with the owner
    owned: RefCell<Vec<Rc<dyn AnyCell>>>,
    disposed: Cell<bool>,
}

impl OwnerInner {
    fn dispose(&self) -> usize {
        if self.disposed.replace(true) {
            return 0;
        }

        let linked = self.linked.take();
        let owned = self.owned.take();

        let removed: usize = linked
            .iter()
            .filter_map(|(_, cell)| cell.upgrade())
            .map(|cell| cell.remove_owner_listeners(self.id))
            .sum();
        for cell in &owned {
            cell.dispose();
        }

        tracing::debug!(
            owner = %self.id,
            listeners = removed,
            cells = owned.len(),
            "disposed owner"
        );
        removed
    }
}

impl Drop for OwnerInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Scope for the listeners a component attaches to cells it does not own.
///
/// Every `link` made through the owner is tagged with its `OwnerId`; cells
/// handed to `own` live as long as the owner. `dispose()`, or dropping the
/// last handle, unlinks all of those listeners and disposes the owned cells.
///
/// # Example
///
/// ```
/// use axon_cells::{ListenerOwner, Observable, ReadCell};
///
/// let model = Observable::new(0);
/// let view = ListenerOwner::new();
///
/// view.link(&model, |value, _| println!("model is {value}")).unwrap();
/// let label = model.map(|v| format!("{v} items")).unwrap();
/// view.own(&label).unwrap();
///
/// assert_eq!(model.listener_count(), 1);
/// drop(view);
/// assert_eq!(model.listener_count(), 0);
/// assert!(label.is_disposed());
/// ```
#[derive(Clone)]
pub struct ListenerOwner {
    inner: Rc<OwnerInner>,
}

impl ListenerOwner {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(OwnerInner {
                id: OwnerId::next(),
                linked: RefCell::new(Vec::new()),
                owned: RefCell::new(Vec::new()),
                disposed: Cell::new(false),
            }),
        }
    }

    pub fn id(&self) -> OwnerId {
        self.inner.id
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(CellError::Disposed {
                cell: self.inner.id.to_string(),
            });
        }
        Ok(())
    }

    fn track(&self, cell: Rc<dyn AnyCell>) {
        let id = cell.id();
        let mut linked = self.inner.linked.borrow_mut();
        if !linked.iter().any(|(existing, _)| *existing == id) {
            linked.push((id, Rc::downgrade(&cell)));
        }
    }

    /// `cell.link(listener)`, tagged with this owner.
    pub fn link<C, F>(&self, cell: &C, listener: F) -> Result<ListenerId>
    where
        C: ReadCell,
        F: Fn(&C::Value, Option<&C::Value>) + 'static,
    {
        self.link_with(cell, listener, LinkOptions::default())
    }

    /// `cell.lazy_link(listener)`, tagged with this owner.
    pub fn lazy_link<C, F>(&self, cell: &C, listener: F) -> Result<ListenerId>
    where
        C: ReadCell,
        F: Fn(&C::Value, Option<&C::Value>) + 'static,
    {
        self.link_with(cell, listener, LinkOptions::default().lazy())
    }

    fn link_with<C, F>(&self, cell: &C, listener: F, options: LinkOptions) -> Result<ListenerId>
    where
        C: ReadCell,
        F: Fn(&C::Value, Option<&C::Value>) + 'static,
    {
        self.ensure_active()?;
        let id = cell.link_with(listener, options.owned_by(self.inner.id))?;
        self.track(cell.any_cell());
        Ok(id)
    }

    /// Keep `cell` alive until the owner is disposed, then dispose it.
    pub fn own<C: ReadCell>(&self, cell: &C) -> Result<()> {
        self.ensure_active()?;
        self.inner.owned.borrow_mut().push(cell.any_cell());
        Ok(())
    }

    /// Unlink every listener made through this owner and dispose every owned
    /// cell. Returns how many listeners were removed. Idempotent.
    pub fn dispose(&self) -> usize {
        self.inner.dispose()
    }
}

impl Default for ListenerOwner {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
