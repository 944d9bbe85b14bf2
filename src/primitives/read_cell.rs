// ============================================================================
// axon-cells - Readable Cells
// The link/unlink surface shared by observables, deriveds and views
// ============================================================================

use std::rc::Rc;

use crate::core::error::{CellError, Result};
use crate::core::registry::{Listener, ListenerRegistry};
use crate::core::types::{AnyCell, CellId, CellState, ListenerId, OwnerId};
use crate::primitives::derived::Derived;
use crate::primitives::options::LinkOptions;

/// Anything that holds a value and notifies listeners when it changes.
///
/// Implemented by `Observable`, `ReadOnly`, `Derived` and `DynamicCell`.
/// Handles are cheap to clone; clones refer to the same cell.
///
/// # Example
///
/// ```
/// use axon_cells::{Observable, ReadCell};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let count = Observable::new(1);
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let id = {
///     let seen = seen.clone();
///     count
///         .link(move |value, previous| seen.borrow_mut().push((*value, previous.copied())))
///         .unwrap()
/// };
/// count.set(2).unwrap();
/// count.unlink(id).unwrap();
/// count.set(3).unwrap();
///
/// assert_eq!(*seen.borrow(), vec![(1, None), (2, Some(1))]);
/// ```
pub trait ReadCell: Clone + 'static {
    type Value: Clone + 'static;

    /// The type-erased node behind this handle.
    fn any_cell(&self) -> Rc<dyn AnyCell>;

    #[doc(hidden)]
    fn listeners(&self) -> &ListenerRegistry<Self::Value>;

    /// Up-to-date value without the disposal check, used by combination
    /// functions reading their dependencies.
    #[doc(hidden)]
    fn current(&self) -> Self::Value;

    /// The current value, or `Disposed` for a disposed derived.
    fn try_get(&self) -> Result<Self::Value>;

    fn id(&self) -> CellId {
        self.any_cell().id()
    }

    /// `name#id`
    fn label(&self) -> String {
        self.any_cell().label()
    }

    fn state(&self) -> CellState {
        self.any_cell().state()
    }

    fn is_disposed(&self) -> bool {
        self.any_cell().is_disposed()
    }

    // =========================================================================
    // LINKING
    // =========================================================================

    /// Register `listener`, configured by `options`.
    ///
    /// With `call_immediately` the listener runs once with `(current, None)`
    /// before this returns.
    fn link_with<F>(&self, listener: F, options: LinkOptions) -> Result<ListenerId>
    where
        F: Fn(&Self::Value, Option<&Self::Value>) + 'static,
    {
        let cell = self.any_cell();
        if cell.is_disposed() {
            return Err(CellError::Disposed { cell: cell.label() });
        }

        let listener: Listener<Self::Value> = Rc::new(listener);
        let id = self.listeners().add_listener(listener.clone(), options.owner);
        if options.call_immediately {
            let value = self.current();
            listener(&value, None);
        }
        Ok(id)
    }

    /// Register `listener` and call it immediately with the current value.
    fn link<F>(&self, listener: F) -> Result<ListenerId>
    where
        F: Fn(&Self::Value, Option<&Self::Value>) + 'static,
    {
        self.link_with(listener, LinkOptions::default())
    }

    /// Register `listener` without calling it until the next change.
    fn lazy_link<F>(&self, listener: F) -> Result<ListenerId>
    where
        F: Fn(&Self::Value, Option<&Self::Value>) + 'static,
    {
        self.link_with(listener, LinkOptions::default().lazy())
    }

    /// Remove a listener. Fails with `NotRegistered` if `id` is not
    /// registered on this cell.
    fn unlink(&self, id: ListenerId) -> Result<()> {
        let cell = self.any_cell();
        if cell.is_disposed() {
            return Err(CellError::Disposed { cell: cell.label() });
        }
        if self.listeners().remove_listener(id) {
            Ok(())
        } else {
            Err(CellError::NotRegistered {
                cell: cell.label(),
                listener: id,
            })
        }
    }

    fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners().has_listener(id)
    }

    fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Remove every listener linked with `owner`, returning how many.
    fn unlink_owner(&self, owner: OwnerId) -> usize {
        self.listeners().remove_owner(owner)
    }

    // =========================================================================
    // COMBINATORS
    // =========================================================================

    /// A derived cell computing `f` over this cell's value.
    fn map<U, F>(&self, f: F) -> Result<Derived<U>>
    where
        U: PartialEq + Clone + 'static,
        F: Fn(&Self::Value) -> U + 'static,
    {
        Derived::new((self.clone(),), move |(value,)| f(&value))
    }
}
