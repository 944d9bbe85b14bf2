// ============================================================================
// axon-cells - Read-Only View
// An observable handed out without its setter
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::error::Result;
use crate::core::registry::ListenerRegistry;
use crate::core::types::AnyCell;
use crate::primitives::observable::ObservableInner;
use crate::primitives::read_cell::ReadCell;

/// Read access to an observable: `get`, `with` and the link API, no `set`
/// and no `dispose`.
///
/// # Example
///
/// ```
/// use axon_cells::{Observable, ReadCell};
///
/// let position = Observable::new(0);
/// let view = position.read_only();
///
/// position.set(3).unwrap();
/// assert_eq!(view.get(), 3);
/// assert_eq!(view.id(), position.id());
/// ```
pub struct ReadOnly<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for ReadOnly<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> ReadOnly<T> {
    pub(crate) fn from_inner(inner: Rc<ObservableInner<T>>) -> Self {
        Self { inner }
    }

    pub fn get(&self) -> T {
        self.inner.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }
}

impl<T: Clone + 'static> ReadCell for ReadOnly<T> {
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

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for ReadOnly<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnly")
            .field("cell", &self.inner.label())
            .field("value", &self.inner.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::primitives::{Observable, ReadCell};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn view_links_to_the_same_cell() {
        let source = Observable::new(1);
        let view = source.read_only();
        let fired = Rc::new(Cell::new(0));
        {
            let fired = fired.clone();
            view.lazy_link(move |_, _| fired.set(fired.get() + 1)).unwrap();
        }

        source.set(2).unwrap();
        assert_eq!(fired.get(), 1);
        assert_eq!(source.listener_count(), 1);
    }

    #[test]
    fn view_derives_like_its_source() {
        let source = Observable::new(2);
        let squared = source.read_only().map(|v| v * v).unwrap();
        source.set(5).unwrap();
        assert_eq!(squared.get().unwrap(), 25);
    }
}
