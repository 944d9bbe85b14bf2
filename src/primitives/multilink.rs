// ============================================================================
// axon-cells - Multilink
// One listener over several cells, called once per wave
// ============================================================================

use crate::core::error::Result;
use crate::core::types::ListenerId;
use crate::primitives::dependencies::Dependencies;
use crate::primitives::derived::Derived;
use crate::primitives::options::LinkOptions;
use crate::primitives::read_cell::ReadCell;

/// A listener over a dependency list.
///
/// The listener receives the values of every dependency, in list order. It
/// runs once per wave that changes any of them, after all of them have
/// settled, so a transaction writing three dependencies calls it once. A
/// wave that leaves the tuple equal to the last one seen calls nothing.
///
/// The listener lives as long as the `Multilink`.
///
/// # Example
///
/// ```
/// use axon_cells::{multilink, transaction, Observable};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let x = Observable::new(0);
/// let y = Observable::new(0);
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let _link = {
///     let seen = seen.clone();
///     multilink((x.clone(), y.clone()), move |(x, y)| seen.borrow_mut().push((*x, *y))).unwrap()
/// };
///
/// transaction(|| {
///     x.set(1).unwrap();
///     y.set(2).unwrap();
/// })
/// .unwrap();
///
/// assert_eq!(*seen.borrow(), vec![(0, 0), (1, 2)]);
/// ```
#[must_use = "dropping a Multilink removes its listener"]
pub struct Multilink<D: Dependencies> {
    combined: Derived<D::Values>,
    listener: ListenerId,
}

impl<D> Multilink<D>
where
    D: Dependencies,
    D::Values: PartialEq,
{
    /// Link `listener` over `deps`, calling it immediately.
    pub fn new<F>(deps: D, listener: F) -> Result<Self>
    where
        F: Fn(&D::Values) + 'static,
    {
        Self::build(deps, listener, LinkOptions::default())
    }

    /// Link `listener` over `deps` without calling it until a change.
    pub fn lazy<F>(deps: D, listener: F) -> Result<Self>
    where
        F: Fn(&D::Values) + 'static,
    {
        Self::build(deps, listener, LinkOptions::default().lazy())
    }

    fn build<F>(deps: D, listener: F, options: LinkOptions) -> Result<Self>
    where
        F: Fn(&D::Values) + 'static,
    {
        let combined = Derived::new(deps, |values| values)?;
        let listener = combined.link_with(move |values, _| listener(values), options)?;
        Ok(Self { combined, listener })
    }
}

impl<D: Dependencies> Multilink<D> {
    /// The current values of the dependencies.
    pub fn values(&self) -> Result<D::Values> {
        self.combined.get()
    }

    pub fn listener_id(&self) -> ListenerId {
        self.listener
    }

    pub fn is_disposed(&self) -> bool {
        self.combined.is_disposed()
    }

    /// Detach from every dependency. Idempotent.
    pub fn dispose(&self) {
        self.combined.dispose();
    }
}

impl<D: Dependencies> Drop for Multilink<D> {
    fn drop(&mut self) {
        self.combined.dispose();
    }
}

/// `Multilink::new`.
pub fn multilink<D, F>(deps: D, listener: F) -> Result<Multilink<D>>
where
    D: Dependencies,
    D::Values: PartialEq,
    F: Fn(&D::Values) + 'static,
{
    Multilink::new(deps, listener)
}

/// `Multilink::lazy`.
pub fn lazy_multilink<D, F>(deps: D, listener: F) -> Result<Multilink<D>>
where
    D: Dependencies,
    D::Values: PartialEq,
    F: Fn(&D::Values) + 'static,
{
    Multilink::lazy(deps, listener)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Observable;
    use crate::reactivity::batching::transaction;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn fires_immediately_then_per_change() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let sums = Rc::new(RefCell::new(Vec::new()));
        let _link = {
            let sums = sums.clone();
            multilink((a.clone(), b.clone()), move |(a, b)| sums.borrow_mut().push(a + b))
                .unwrap()
        };

        a.set(10).unwrap();
        b.set(20).unwrap();
        assert_eq!(*sums.borrow(), vec![3, 12, 30]);
    }

    #[test]
    fn lazy_variant_waits_for_a_change() {
        let a = Observable::new(1);
        let fired = Rc::new(Cell::new(0));
        let _link = {
            let fired = fired.clone();
            lazy_multilink(vec![a.clone()], move |_| fired.set(fired.get() + 1)).unwrap()
        };
        assert_eq!(fired.get(), 0);
        a.set(2).unwrap();
        assert_eq!(fired.get(), 1);
        a.set(2).unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn dropping_detaches_from_dependencies() {
        let a = Observable::new(1);
        let link = multilink((a.clone(),), |_| {}).unwrap();
        assert_eq!(a.any_cell().dependent_count(), 1);
        drop(link);
        assert_eq!(a.any_cell().dependent_count(), 0);
    }

    #[test]
    fn transaction_restoring_values_stays_silent() {
        let a = Observable::new(0);
        let b = Observable::new(0);
        let fired = Rc::new(Cell::new(0));
        let _link = {
            let fired = fired.clone();
            lazy_multilink((a.clone(), b.clone()), move |_| fired.set(fired.get() + 1)).unwrap()
        };

        transaction(|| {
            a.set(1).unwrap();
            a.set(0).unwrap();
        })
        .unwrap();
        assert_eq!(fired.get(), 0);

        transaction(|| {
            a.set(1).unwrap();
            b.set(1).unwrap();
        })
        .unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn values_reflect_dependencies() {
        let a = Observable::new('x');
        let b = Observable::new(3u8);
        let link = lazy_multilink((a.clone(), b.clone()), |_| {}).unwrap();
        b.set(4).unwrap();
        assert_eq!(link.values().unwrap(), ('x', 4));
        link.dispose();
        assert!(link.is_disposed());
    }
}
