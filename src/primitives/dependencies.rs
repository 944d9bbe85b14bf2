// ============================================================================
// axon-cells - Dependency Lists
// Ordered inputs of a derived cell: tuples of mixed cells or a Vec of one kind
// ============================================================================

use std::rc::Rc;

use crate::core::types::AnyCell;
use crate::primitives::read_cell::ReadCell;

/// An ordered list of cells a derived reads from.
///
/// Tuples of one to six cells may mix value types; the combination function
/// receives a tuple of their values in the same order. A `Vec` of cells of
/// one kind yields a `Vec` of values.
///
/// # Example
///
/// ```
/// use axon_cells::{Derived, Observable};
///
/// let name = Observable::new("ion");
/// let charge = Observable::new(-1);
/// let label = Derived::new((name.clone(), charge.clone()), |(n, q)| format!("{n} ({q})")).unwrap();
/// assert_eq!(label.get().unwrap(), "ion (-1)");
///
/// let parts = vec![Observable::new(1), Observable::new(2), Observable::new(3)];
/// let total = Derived::new(parts.clone(), |values| values.iter().sum::<i32>()).unwrap();
/// assert_eq!(total.get().unwrap(), 6);
/// ```
pub trait Dependencies: Clone + 'static {
    type Values: Clone + 'static;

    /// Current values, in list order.
    fn values(&self) -> Self::Values;

    /// The cells, in list order.
    fn cells(&self) -> Vec<Rc<dyn AnyCell>>;
}

macro_rules! impl_dependencies {
    ($($cell:ident : $index:tt),+) => {
        impl<$($cell: ReadCell),+> Dependencies for ($($cell,)+) {
            type Values = ($(<$cell as ReadCell>::Value,)+);

            fn values(&self) -> Self::Values {
                ($(self.$index.current(),)+)
            }

            fn cells(&self) -> Vec<Rc<dyn AnyCell>> {
                vec![$(self.$index.any_cell()),+]
            }
        }
    };
}

impl_dependencies!(A: 0);
impl_dependencies!(A: 0, B: 1);
impl_dependencies!(A: 0, B: 1, C: 2);
impl_dependencies!(A: 0, B: 1, C: 2, D: 3);
impl_dependencies!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_dependencies!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

impl<C: ReadCell> Dependencies for Vec<C> {
    type Values = Vec<C::Value>;

    fn values(&self) -> Self::Values {
        self.iter().map(ReadCell::current).collect()
    }

    fn cells(&self) -> Vec<Rc<dyn AnyCell>> {
        self.iter().map(ReadCell::any_cell).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Observable;

    #[test]
    fn tuple_keeps_order() {
        let a = Observable::new(1);
        let b = Observable::new("two");
        let c = Observable::new(3.0);
        let deps = (a.clone(), b.clone(), c.clone());

        assert_eq!(deps.values(), (1, "two", 3.0));
        let ids: Vec<_> = deps.cells().iter().map(|cell| cell.id()).collect();
        assert_eq!(ids, vec![a.id(), b.id(), c.id()]);
    }

    #[test]
    fn vec_reads_every_cell() {
        let cells: Vec<_> = (0..4).map(Observable::new).collect();
        assert_eq!(cells.values(), vec![0, 1, 2, 3]);
        cells[2].set(20).unwrap();
        assert_eq!(cells.values(), vec![0, 1, 20, 3]);
    }
}
