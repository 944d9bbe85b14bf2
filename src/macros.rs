// ============================================================================
// axon-cells - Ergonomic Macros
// ============================================================================

/// Clone variables into a move closure.
///
/// Saves the `let x = x.clone();` block before every listener that needs a
/// handle to another cell.
///
/// # Usage
///
/// ```rust
/// use axon_cells::{cloned, Observable, ReadCell};
///
/// let source = Observable::new(1);
/// let mirror = Observable::new(0);
///
/// source
///     .link(cloned!(mirror => move |v: &i32, _: Option<&i32>| {
///         mirror.set(*v).unwrap();
///     }))
///     .unwrap();
///
/// source.set(7).unwrap();
/// assert_eq!(mirror.get(), 7);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Create a derived cell from named cells and an expression over their
/// values.
///
/// Inside the expression each name is bound to its cell's current value.
/// Expands to `Derived::new((a.clone(), b.clone()), move |(a, b)| expr)`
/// and returns its `Result`.
///
/// # Usage
///
/// ```rust
/// use axon_cells::{derived, Observable};
///
/// let width = Observable::new(3);
/// let height = Observable::new(4);
///
/// let area = derived!(width, height => width * height).unwrap();
/// assert_eq!(area.get().unwrap(), 12);
///
/// height.set(10).unwrap();
/// assert_eq!(area.get().unwrap(), 30);
/// ```
#[macro_export]
macro_rules! derived {
    ($($dep:ident),+ => $body:expr) => {
        $crate::Derived::new(
            ($($dep.clone(),)+),
            move |($($dep,)+)| $body,
        )
    };
}
