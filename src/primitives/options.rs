// ============================================================================
// axon-cells - Options
// Per-cell configuration: names, equality, validation, reentrancy, linking
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::error::{CellError, Result};
use crate::core::types::{EqualsFn, OwnerId};

// =============================================================================
// VALIDATOR
// =============================================================================

/// A predicate every written value must satisfy, plus the text describing it.
///
/// A rejected write fails with `CellError::InvalidValue` and leaves the cell
/// unchanged.
///
/// # Example
///
/// ```
/// use axon_cells::{CellOptions, Observable, Validator};
///
/// let volume = Observable::with_options(
///     5,
///     CellOptions::new().validator(Validator::range(0, 10)),
/// )
/// .unwrap();
///
/// assert!(volume.set(11).is_err());
/// assert_eq!(volume.get(), 5);
/// ```
pub struct Validator<T> {
    constraint: String,
    check: Rc<dyn Fn(&T) -> bool>,
    render: fn(&T) -> String,
}

fn render_debug<T: fmt::Debug>(value: &T) -> String {
    format!("{value:?}")
}

impl<T: fmt::Debug + 'static> Validator<T> {
    /// Accept values for which `check` returns true.
    pub fn new(constraint: impl Into<String>, check: impl Fn(&T) -> bool + 'static) -> Self {
        Self {
            constraint: constraint.into(),
            check: Rc::new(check),
            render: render_debug::<T>,
        }
    }

    /// Accept `min <= value <= max`.
    pub fn range(min: T, max: T) -> Self
    where
        T: PartialOrd,
    {
        let constraint = format!("value in range [{min:?}, {max:?}]");
        Self::new(constraint, move |value| *value >= min && *value <= max)
    }

    /// Accept only the listed values.
    pub fn one_of(values: Vec<T>) -> Self
    where
        T: PartialEq,
    {
        let constraint = format!("one of {values:?}");
        Self::new(constraint, move |value| values.contains(value))
    }
}

impl<T> Validator<T> {
    pub fn constraint(&self) -> &str {
        &self.constraint
    }

    pub fn accepts(&self, value: &T) -> bool {
        (self.check)(value)
    }

    /// Check `value` for the cell labelled `cell`.
    pub fn validate(&self, cell: &str, value: &T) -> Result<()> {
        if self.accepts(value) {
            return Ok(());
        }
        Err(CellError::InvalidValue {
            cell: cell.to_string(),
            value: (self.render)(value),
            constraint: self.constraint.clone(),
        })
    }
}

impl<T> Clone for Validator<T> {
    fn clone(&self) -> Self {
        Self {
            constraint: self.constraint.clone(),
            check: self.check.clone(),
            render: self.render,
        }
    }
}

impl<T> fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("constraint", &self.constraint)
            .finish()
    }
}

// =============================================================================
// CELL OPTIONS
// =============================================================================

/// Options for `Observable::with_options`.
///
/// Every field is optional; unset fields take the defaults listed below.
/// Options layer: `base.layer(overrides)` keeps `base` wherever `overrides`
/// leaves a field unset, so a shared default set can be refined per cell.
///
/// | field       | default                      |
/// |-------------|------------------------------|
/// | `name`      | none, labels read `cell#id`  |
/// | `equality`  | `PartialEq`                  |
/// | `validator` | none, every value accepted   |
/// | `reentrant` | `false`                      |
pub struct CellOptions<T> {
    pub name: Option<String>,
    pub equality: Option<EqualsFn<T>>,
    pub validator: Option<Validator<T>>,
    /// Queue writes made while the cell is notifying instead of rejecting them
    pub reentrant: Option<bool>,
}

impl<T> CellOptions<T> {
    pub fn new() -> Self {
        Self {
            name: None,
            equality: None,
            validator: None,
            reentrant: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn equality(mut self, equals: EqualsFn<T>) -> Self {
        self.equality = Some(equals);
        self
    }

    pub fn validator(mut self, validator: Validator<T>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn reentrant(mut self, reentrant: bool) -> Self {
        self.reentrant = Some(reentrant);
        self
    }

    /// Overlay `overrides` on these options; set fields of `overrides` win.
    pub fn layer(self, overrides: CellOptions<T>) -> Self {
        Self {
            name: overrides.name.or(self.name),
            equality: overrides.equality.or(self.equality),
            validator: overrides.validator.or(self.validator),
            reentrant: overrides.reentrant.or(self.reentrant),
        }
    }
}

impl<T> Default for CellOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CellOptions<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            equality: self.equality,
            validator: self.validator.clone(),
            reentrant: self.reentrant,
        }
    }
}

// =============================================================================
// DERIVED OPTIONS
// =============================================================================

/// Options for `Derived::with_options`.
pub struct DerivedOptions<T> {
    pub name: Option<String>,
    pub equality: Option<EqualsFn<T>>,
}

impl<T> DerivedOptions<T> {
    pub fn new() -> Self {
        Self {
            name: None,
            equality: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn equality(mut self, equals: EqualsFn<T>) -> Self {
        self.equality = Some(equals);
        self
    }
}

impl<T> Default for DerivedOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// LINK OPTIONS
// =============================================================================

/// Options for `ReadCell::link_with`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOptions {
    /// Call the listener with `(current, None)` before `link` returns
    pub call_immediately: bool,
    /// Tag for bulk removal with `unlink_owner`
    pub owner: Option<OwnerId>,
}

impl LinkOptions {
    /// Do not call the listener until the next change.
    pub fn lazy(mut self) -> Self {
        self.call_immediately = false;
        self
    }

    pub fn owned_by(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            call_immediately: true,
            owner: None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
