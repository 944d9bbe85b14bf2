// ============================================================================
// axon-cells - Coupled Pairs
// Two observables kept in step by a forward and a backward mapping
// ============================================================================
//
// Writing either side writes the other through its mapping. The echo that
// comes back into the side the caller wrote lands while that side is still
// notifying, so both cells are reentrant: the echo is queued and replayed
// after the wave, where it is a no-op whenever the mappings are inverse.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::error::{CellError, Result};
use crate::primitives::observable::Observable;
use crate::primitives::options::CellOptions;
use crate::primitives::read_cell::ReadCell;
use crate::primitives::read_only::ReadOnly;

type Failure = Rc<RefCell<Option<CellError>>>;

/// A primary and a secondary cell in a mutual algebraic relationship, such
/// as a temperature in kelvin and in celsius.
///
/// Invariant after every completed write: `secondary == forward(primary)`
/// (for inverse mappings also `primary == backward(secondary)`). The cell
/// the caller writes keeps the written value; the other follows.
///
/// # Example
///
/// ```
/// use axon_cells::CoupledPair;
///
/// let temperature = CoupledPair::new(
///     273.15,
///     |kelvin: &f64| kelvin - 273.15,
///     |celsius: &f64| celsius + 273.15,
/// )
/// .unwrap();
///
/// temperature.set_secondary(100.0).unwrap();
/// assert_eq!(temperature.primary().get(), 373.15);
/// ```
pub struct CoupledPair<A, B> {
    primary: Observable<A>,
    secondary: Observable<B>,
    failure: Failure,
}

impl<A, B> CoupledPair<A, B>
where
    A: PartialEq + Clone + 'static,
    B: PartialEq + Clone + 'static,
{
    /// Create the pair from the primary value; the secondary starts at
    /// `forward(primary)`.
    pub fn new<F, G>(primary: A, forward: F, backward: G) -> Result<Self>
    where
        F: Fn(&A) -> B + 'static,
        G: Fn(&B) -> A + 'static,
    {
        Self::with_options(
            primary,
            forward,
            backward,
            CellOptions::new().named("primary"),
            CellOptions::new().named("secondary"),
        )
    }

    /// As `new`, with options for each side. Both sides are always reentrant.
    pub fn with_options<F, G>(
        primary: A,
        forward: F,
        backward: G,
        primary_options: CellOptions<A>,
        secondary_options: CellOptions<B>,
    ) -> Result<Self>
    where
        F: Fn(&A) -> B + 'static,
        G: Fn(&B) -> A + 'static,
    {
        let secondary_value = forward(&primary);
        let primary = Observable::with_options(primary, primary_options.reentrant(true))?;
        let secondary =
            Observable::with_options(secondary_value, secondary_options.reentrant(true))?;
        let failure: Failure = Rc::new(RefCell::new(None));

        {
            let target = secondary.downgrade();
            let failure = failure.clone();
            primary.lazy_link(move |value, _| {
                if let Some(target) = target.upgrade() {
                    if let Err(err) = target.set(forward(value)) {
                        failure.borrow_mut().get_or_insert(err);
                    }
                }
            })?;
        }
        {
            let target = primary.downgrade();
            let failure = failure.clone();
            secondary.lazy_link(move |value, _| {
                if let Some(target) = target.upgrade() {
                    if let Err(err) = target.set(backward(value)) {
                        failure.borrow_mut().get_or_insert(err);
                    }
                }
            })?;
        }

        Ok(Self {
            primary,
            secondary,
            failure,
        })
    }

    /// Write the primary side; the secondary follows.
    pub fn set_primary(&self, value: A) -> Result<bool> {
        let changed = self.primary.set(value);
        self.finish(changed)
    }

    /// Write the secondary side; the primary follows.
    pub fn set_secondary(&self, value: B) -> Result<bool> {
        let changed = self.secondary.set(value);
        self.finish(changed)
    }

    /// Surface the first error raised inside the coupling listeners.
    fn finish(&self, changed: Result<bool>) -> Result<bool> {
        let failure = self.failure.borrow_mut().take();
        let changed = changed?;
        match failure {
            Some(err) => Err(err),
            None => Ok(changed),
        }
    }

    pub fn primary(&self) -> ReadOnly<A> {
        self.primary.read_only()
    }

    pub fn secondary(&self) -> ReadOnly<B> {
        self.secondary.read_only()
    }

    /// Dispose both cells, which drops the coupling listeners with every
    /// other listener. Idempotent.
    pub fn dispose(&self) {
        self.primary.dispose();
        self.secondary.dispose();
        self.failure.borrow_mut().take();
    }
}

// =============================================================================
// TESTS
// =============================================================================
