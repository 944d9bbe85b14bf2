// ============================================================================
// axon-cells - Equality Functions
// Deciding whether a write is a change
// ============================================================================
//
// Every cell carries an `EqualsFn<T>`. A write (or recomputation) whose value
// is equal to the current one under that function is a no-op: nothing is
// stored, no version is bumped and no listener runs.
// ============================================================================

// =============================================================================
// STRUCTURAL EQUALITY (Default)
// =============================================================================

/// Default equality using PartialEq.
/// Used by `Observable::new` and `Derived::new`.
///
/// # Example
/// ```
/// use axon_cells::reactivity::equality::equals;
///
/// assert!(equals(&42, &42));
/// assert!(!equals(&42, &43));
/// assert!(equals(&"hello", &"hello"));
/// ```
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// FLOATING POINT
// =============================================================================

/// Equality for f64 where NaN equals NaN.
///
/// With plain `==` a cell holding NaN would treat every write of NaN as a
/// change and notify forever.
///
/// # Example
/// ```
/// use axon_cells::reactivity::equality::safe_equals_f64;
///
/// assert!(safe_equals_f64(&1.0, &1.0));
/// assert!(!safe_equals_f64(&1.0, &2.0));
/// assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
/// assert!(!safe_equals_f64(&f64::NAN, &1.0));
/// ```
pub fn safe_equals_f64(a: &f64, b: &f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

/// Equality for f32 where NaN equals NaN.
pub fn safe_equals_f32(a: &f32, b: &f32) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

/// NaN-aware equality for optional readouts.
///
/// # Example
/// ```
/// use axon_cells::reactivity::equality::safe_equals_option_f64;
///
/// assert!(safe_equals_option_f64(&None, &None));
/// assert!(safe_equals_option_f64(&Some(f64::NAN), &Some(f64::NAN)));
/// assert!(!safe_equals_option_f64(&Some(1.0), &None));
/// ```
pub fn safe_equals_option_f64(a: &Option<f64>, b: &Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => safe_equals_f64(a, b),
        _ => false,
    }
}

// =============================================================================
// COLLECTIONS
// =============================================================================

/// Element-wise equality for `Vec` values, one level deep.
#[allow(clippy::ptr_arg)]
pub fn shallow_equals_vec<T: PartialEq>(a: &Vec<T>, b: &Vec<T>) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

// =============================================================================
// CONSTANT POLICIES
// =============================================================================

/// Never equal: every write and every recomputation is a change.
///
/// # Example
/// ```
/// use axon_cells::reactivity::equality::never_equals;
///
/// assert!(!never_equals(&42, &42));
/// ```
pub fn never_equals<T>(_a: &T, _b: &T) -> bool {
    false
}

/// Always equal: the cell never reports a change after construction.
pub fn always_equals<T>(_a: &T, _b: &T) -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EqualsFn;

    #[test]
    fn nan_is_equal_to_itself() {
        assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
        assert!(safe_equals_f32(&f32::NAN, &f32::NAN));
        assert!(!safe_equals_f32(&f32::NAN, &0.0));
        assert!(!equals(&f64::NAN, &f64::NAN));
    }

    #[test]
    fn shallow_compares_elements() {
        assert!(shallow_equals_vec(&vec![1, 2, 3], &vec![1, 2, 3]));
        assert!(!shallow_equals_vec(&vec![1, 2], &vec![1, 2, 3]));
        assert!(!shallow_equals_vec(&vec![1, 2, 3], &vec![1, 2, 4]));
    }

    #[test]
    fn policies_coerce_to_fn_pointers() {
        let never: EqualsFn<i32> = never_equals;
        let always: EqualsFn<i32> = always_equals;
        assert!(!never(&1, &1));
        assert!(always(&1, &2));
    }
}
