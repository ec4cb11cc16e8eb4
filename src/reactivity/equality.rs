// ============================================================================
// spark-viewmodel - Equality Functions
// Change-gating comparisons for ObservableValue and ComputedValue
// ============================================================================
//
// A value only notifies when the configured equality says old != new.
// The default is PartialEq, which for the std collections (Vec, VecDeque,
// HashMap, HashSet, BTreeMap, BTreeSet, nested combinations) is already a
// recursive element-wise comparison, so collection values get deep equality
// without any extra configuration. `ptr_equals` is the identity mode for
// shared (`Rc`) payloads.
// ============================================================================

use std::rc::Rc;

// =============================================================================
// STRUCTURAL EQUALITY (Default)
// =============================================================================

/// Default equality using PartialEq.
///
/// # Example
/// ```
/// use spark_viewmodel::reactivity::equality::equals;
///
/// assert!(equals(&42, &42));
/// assert!(!equals(&Some(1), &None));
/// ```
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// Deep equality for nested collections.
///
/// Identical to [`equals`]: PartialEq on the std collections compares
/// nested lists, maps and sets element-wise, falling back to each
/// element's own PartialEq for leaves.
///
/// # Example
/// ```
/// use spark_viewmodel::reactivity::equality::deep_equals;
/// use std::collections::HashMap;
///
/// let a = vec![HashMap::from([("k", vec![1, 2])])];
/// let b = vec![HashMap::from([("k", vec![1, 2])])];
/// assert!(deep_equals(&a, &b));
/// ```
pub fn deep_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// Element-wise equality for anything iterable by reference, compared in
/// iteration order. Useful for sequence types that do not implement
/// PartialEq against themselves in the way you want (e.g. comparing
/// ring buffers by their visible order).
///
/// # Example
/// ```
/// use spark_viewmodel::reactivity::equality::iterable_equals;
/// use std::collections::VecDeque;
///
/// let mut a = VecDeque::from([2, 3]);
/// a.push_front(1);
/// let b = VecDeque::from([1, 2, 3]);
/// assert!(iterable_equals(&a, &b));
/// ```
pub fn iterable_equals<'a, C: ?Sized>(a: &'a C, b: &'a C) -> bool
where
    &'a C: IntoIterator,
    <&'a C as IntoIterator>::Item: PartialEq,
{
    a.into_iter().eq(b)
}

// =============================================================================
// IDENTITY EQUALITY
// =============================================================================

/// Identity equality for shared payloads: equal only if both point to the
/// same allocation. A new `Rc` with equal contents counts as a change.
///
/// # Example
/// ```
/// use spark_viewmodel::reactivity::equality::ptr_equals;
/// use std::rc::Rc;
///
/// let a = Rc::new(vec![1, 2]);
/// assert!(ptr_equals(&a, &a.clone()));
/// assert!(!ptr_equals(&a, &Rc::new(vec![1, 2])));
/// ```
pub fn ptr_equals<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    Rc::ptr_eq(a, b)
}

// =============================================================================
// FLOATING POINT
// =============================================================================

/// Equality for f64 treating NaN as equal to NaN, so storing NaN twice
/// does not notify.
///
/// # Example
/// ```
/// use spark_viewmodel::reactivity::equality::safe_equals_f64;
///
/// assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
/// assert!(!safe_equals_f64(&1.0, &2.0));
/// ```
pub fn safe_equals_f64(a: &f64, b: &f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

/// Equality for f32 treating NaN as equal to NaN.
pub fn safe_equals_f32(a: &f32, b: &f32) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

// =============================================================================
// CONSTANT EQUALITIES
// =============================================================================

/// Never equal - every set notifies.
pub fn never_equals<T>(_a: &T, _b: &T) -> bool {
    false
}

/// Always equal - sets never notify and never store.
pub fn always_equals<T>(_a: &T, _b: &T) -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
