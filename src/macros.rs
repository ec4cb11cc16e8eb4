// ============================================================================
// spark-viewmodel - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// Observable handles are cheap `Rc` clones, so capturing them in listeners
/// and compute closures usually means cloning first.
///
/// # Usage
///
/// ```rust
/// use spark_viewmodel::{cloned, ObservableValue};
///
/// let a = ObservableValue::new(1);
/// let b = ObservableValue::new(2);
///
/// let sum = cloned!(a, b => move || a.get() + b.get());
/// assert_eq!(sum(), 3);
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

/// Create a computed value whose dependency list and captures are the same
/// identifiers.
///
/// `computed!(owner, [a, b] => expr)` wraps
/// `ComputedValue::new(&owner, &[&a, &b], cloned!(a, b => move || expr))`
/// and returns its `Result`. Without an owner, `computed!([a, b] => expr)`
/// builds a detached computed value.
///
/// # Usage
///
/// ```rust
/// use spark_viewmodel::{computed, ViewModel};
///
/// let vm = ViewModel::new("Cart");
/// let price = vm.value(4).unwrap();
/// let qty = vm.value(3).unwrap();
///
/// let total = computed!(vm, [price, qty] => price.get() * qty.get()).unwrap();
/// assert_eq!(total.get(), 12);
///
/// qty.set(5);
/// assert_eq!(total.get(), 20);
/// ```
#[macro_export]
macro_rules! computed {
    // Owned by a view model
    ($owner:expr, [$($deps:ident),+ $(,)?] => $body:expr) => {
        $crate::ComputedValue::new(
            &$owner,
            &[$(&$deps as &dyn $crate::Observable),+],
            $crate::cloned!($($deps),+ => move || $body),
        )
    };
    // Detached
    ([$($deps:ident),+ $(,)?] => $body:expr) => {
        $crate::ComputedValue::detached(
            &[$(&$deps as &dyn $crate::Observable),+],
            $crate::cloned!($($deps),+ => move || $body),
        )
    };
}
