// ============================================================================
// spark-viewmodel - Observable Value
// A single mutable typed value with equality-gated notification
// ============================================================================

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::core::types::{default_equals, EqualsFn, Observable, ResettableNode};
use crate::primitives::node::{ListenerHandle, ObservableNode};
use crate::reactivity::tracking::report_access;

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for creating an [`ObservableValue`].
pub struct ValueOptions<T> {
    /// Equality used to gate notifications. Defaults to PartialEq.
    pub equals: Option<EqualsFn<T>>,

    /// Label shown in tracing and `Debug` output.
    pub label: Option<&'static str>,
}

impl<T> Default for ValueOptions<T> {
    fn default() -> Self {
        Self {
            equals: None,
            label: None,
        }
    }
}

// =============================================================================
// OBSERVABLE VALUE
// =============================================================================

struct ValueInner<T> {
    node: ObservableNode,
    value: RefCell<T>,
    equals: EqualsFn<T>,
}

/// A reactive value of type T.
///
/// Setting a value that is equal (under the configured equality) to the
/// current one is a no-op. Reading inside a tracking session reports the
/// value's node to that session.
///
/// # Example
///
/// ```
/// use spark_viewmodel::ObservableValue;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let v = ObservableValue::new(5);
/// let hits = Rc::new(Cell::new(0));
/// let h = hits.clone();
/// v.subscribe(move || h.set(h.get() + 1));
///
/// v.set(5);
/// assert_eq!(hits.get(), 0);
/// v.set(6);
/// assert_eq!(hits.get(), 1);
/// ```
pub struct ObservableValue<T> {
    inner: Rc<ValueInner<T>>,
}

impl<T> Clone for ObservableValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> ObservableValue<T> {
    /// Create a value compared with PartialEq.
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::new_with_equals(value, default_equals)
    }

    /// Create a value with a custom equality function.
    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self::build(value, equals, None)
    }

    /// Create a value from options.
    pub fn with_options(value: T, options: ValueOptions<T>) -> Self
    where
        T: PartialEq,
    {
        let equals = options.equals.unwrap_or(default_equals);
        Self::build(value, equals, options.label)
    }

    fn build(value: T, equals: EqualsFn<T>, label: Option<&'static str>) -> Self {
        let node = match label {
            Some(label) => ObservableNode::labeled(label),
            None => ObservableNode::new(),
        };
        Self {
            inner: Rc::new(ValueInner {
                node,
                value: RefCell::new(value),
                equals,
            }),
        }
    }

    /// Get the current value, reporting the read to the active session.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        report_access(&self.inner.node);
        self.inner.value.borrow().clone()
    }

    /// Access the current value by reference, reporting the read.
    ///
    /// # Panics
    /// The value stays borrowed while `f` runs. Writing to this value from
    /// inside `f` (directly or through a listener) panics; copy it out with
    /// [`get`](Self::get) or [`peek`](Self::peek) when the callback writes.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        report_access(&self.inner.node);
        f(&self.inner.value.borrow())
    }

    /// Get the current value without reporting the read.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Set the value. Returns true (and notifies) only if it changed.
    pub fn set(&self, value: T) -> bool {
        let equal = (self.inner.equals)(&self.inner.value.borrow(), &value);
        if equal {
            return false;
        }

        *self.write_slot() = value;
        trace!(node = %self.inner.node.id(), label = ?self.inner.node.label(), "value changed");
        self.inner.node.notify();
        true
    }

    /// Replace the value with `transform(current)`, gated like [`set`](Self::set).
    ///
    /// # Example
    ///
    /// ```
    /// use spark_viewmodel::ObservableValue;
    ///
    /// let count = ObservableValue::new(1);
    /// assert!(count.update(|n| n + 1));
    /// assert_eq!(count.get(), 2);
    /// ```
    pub fn update(&self, transform: impl FnOnce(&T) -> T) -> bool {
        let next = {
            let current = self.inner.value.borrow();
            transform(&current)
        };
        self.set(next)
    }

    /// Mutate the value in place and notify unconditionally.
    ///
    /// In-place mutation leaves nothing to compare against, so the equality
    /// gate does not apply.
    pub fn modify(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.write_slot());
        self.inner.node.notify();
    }

    fn write_slot(&self) -> RefMut<'_, T> {
        match self.inner.value.try_borrow_mut() {
            Ok(slot) => slot,
            Err(_) => panic!(
                "ObservableValue {:?} written while borrowed by `with`; read it with `get` or `peek` instead",
                self.inner.node.label()
            ),
        }
    }

    /// Notify listeners without changing the value.
    pub fn notify_changed(&self) {
        self.inner.node.notify();
    }

    /// Register a listener on this value's node.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerHandle {
        self.inner.node.add_listener(listener)
    }

    pub fn has_listeners(&self) -> bool {
        self.inner.node.has_listeners()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.node.listener_count()
    }

    /// Clear listeners. The value stays readable and writable.
    pub fn dispose(&self) {
        self.inner.node.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.node.is_disposed()
    }

    /// Whether both handles share the same underlying value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Observable for ObservableValue<T> {
    fn node(&self) -> &ObservableNode {
        &self.inner.node
    }
}

impl<T> ResettableNode for ObservableValue<T> {
    fn dispose(&self) {
        ObservableValue::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        ObservableValue::is_disposed(self)
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableValue")
            .field("id", &self.inner.node.id())
            .field("label", &self.inner.node.label())
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
