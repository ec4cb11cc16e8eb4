// ============================================================================
// spark-viewmodel - Computed Values
// Derived values recomputed eagerly from an explicit dependency list
// ============================================================================
//
// A ComputedValue subscribes one internal listener to every declared
// dependency. Any dependency notification recomputes synchronously; if the
// result differs under the computed's equality, the cache is replaced and the
// computed notifies its own listeners. Dependencies are declared up front, so
// no tracking session is involved: the compute function runs untracked, which
// also keeps its reads out of any session that happens to be active.
//
// The dependency -> listener edge is the one that must be cut on disposal.
// Construction therefore always goes through an owner (auto-disposed with
// the owner) or through `detached` (the caller disposes explicitly).
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::core::error::Result;
use crate::core::types::{default_equals, EqualsFn, Listener, Observable, ResettableNode};
use crate::primitives::node::{ListenerHandle, ObservableNode};
use crate::primitives::view_model::ViewModel;
use crate::reactivity::tracking::{report_access, untrack};

// =============================================================================
// STATE
// =============================================================================

/// Lifecycle of a [`ComputedValue`].
///
/// "Up to date" and "stale" are not separate states: recomputation happens
/// synchronously inside the dependency's notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedState {
    /// Initial value computed, not yet subscribed to dependencies
    Uninitialized,
    /// Subscribed and recomputing on change
    Active,
    /// Detached from all dependencies
    Disposed,
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for creating a [`ComputedValue`].
pub struct ComputedOptions<T> {
    /// Equality used to gate notifications. Defaults to PartialEq.
    pub equals: Option<EqualsFn<T>>,

    /// Label shown in tracing and `Debug` output.
    pub label: Option<&'static str>,
}

impl<T> Default for ComputedOptions<T> {
    fn default() -> Self {
        Self {
            equals: None,
            label: None,
        }
    }
}

// =============================================================================
// COMPUTED INNER
// =============================================================================

struct ComputedInner<T> {
    node: ObservableNode,
    compute: Box<dyn Fn() -> T>,
    value: RefCell<T>,
    equals: EqualsFn<T>,
    deps: RefCell<Vec<ObservableNode>>,
    listener: RefCell<Option<Listener>>,
    state: Cell<ComputedState>,
}

impl<T> ComputedInner<T> {
    /// Re-run the compute function; notify if the result changed.
    fn recompute(&self) {
        if self.state.get() != ComputedState::Active {
            return;
        }

        let next = untrack(|| (self.compute)());
        let changed = !(self.equals)(&self.value.borrow(), &next);
        trace!(node = %self.node.id(), label = ?self.node.label(), changed, "recompute");

        if changed {
            match self.value.try_borrow_mut() {
                Ok(mut slot) => *slot = next,
                Err(_) => panic!(
                    "ComputedValue {:?} recomputed while borrowed by `with`; read it with `get` instead",
                    self.node.label()
                ),
            }
            self.node.notify();
        }
    }

    fn detach(&self) {
        if self.state.replace(ComputedState::Disposed) == ComputedState::Disposed {
            return;
        }

        let listener = self.listener.borrow_mut().take();
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        if let Some(listener) = listener {
            for dep in &deps {
                dep.remove_listener(&listener);
            }
        }
        self.node.dispose();
        debug!(node = %self.node.id(), label = ?self.node.label(), deps = deps.len(), "computed disposed");
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.detach();
    }
}

// =============================================================================
// COMPUTED VALUE
// =============================================================================

/// A read-only value derived from a fixed list of dependencies.
///
/// # Example
///
/// ```
/// use spark_viewmodel::{ComputedValue, ObservableValue, ViewModel};
///
/// let owner = ViewModel::new("Doubler");
/// let a = owner.value(2).unwrap();
/// let b = ComputedValue::new(&owner, &[&a], {
///     let a = a.clone();
///     move || a.get() * 2
/// })
/// .unwrap();
///
/// assert_eq!(b.get(), 4);
/// a.set(5);
/// assert_eq!(b.get(), 10);
///
/// b.dispose();
/// assert!(!a.has_listeners());
/// ```
pub struct ComputedValue<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for ComputedValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> ComputedValue<T> {
    /// Create a computed value owned by `owner`.
    ///
    /// Fails with [`Error::OwnerDisposed`](crate::Error::OwnerDisposed) if the
    /// owner has already been disposed; nothing is computed or subscribed in
    /// that case.
    pub fn new<F>(owner: &ViewModel, deps: &[&dyn Observable], compute: F) -> Result<Self>
    where
        T: PartialEq,
        F: Fn() -> T + 'static,
    {
        Self::with_options(owner, deps, ComputedOptions::default(), compute)
    }

    /// Create an owned computed value from options.
    pub fn with_options<F>(
        owner: &ViewModel,
        deps: &[&dyn Observable],
        options: ComputedOptions<T>,
        compute: F,
    ) -> Result<Self>
    where
        T: PartialEq,
        F: Fn() -> T + 'static,
    {
        owner.ensure_can_own()?;
        let equals = options.equals.unwrap_or(default_equals);
        let computed = Self::build(deps, equals, options.label, Box::new(compute));
        owner.adopt(computed.clone())?;
        Ok(computed)
    }

    /// Create an owned computed value with a custom equality function.
    pub fn new_with_equals<F>(
        owner: &ViewModel,
        deps: &[&dyn Observable],
        equals: EqualsFn<T>,
        compute: F,
    ) -> Result<Self>
    where
        F: Fn() -> T + 'static,
    {
        owner.ensure_can_own()?;
        let computed = Self::build(deps, equals, None, Box::new(compute));
        owner.adopt(computed.clone())?;
        Ok(computed)
    }

    /// Create a computed value with no owner. The caller detaches it with
    /// [`dispose`](Self::dispose), or by dropping every handle.
    pub fn detached<F>(deps: &[&dyn Observable], compute: F) -> Self
    where
        T: PartialEq,
        F: Fn() -> T + 'static,
    {
        Self::build(deps, default_equals, None, Box::new(compute))
    }

    fn build(
        deps: &[&dyn Observable],
        equals: EqualsFn<T>,
        label: Option<&'static str>,
        compute: Box<dyn Fn() -> T>,
    ) -> Self {
        let initial = untrack(&compute);
        let node = match label {
            Some(label) => ObservableNode::labeled(label),
            None => ObservableNode::new(),
        };
        let deps: Vec<ObservableNode> = deps.iter().map(|dep| dep.node().clone()).collect();

        let inner = Rc::new(ComputedInner {
            node,
            compute,
            value: RefCell::new(initial),
            equals,
            deps: RefCell::new(Vec::new()),
            listener: RefCell::new(None),
            state: Cell::new(ComputedState::Uninitialized),
        });

        // Dependencies hold the listener; the listener only holds a weak
        // reference back, so the computed can still be dropped.
        let weak: Weak<ComputedInner<T>> = Rc::downgrade(&inner);
        let listener: Listener = Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.recompute();
            }
        });

        for dep in &deps {
            dep.add_listener_rc(listener.clone());
        }
        *inner.deps.borrow_mut() = deps;
        *inner.listener.borrow_mut() = Some(listener);
        inner.state.set(ComputedState::Active);

        debug!(node = %inner.node.id(), label = ?label, deps = inner.deps.borrow().len(), "computed created");
        Self { inner }
    }

    /// Current cached value, reporting the read to the active session.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        report_access(&self.inner.node);
        self.inner.value.borrow().clone()
    }

    /// Access the cached value by reference, reporting the read.
    ///
    /// # Panics
    /// The cache stays borrowed while `f` runs. Changing a dependency from
    /// inside `f` recomputes into the borrowed cache and panics; use
    /// [`get`](Self::get) when the callback writes.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        report_access(&self.inner.node);
        f(&self.inner.value.borrow())
    }

    /// Cached value without reporting the read.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    pub fn state(&self) -> ComputedState {
        self.inner.state.get()
    }

    pub fn dependency_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerHandle {
        self.inner.node.add_listener(listener)
    }

    pub fn has_listeners(&self) -> bool {
        self.inner.node.has_listeners()
    }

    /// Detach from every dependency and clear own listeners.
    ///
    /// Only direct dependencies are detached; a computed dependency keeps
    /// running until its own owner disposes it. Repeated calls are no-ops.
    pub fn dispose(&self) {
        self.inner.detach();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.get() == ComputedState::Disposed
    }
}

impl<T> Observable for ComputedValue<T> {
    fn node(&self) -> &ObservableNode {
        &self.inner.node
    }
}

impl<T: 'static> ResettableNode for ComputedValue<T> {
    fn dispose(&self) {
        ComputedValue::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        ComputedValue::is_disposed(self)
    }
}

impl<T: fmt::Debug> fmt::Debug for ComputedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedValue")
            .field("id", &self.inner.node.id())
            .field("label", &self.inner.node.label())
            .field("value", &*self.inner.value.borrow())
            .field("state", &self.inner.state.get())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
