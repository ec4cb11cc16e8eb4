// ============================================================================
// spark-viewmodel - View-Model Container
// An observable node that owns reactive fields and disposes them together
// ============================================================================
//
// A ViewModel distinguishes two kinds of children:
//
// - owned children (values, computed values, anything ResettableNode) that it
//   created or adopted. They are disposed with the container.
// - nested containers it merely references. They belong to someone else and
//   are never disposed by this container.
//
// Application view models embed a `ViewModel` and implement
// `ViewModelObject` so bindings can reach the container's node.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::core::error::{Error, Result};
use crate::core::types::{EqualsFn, Observable, ResettableNode};
use crate::primitives::computed::{ComputedOptions, ComputedValue};
use crate::primitives::node::ObservableNode;
use crate::primitives::value::{ObservableValue, ValueOptions};
use crate::reactivity::tracking::report_access;

// =============================================================================
// VIEW MODEL OBJECT
// =============================================================================

/// Implemented by application view models so bindings can find their
/// container node.
///
/// # Example
///
/// ```
/// use spark_viewmodel::{ObservableValue, ViewModel, ViewModelObject};
///
/// struct CounterVm {
///     base: ViewModel,
///     count: ObservableValue<i32>,
/// }
///
/// impl CounterVm {
///     fn new() -> spark_viewmodel::Result<Self> {
///         let base = ViewModel::new("CounterVm");
///         let count = base.value(0)?;
///         Ok(Self { base, count })
///     }
/// }
///
/// impl ViewModelObject for CounterVm {
///     fn view_model(&self) -> &ViewModel {
///         &self.base
///     }
/// }
///
/// let vm = CounterVm::new().unwrap();
/// vm.count.set(3);
/// vm.view_model().dispose();
/// assert!(!vm.count.has_listeners());
/// ```
pub trait ViewModelObject: 'static {
    fn view_model(&self) -> &ViewModel;
}

impl ViewModelObject for ViewModel {
    fn view_model(&self) -> &ViewModel {
        self
    }
}

// =============================================================================
// VIEW MODEL
// =============================================================================

struct ViewModelInner {
    node: ObservableNode,
    name: String,
    owned: RefCell<Vec<Box<dyn ResettableNode>>>,
    nested: RefCell<Vec<Weak<ViewModelInner>>>,
    disposed: Cell<bool>,
}

/// Container aggregating reactive fields with owned-vs-nested disposal.
///
/// Cloning yields another handle to the same container.
#[derive(Clone)]
pub struct ViewModel {
    inner: Rc<ViewModelInner>,
}

impl ViewModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ViewModelInner {
                node: ObservableNode::labeled("view_model"),
                name: name.into(),
                owned: RefCell::new(Vec::new()),
                nested: RefCell::new(Vec::new()),
                disposed: Cell::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Fail with [`Error::OwnerDisposed`] if this container can no longer
    /// own children.
    pub fn ensure_can_own(&self) -> Result<()> {
        if self.inner.disposed.get() {
            debug!(view_model = %self.inner.name, "rejected child of disposed view model");
            return Err(Error::OwnerDisposed {
                owner: self.inner.name.clone(),
            });
        }
        Ok(())
    }

    /// Take ownership of `child`: it will be disposed with this container.
    ///
    /// Children already disposed on their own are released here, so a
    /// container that creates and disposes children per item stays bounded.
    pub fn adopt<C: ResettableNode + 'static>(&self, child: C) -> Result<()> {
        self.ensure_can_own()?;
        let released = self.prune_disposed();
        self.inner.owned.borrow_mut().push(Box::new(child));
        drop(released);
        Ok(())
    }

    /// Split out disposed children. The caller drops them after the
    /// `owned` borrow has ended.
    fn prune_disposed(&self) -> Vec<Box<dyn ResettableNode>> {
        let mut owned = self.inner.owned.borrow_mut();
        let (released, live): (Vec<_>, Vec<_>) =
            std::mem::take(&mut *owned).into_iter().partition(|child| child.is_disposed());
        *owned = live;
        released
    }

    /// Create an owned [`ObservableValue`].
    pub fn value<T: PartialEq + 'static>(&self, initial: T) -> Result<ObservableValue<T>> {
        self.value_with_options(initial, ValueOptions::default())
    }

    /// Create an owned [`ObservableValue`] with a custom equality function.
    pub fn value_with_equals<T: 'static>(
        &self,
        initial: T,
        equals: EqualsFn<T>,
    ) -> Result<ObservableValue<T>> {
        self.ensure_can_own()?;
        let value = ObservableValue::new_with_equals(initial, equals);
        self.adopt(value.clone())?;
        Ok(value)
    }

    /// Create an owned [`ObservableValue`] from options.
    pub fn value_with_options<T: PartialEq + 'static>(
        &self,
        initial: T,
        options: ValueOptions<T>,
    ) -> Result<ObservableValue<T>> {
        self.ensure_can_own()?;
        let value = ObservableValue::with_options(initial, options);
        self.adopt(value.clone())?;
        Ok(value)
    }

    /// Create an owned [`ComputedValue`] over `deps`.
    pub fn computed<T, F>(&self, deps: &[&dyn Observable], compute: F) -> Result<ComputedValue<T>>
    where
        T: PartialEq + 'static,
        F: Fn() -> T + 'static,
    {
        ComputedValue::new(self, deps, compute)
    }

    /// Create an owned [`ComputedValue`] from options.
    pub fn computed_with_options<T, F>(
        &self,
        deps: &[&dyn Observable],
        options: ComputedOptions<T>,
        compute: F,
    ) -> Result<ComputedValue<T>>
    where
        T: PartialEq + 'static,
        F: Fn() -> T + 'static,
    {
        ComputedValue::with_options(self, deps, options, compute)
    }

    /// Reference a container this one does not own. It is never disposed
    /// by this container.
    pub fn nest(&self, other: &ViewModel) {
        self.inner
            .nested
            .borrow_mut()
            .push(Rc::downgrade(&other.inner));
    }

    /// Nested containers that are still alive.
    pub fn nested(&self) -> Vec<ViewModel> {
        self.inner
            .nested
            .borrow()
            .iter()
            .filter_map(|weak| weak.upgrade())
            .map(|inner| ViewModel { inner })
            .collect()
    }

    /// Number of owned children that are still live.
    pub fn owned_count(&self) -> usize {
        self.inner
            .owned
            .borrow()
            .iter()
            .filter(|child| !child.is_disposed())
            .count()
    }

    /// Report this container as read by the active tracking session.
    pub fn track(&self) {
        report_access(&self.inner.node);
    }

    /// Signal that something on this container changed, for state that is
    /// not held in an observable field.
    pub fn notify_changed(&self) {
        self.inner.node.notify();
    }

    /// Dispose every owned child, then the container's own listeners.
    /// Nested containers are left alone. Repeated calls are no-ops.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }

        let owned = std::mem::take(&mut *self.inner.owned.borrow_mut());
        debug!(view_model = %self.inner.name, owned = owned.len(), "disposing view model");
        for child in owned {
            child.dispose();
        }
        self.inner.node.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Observable for ViewModel {
    fn node(&self) -> &ObservableNode {
        &self.inner.node
    }
}

impl ResettableNode for ViewModel {
    fn dispose(&self) {
        ViewModel::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        ViewModel::is_disposed(self)
    }
}

impl fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModel")
            .field("name", &self.inner.name)
            .field("owned", &self.owned_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
