// ============================================================================
// spark-viewmodel - Selector Binding
// Explicit selector over a resolved source, two-way when it selects a value
// ============================================================================
//
// The selector picks what to bind from the source:
//
//   Selection::Property(v)  an ObservableValue; the binding reads it and can
//                           write back through `set`
//   Selection::Derived(c)   a ComputedValue; read-only
//   Selection::Plain(x)     a plain value; read-only, tracking only the nodes
//                           the selector itself read
//
// Unlike `Observer::observe`, the source container is not reported as read,
// so a selector over one field only reruns when that field changes.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::core::error::{Error, Result};
use crate::core::types::Observable;
use crate::primitives::computed::ComputedValue;
use crate::primitives::observer::Observer;
use crate::primitives::registry::Resolver;
use crate::primitives::value::ObservableValue;

// =============================================================================
// SELECTION
// =============================================================================

/// What a selector picked from its source.
pub enum Selection<T> {
    Property(ObservableValue<T>),
    Derived(ComputedValue<T>),
    Plain(T),
}

impl<T: 'static> Selection<T> {
    /// Whether a binding over this selection can write back.
    pub fn is_writable(&self) -> bool {
        matches!(self, Selection::Property(_))
    }

    /// Read the selected value, reporting the selected node to the active
    /// tracking session.
    pub fn read(&self) -> T
    where
        T: Clone,
    {
        match self {
            Selection::Property(value) => value.get(),
            Selection::Derived(computed) => computed.get(),
            Selection::Plain(value) => value.clone(),
        }
    }
}

impl<T> From<ObservableValue<T>> for Selection<T> {
    fn from(value: ObservableValue<T>) -> Self {
        Selection::Property(value)
    }
}

impl<T> From<ComputedValue<T>> for Selection<T> {
    fn from(computed: ComputedValue<T>) -> Self {
        Selection::Derived(computed)
    }
}

impl<T: fmt::Debug> fmt::Debug for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Property(value) => f.debug_tuple("Property").field(value).finish(),
            Selection::Derived(computed) => f.debug_tuple("Derived").field(computed).finish(),
            Selection::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
        }
    }
}

// =============================================================================
// SELECTOR BINDING
// =============================================================================

type SelectorFn<S, T> = Rc<dyn Fn(&S) -> Selection<T>>;

/// A binding that reads one selected thing from a resolved source.
///
/// # Example
///
/// ```
/// use spark_viewmodel::{
///     ObservableValue, Registry, Selection, SelectorBinding, ViewModel, ViewModelObject,
/// };
///
/// struct FormVm {
///     base: ViewModel,
///     email: ObservableValue<String>,
/// }
///
/// impl ViewModelObject for FormVm {
///     fn view_model(&self) -> &ViewModel {
///         &self.base
///     }
/// }
///
/// let registry = Registry::root();
/// let base = ViewModel::new("FormVm");
/// let email = base.value(String::new()).unwrap();
/// registry.register_view_model(FormVm { base, email }).unwrap();
///
/// let binding = SelectorBinding::new(|vm: &FormVm| Selection::Property(vm.email.clone()), || {});
/// assert_eq!(binding.value(&registry).unwrap(), "");
/// binding.set(String::from("ada@example.com")).unwrap();
/// assert_eq!(binding.value(&registry).unwrap(), "ada@example.com");
/// ```
pub struct SelectorBinding<S, T> {
    selector: RefCell<SelectorFn<S, T>>,
    observer: Observer,
    bound: RefCell<Option<ObservableValue<T>>>,
    evaluated: Cell<bool>,
}

impl<S: 'static, T: Clone + 'static> SelectorBinding<S, T> {
    /// Create a binding. `on_invalidate` fires when anything the latest
    /// evaluation depended on changes.
    pub fn new(
        selector: impl Fn(&S) -> Selection<T> + 'static,
        on_invalidate: impl Fn() + 'static,
    ) -> Self {
        Self {
            selector: RefCell::new(Rc::new(selector)),
            observer: Observer::labeled("selector_binding", on_invalidate),
            bound: RefCell::new(None),
            evaluated: Cell::new(false),
        }
    }

    /// Resolve the source, apply the selector and read the selection,
    /// resubscribing to exactly the nodes involved.
    pub fn value(&self, resolver: &impl Resolver) -> Result<T> {
        self.ensure_live()?;
        let source = resolver.resolve::<S>()?;
        let selector = self.selector.borrow().clone();

        let (value, bound) = self.observer.run(&[], || {
            let selection = selector(&*source);
            let value = selection.read();
            let bound = match selection {
                Selection::Property(property) => Some(property),
                _ => None,
            };
            (value, bound)
        });

        *self.bound.borrow_mut() = bound;
        self.evaluated.set(true);
        Ok(value)
    }

    /// Write back through a `Selection::Property` binding.
    ///
    /// Returns whether the value changed. Fails with [`Error::NotBound`]
    /// before the first evaluation and [`Error::ReadOnlyBinding`] for
    /// derived or plain selections, and with [`Error::Disposed`] once the
    /// binding is disposed.
    pub fn set(&self, value: T) -> Result<bool> {
        self.ensure_live()?;
        if !self.evaluated.get() {
            return Err(Error::NotBound);
        }
        let bound = self.bound.borrow().clone();
        match bound {
            Some(property) => Ok(property.set(value)),
            None => Err(Error::ReadOnlyBinding),
        }
    }

    /// Whether the latest evaluation selected a writable property.
    pub fn is_two_way(&self) -> bool {
        self.bound.borrow().is_some()
    }

    /// Swap the selector. Existing subscriptions are dropped and the
    /// invalidate callback fires once so the view re-reads; the next
    /// [`value`](Self::value) call subscribes for the new selector.
    pub fn replace_selector(&self, selector: impl Fn(&S) -> Selection<T> + 'static) {
        self.observer.reset();
        self.bound.borrow_mut().take();
        self.evaluated.set(false);
        *self.selector.borrow_mut() = Rc::new(selector);
        debug!("selector replaced");
        self.observer.invalidate();
    }

    /// Whether `observable` was read by the latest evaluation.
    pub fn is_tracking<O: Observable + ?Sized>(&self, observable: &O) -> bool {
        self.observer.is_tracking(observable)
    }

    pub fn rebuild_count(&self) -> usize {
        self.observer.rebuild_count()
    }

    pub fn dispose(&self) {
        self.observer.dispose();
        self.bound.borrow_mut().take();
    }

    pub fn is_disposed(&self) -> bool {
        self.observer.is_disposed()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.observer.is_disposed() {
            warn!("selector binding used after dispose");
            return Err(Error::Disposed {
                type_name: "SelectorBinding",
            });
        }
        Ok(())
    }
}

impl<S, T> fmt::Debug for SelectorBinding<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorBinding")
            .field("observer", &self.observer)
            .field("two_way", &self.bound.borrow().is_some())
            .field("evaluated", &self.evaluated.get())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
