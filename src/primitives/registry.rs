// ============================================================================
// spark-viewmodel - Registry
// Scoped instance lookup consumed by observers and selector bindings
// ============================================================================
//
// A Registry is an explicit context object, not a global. Scopes form a tree:
// `resolve` looks in the current scope first, then walks up the parents.
// Each scope holds at most one instance per type.
//
// Registries follow the strict lifecycle contract. Once a scope is disposed,
// resolving through it fails with `Error::Disposed`, and a registered view
// model that was disposed manually without being unregistered fails the same
// way instead of handing out a dead container.
// ============================================================================

use std::any::{type_name, Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::core::error::{Error, Result};
use crate::core::types::StrictLifecycle;
use crate::primitives::view_model::{ViewModel, ViewModelObject};

// =============================================================================
// RESOLVER
// =============================================================================

/// Synchronous lookup of a registered instance by type.
pub trait Resolver {
    fn resolve<T: 'static>(&self) -> Result<Rc<T>>;
}

// =============================================================================
// ENTRIES
// =============================================================================

struct Entry {
    type_name: &'static str,
    instance: Rc<dyn Any>,
    /// Container to check and tear down, for view-model registrations
    view_model: Option<ViewModel>,
}

struct RegistryInner {
    label: &'static str,
    parent: Option<Registry>,
    entries: RefCell<HashMap<TypeId, Entry>>,
    disposed: Cell<bool>,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// A scope of registered instances.
///
/// # Example
///
/// ```
/// use spark_viewmodel::{Registry, Resolver};
///
/// let root = Registry::root();
/// root.register(String::from("config")).unwrap();
///
/// let scope = root.child("screen");
/// assert_eq!(*scope.resolve::<String>().unwrap(), "config");
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Rc<RegistryInner>,
}

impl Registry {
    /// Create a root scope.
    pub fn root() -> Self {
        Self::build("root", None)
    }

    /// Create a child scope whose lookups fall back to `self`.
    pub fn child(&self, label: &'static str) -> Self {
        Self::build(label, Some(self.clone()))
    }

    fn build(label: &'static str, parent: Option<Registry>) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                label,
                parent,
                entries: RefCell::new(HashMap::new()),
                disposed: Cell::new(false),
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        self.inner.label
    }

    /// Register an instance in this scope.
    pub fn register<T: 'static>(&self, instance: T) -> Result<Rc<T>> {
        self.insert(Rc::new(instance), None)
    }

    /// Register an already shared instance in this scope.
    pub fn register_rc<T: 'static>(&self, instance: Rc<T>) -> Result<Rc<T>> {
        self.insert(instance, None)
    }

    /// Register a view model. Its container is disposed when it is
    /// unregistered or when this scope is disposed.
    pub fn register_view_model<T: ViewModelObject>(&self, instance: T) -> Result<Rc<T>> {
        let view_model = instance.view_model().clone();
        self.insert(Rc::new(instance), Some(view_model))
    }

    fn insert<T: 'static>(&self, instance: Rc<T>, view_model: Option<ViewModel>) -> Result<Rc<T>> {
        self.ensure_alive()?;

        let mut entries = self.inner.entries.borrow_mut();
        let key = TypeId::of::<T>();
        if entries.contains_key(&key) {
            return Err(Error::AlreadyRegistered {
                type_name: type_name::<T>(),
            });
        }

        debug!(scope = self.inner.label, type_name = type_name::<T>(), "register");
        entries.insert(
            key,
            Entry {
                type_name: type_name::<T>(),
                instance: instance.clone(),
                view_model,
            },
        );
        Ok(instance)
    }

    /// Remove the instance of `T` from this scope, disposing its container
    /// if it was registered as a view model.
    pub fn unregister<T: 'static>(&self) -> Result<Rc<T>> {
        self.ensure_alive()?;

        let entry = self
            .inner
            .entries
            .borrow_mut()
            .remove(&TypeId::of::<T>())
            .ok_or(Error::NotRegistered {
                type_name: type_name::<T>(),
            })?;

        debug!(scope = self.inner.label, type_name = entry.type_name, "unregister");
        if let Some(view_model) = &entry.view_model {
            view_model.dispose();
        }
        entry.instance.downcast::<T>().map_err(|_| Error::NotRegistered {
            type_name: type_name::<T>(),
        })
    }

    /// Whether `T` is registered in this scope (parents not consulted).
    pub fn contains<T: 'static>(&self) -> bool {
        self.inner.entries.borrow().contains_key(&TypeId::of::<T>())
    }

    fn lookup<T: 'static>(&self) -> Option<Result<Rc<T>>> {
        let entries = self.inner.entries.borrow();
        let entry = entries.get(&TypeId::of::<T>())?;

        if entry.view_model.as_ref().is_some_and(ViewModel::is_disposed) {
            warn!(scope = self.inner.label, type_name = entry.type_name, "resolved a disposed view model");
            return Some(Err(Error::Disposed {
                type_name: entry.type_name,
            }));
        }

        Some(entry.instance.clone().downcast::<T>().map_err(|_| {
            Error::NotRegistered {
                type_name: type_name::<T>(),
            }
        }))
    }

    /// Dispose this scope: every registered view model is disposed and every
    /// later access through this scope fails. Child scopes created from it
    /// fall back to a dead parent, so they fail too once they miss locally.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }

        let entries = std::mem::take(&mut *self.inner.entries.borrow_mut());
        debug!(scope = self.inner.label, entries = entries.len(), "dispose scope");
        for entry in entries.into_values() {
            if let Some(view_model) = entry.view_model {
                view_model.dispose();
            }
        }
    }
}

impl Resolver for Registry {
    fn resolve<T: 'static>(&self) -> Result<Rc<T>> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if current.is_disposed() {
                warn!(scope = current.inner.label, type_name = type_name::<T>(), "resolve through disposed scope");
                return Err(Error::Disposed {
                    type_name: type_name::<T>(),
                });
            }
            if let Some(found) = current.lookup::<T>() {
                return found;
            }
            scope = current.inner.parent.as_ref();
        }

        debug!(scope = self.inner.label, type_name = type_name::<T>(), "not registered");
        Err(Error::NotRegistered {
            type_name: type_name::<T>(),
        })
    }
}

impl StrictLifecycle for Registry {
    fn resource_name(&self) -> &'static str {
        "Registry"
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("label", &self.inner.label)
            .field("entries", &self.inner.entries.borrow().len())
            .field("has_parent", &self.inner.parent.is_some())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
