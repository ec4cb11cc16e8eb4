// ============================================================================
// spark-viewmodel - Errors
// Construction, resolution and lifecycle failures
// ============================================================================

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the view-model layer.
///
/// The permissive node layer (`ObservableNode`, `ObservableValue`) never
/// fails. Everything here comes from containers, the registry and bindings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A child was attached to a view model that has already been disposed.
    #[error(
        "cannot attach a child to view model `{owner}`: it has already been disposed; \
         create the child before disposing its owner or use ComputedValue::detached"
    )]
    OwnerDisposed { owner: String },

    /// Nothing registered for the type in this scope or any parent scope.
    #[error(
        "no instance of `{type_name}` is registered in this scope or any parent scope; \
         register it on the root registry for global access, \
         or on a scoped registry reachable from this one"
    )]
    NotRegistered { type_name: &'static str },

    /// A scope holds at most one instance per type.
    #[error(
        "an instance of `{type_name}` is already registered in this scope; \
         unregister it first or register the new instance on a child scope"
    )]
    AlreadyRegistered { type_name: &'static str },

    /// Access to a resource past its hard lifecycle boundary.
    #[error(
        "`{type_name}` was accessed after it was disposed; probable causes: \
         its scope was removed, it was disposed manually without being unregistered, \
         or it is being read during teardown"
    )]
    Disposed { type_name: &'static str },

    /// Write-back attempted on a binding whose selection is not writable.
    #[error("binding is read-only: the selector did not return a writable ObservableValue")]
    ReadOnlyBinding,

    /// Write-back attempted before the binding ever ran its selector.
    #[error("binding has not been evaluated yet; read it once before writing back")]
    NotBound,
}

impl Error {
    /// Whether this error marks a hard lifecycle boundary.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::OwnerDisposed { .. } | Self::Disposed { .. })
    }
}
