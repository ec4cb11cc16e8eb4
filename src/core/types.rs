// ============================================================================
// spark-viewmodel - Core Types
// Shared traits and type aliases for the node graph
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::error::{Error, Result};
use crate::primitives::node::ObservableNode;

// =============================================================================
// IDENTITY
// =============================================================================

/// Process-unique (per thread) identity of an [`ObservableNode`].
///
/// Access sets and subscription diffs compare nodes by this id, never by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// Raw numeric id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// CALLBACKS
// =============================================================================

/// A listener registered on a node. Shared so that the same callback can be
/// registered on many nodes and removed by reference.
pub type Listener = Rc<dyn Fn()>;

/// Equality function type for comparing values.
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// Default equality using PartialEq
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// OBSERVABLE - anything backed by a node
// =============================================================================

/// Anything that can be watched exposes the node that carries its listeners.
///
/// Implemented by [`ObservableNode`], `ObservableValue<T>`, `ComputedValue<T>`
/// and `ViewModel`, so heterogeneous dependency lists can be written as
/// `&[&dyn Observable]`.
pub trait Observable {
    fn node(&self) -> &ObservableNode;
}

impl<O: Observable + ?Sized> Observable for Rc<O> {
    fn node(&self) -> &ObservableNode {
        (**self).node()
    }
}

impl<O: Observable + ?Sized> Observable for &O {
    fn node(&self) -> &ObservableNode {
        (**self).node()
    }
}

// =============================================================================
// LIFECYCLE CONTRACTS
// =============================================================================

/// Permissive disposal: a convenience reset, not a terminal state.
///
/// `dispose()` may be called any number of times and the resource stays
/// readable afterwards. Listeners may even be added again.
pub trait ResettableNode {
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// Strict disposal: a hard lifecycle boundary.
///
/// Once disposed, every access must fail with [`Error::Disposed`] instead of
/// handing out stale data.
pub trait StrictLifecycle {
    /// Type name reported in [`Error::Disposed`].
    fn resource_name(&self) -> &'static str;

    fn is_disposed(&self) -> bool;

    /// Fail loudly if the resource is past its lifecycle boundary.
    fn ensure_alive(&self) -> Result<()> {
        if self.is_disposed() {
            Err(Error::Disposed {
                type_name: self.resource_name(),
            })
        } else {
            Ok(())
        }
    }
}
