// ============================================================================
// spark-viewmodel - Primitives Module
// Node, value, computed, view model, registry, observer, selector binding
// ============================================================================

pub mod computed;
pub mod node;
pub mod observer;
pub mod registry;
pub mod selector;
pub mod value;
pub mod view_model;

// Re-export for convenience
pub use computed::{ComputedOptions, ComputedState, ComputedValue};
pub use node::{ListenerHandle, ObservableNode, WeakNode};
pub use observer::Observer;
pub use registry::{Registry, Resolver};
pub use selector::{Selection, SelectorBinding};
pub use value::{ObservableValue, ValueOptions};
pub use view_model::{ViewModel, ViewModelObject};
