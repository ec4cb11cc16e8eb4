// ============================================================================
// spark-viewmodel - A Reactive View-Model Runtime for Rust
// ============================================================================
//
// Observable values with change-gated notification, computed values over
// declared dependencies, view-model containers that own their fields, and
// observers that subscribe to exactly what a render callback read.
//
// Everything is single-threaded and synchronous: a `set` runs every
// downstream listener before it returns.
// ============================================================================

#[macro_use]
mod macros;

pub mod core;
pub mod primitives;
pub mod reactivity;

// Re-export core items at crate root
pub use core::context::{is_tracking, tracking_depth, with_context, ReactiveContext};
pub use core::error::{Error, Result};
pub use core::types::{
    default_equals, EqualsFn, Listener, NodeId, Observable, ResettableNode, StrictLifecycle,
};

// Re-export primitives at crate root
pub use primitives::computed::{ComputedOptions, ComputedState, ComputedValue};
pub use primitives::node::{ListenerHandle, ObservableNode, WeakNode};
pub use primitives::observer::Observer;
pub use primitives::registry::{Registry, Resolver};
pub use primitives::selector::{Selection, SelectorBinding};
pub use primitives::value::{ObservableValue, ValueOptions};
pub use primitives::view_model::{ViewModel, ViewModelObject};

// Re-export reactivity functions
pub use reactivity::equality::{
    always_equals, deep_equals, equals, iterable_equals, never_equals, ptr_equals,
    safe_equals_f32, safe_equals_f64,
};
pub use reactivity::tracking::{
    peek, report, report_access, take_abandoned_accesses, track, track_result, untrack,
    AccessSet,
};

// =============================================================================
// TESTS
// =============================================================================
