// ============================================================================
// spark-viewmodel - Core Module
// Fundamental types, thread-local context and errors
// ============================================================================

pub mod context;
pub mod error;
pub mod types;
