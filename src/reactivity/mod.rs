// ============================================================================
// spark-viewmodel - Reactivity Module
// Dependency tracking and change-gating equality
// ============================================================================

pub mod equality;
pub mod tracking;
