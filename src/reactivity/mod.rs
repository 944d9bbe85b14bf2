// ============================================================================
// axon-cells - Reactivity Module
// Dirty marking, ordered settlement, transactions and equality
// ============================================================================

pub mod batching;
pub mod equality;
pub mod tracking;

// Re-export main tracking functions
pub use tracking::{ensure_acyclic, mark_dependents, settle_pending};

// Re-export batching functions
pub use batching::transaction;

// Re-export equality functions
pub use equality::{
    always_equals, equals, never_equals, safe_equals_f32, safe_equals_f64,
    safe_equals_option_f64, shallow_equals_vec,
};
