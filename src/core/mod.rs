// ============================================================================
// axon-cells - Core Module
// Identifiers, errors, listener registry and thread-local context
// ============================================================================

pub mod constants;
pub mod context;
pub mod error;
pub mod registry;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use context::{
    config, configure, current_version, in_transaction, with_context, PropagationConfig,
    PropagationContext,
};
pub use error::{CellError, Result};
pub use registry::{Listener, ListenerRegistry};
pub use types::{
    default_equals, AnyCell, AnyDependent, CellId, CellState, EqualsFn, ListenerId, OwnerId,
};
