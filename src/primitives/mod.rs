// ============================================================================
// axon-cells - Primitives Module
// Cells and the objects that link to them
// ============================================================================

pub mod coupled;
pub mod dependencies;
pub mod derived;
pub mod dynamic;
pub mod multilink;
pub mod observable;
pub mod options;
pub mod owner;
pub mod read_cell;
pub mod read_only;

// Re-export for convenience
pub use coupled::CoupledPair;
pub use dependencies::Dependencies;
pub use derived::{derived, Derived, DerivedInner};
pub use dynamic::DynamicCell;
pub use multilink::{lazy_multilink, multilink, Multilink};
pub use observable::{observable, observable_f64, Observable, ObservableInner, WeakObservable};
pub use options::{CellOptions, DerivedOptions, LinkOptions, Validator};
pub use owner::ListenerOwner;
pub use read_cell::ReadCell;
pub use read_only::ReadOnly;
