// ============================================================================
// axon-cells - Errors
// Every misuse of a cell is reported at the call site
// ============================================================================

use thiserror::Error;

use super::types::ListenerId;

/// Errors returned by cell operations.
///
/// All of these are programming errors: they are deterministic and tied to
/// how the caller uses a cell, so nothing here is retried or swallowed.
/// `cell` is the label of the cell involved (`name#id`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    #[error("invalid value {value} for {cell}: expected {constraint}")]
    InvalidValue {
        cell: String,
        value: String,
        constraint: String,
    },

    #[error("cannot set value of {cell} while already notifying")]
    Reentrancy { cell: String },

    #[error("reentrant writes to {cell} did not settle after {limit} replays")]
    ReentrancyOverflow { cell: String, limit: u32 },

    #[error("cyclic dependency: {cell} would transitively depend on itself")]
    CyclicDependency { cell: String },

    #[error("listener {listener} is not registered on {cell}")]
    NotRegistered { cell: String, listener: ListenerId },

    #[error("{cell} has been disposed")]
    Disposed { cell: String },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_cell() {
        let err = CellError::Reentrancy {
            cell: "temperature#3".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot set value of temperature#3 while already notifying"
        );

        let err = CellError::InvalidValue {
            cell: "cell#1".into(),
            value: "-4".into(),
            constraint: "value in range [0, 10]".into(),
        };
        assert!(err.to_string().contains("-4"));
        assert!(err.to_string().contains("[0, 10]"));
    }
}
