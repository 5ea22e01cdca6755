//! Error types for the concurrency gate.

/// Why a slot could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The configured maximum wait elapsed first.
    #[error("timed out waiting for a slot in gate {name} (capacity {capacity})")]
    Timeout {
        /// Gate name.
        name: String,
        /// Number of slots.
        capacity: usize,
    },
    /// The gate was closed while waiting or before the call.
    #[error("gate {name} is closed")]
    Closed {
        /// Gate name.
        name: String,
    },
}

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
