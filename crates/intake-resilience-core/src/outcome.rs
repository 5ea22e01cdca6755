//! Outcome of a call that may be serviced by a fallback.

/// Why a call ended up on the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCause {
    /// The breaker short-circuited the call; the operation never ran.
    CircuitOpen,
    /// The operation ran and failed (after any retries).
    CallFailed,
}

impl FailureCause {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCause::CircuitOpen => "circuit_open",
            FailureCause::CallFailed => "call_failed",
        }
    }
}

/// Result of a protected call with a fallback attached.
///
/// A caller reporting on a batch needs to tell apart items the operation
/// itself handled from items the fallback papered over, so the fallback path
/// is never folded into `Success`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<T> {
    /// The protected operation produced the value.
    Success(T),
    /// The operation failed or was short-circuited and the fallback produced the value.
    Fallback {
        /// Value returned by the fallback.
        value: T,
        /// What sent the call to the fallback.
        cause: FailureCause,
    },
    /// The fallback itself failed; the call resolves to no value.
    Null {
        /// What sent the call to the fallback.
        cause: FailureCause,
    },
}

impl<T> CallOutcome<T> {
    /// Returns `true` if the operation itself succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }

    /// Returns `true` if the value came from the fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, CallOutcome::Fallback { .. })
    }

    /// Returns `true` if the call resolved to no value.
    pub fn is_null(&self) -> bool {
        matches!(self, CallOutcome::Null { .. })
    }

    /// The fallback cause, if the call took the fallback path.
    pub fn cause(&self) -> Option<FailureCause> {
        match self {
            CallOutcome::Success(_) => None,
            CallOutcome::Fallback { cause, .. } | CallOutcome::Null { cause } => Some(*cause),
        }
    }

    /// The value, wherever it came from.
    pub fn into_value(self) -> Option<T> {
        match self {
            CallOutcome::Success(value) | CallOutcome::Fallback { value, .. } => Some(value),
            CallOutcome::Null { .. } => None,
        }
    }

    /// Maps the carried value.
    pub fn map<U, F>(self, f: F) -> CallOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            CallOutcome::Success(value) => CallOutcome::Success(f(value)),
            CallOutcome::Fallback { value, cause } => CallOutcome::Fallback {
                value: f(value),
                cause,
            },
            CallOutcome::Null { cause } => CallOutcome::Null { cause },
        }
    }
}
