//! Core infrastructure for intake-resilience.
//!
//! Everything the individual components share lives here:
//! - the event system each component uses to publish notifications
//! - [`ResilienceError`], the error taxonomy seen by callers of the stack
//! - [`CallOutcome`], the result of a call that may be serviced by a fallback

pub mod error;
pub mod events;
pub mod outcome;

pub use error::{BoxError, ResilienceError};
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
pub use outcome::{CallOutcome, FailureCause};
