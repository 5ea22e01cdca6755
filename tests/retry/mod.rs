//! Test organization:
//! - backoff.rs: delay schedule and attempt counts
//! - patterns.rs: retryable patterns and non-retryable errors
//! - service.rs: the tower service and layer

mod backoff;
