//! Running many protected calls behind one concurrency gate.

use crate::operation::ResilientOperation;
use futures::future::join_all;
use intake_resilience_core::{CallOutcome, FailureCause, ResilienceError};
use intake_resilience_gate::{ConcurrencyGate, GateError};
use std::fmt;
use tower::Service;

/// How one batch item ended.
#[derive(Debug)]
pub enum ItemOutcome<T, E> {
    /// The operation produced the value.
    Succeeded(T),
    /// The fallback produced the value.
    Fallback {
        /// Value returned by the fallback.
        value: T,
        /// What sent the item to the fallback.
        cause: FailureCause,
    },
    /// The fallback failed too; the item has no value.
    Degraded {
        /// What sent the item to the fallback.
        cause: FailureCause,
    },
    /// The item failed and no fallback was attached.
    Failed(BatchItemError<E>),
}

impl<T, E> ItemOutcome<T, E> {
    /// The item's value, if it has one.
    pub fn value(&self) -> Option<&T> {
        match self {
            ItemOutcome::Succeeded(value) | ItemOutcome::Fallback { value, .. } => Some(value),
            ItemOutcome::Degraded { .. } | ItemOutcome::Failed(_) => None,
        }
    }
}

impl<T, E> From<CallOutcome<T>> for ItemOutcome<T, E> {
    fn from(outcome: CallOutcome<T>) -> Self {
        match outcome {
            CallOutcome::Success(value) => ItemOutcome::Succeeded(value),
            CallOutcome::Fallback { value, cause } => ItemOutcome::Fallback { value, cause },
            CallOutcome::Null { cause } => ItemOutcome::Degraded { cause },
        }
    }
}

/// Why a batch item failed.
#[derive(Debug, thiserror::Error)]
pub enum BatchItemError<E> {
    /// The item never got a slot.
    #[error("{0}")]
    Gate(#[from] GateError),
    /// The protected operation failed.
    #[error("{0}")]
    Operation(ResilienceError<E>),
}

/// Per-item outcomes of a batch, in input order, with counts per kind.
///
/// Items serviced by a fallback are never counted as succeeded.
#[derive(Debug)]
pub struct BatchReport<T, E> {
    /// One entry per input item.
    pub items: Vec<ItemOutcome<T, E>>,
    /// Items the operation handled.
    pub succeeded: usize,
    /// Items that got a fallback value.
    pub fallback: usize,
    /// Items whose fallback failed.
    pub degraded: usize,
    /// Items that failed without a fallback, or never got a slot.
    pub failed: usize,
}

impl<T, E> BatchReport<T, E> {
    /// Tallies `items`.
    pub fn from_items(items: Vec<ItemOutcome<T, E>>) -> Self {
        let mut report = BatchReport {
            items: Vec::new(),
            succeeded: 0,
            fallback: 0,
            degraded: 0,
            failed: 0,
        };
        for item in &items {
            match item {
                ItemOutcome::Succeeded(_) => report.succeeded += 1,
                ItemOutcome::Fallback { .. } => report.fallback += 1,
                ItemOutcome::Degraded { .. } => report.degraded += 1,
                ItemOutcome::Failed(_) => report.failed += 1,
            }
        }
        report.items = items;
        report
    }

    /// Number of items.
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Returns true if every item was handled by the operation itself.
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.items.len()
    }
}

/// Runs batches of calls through a [`ConcurrencyGate`].
///
/// Every item is started at once and queues on the gate, so at most
/// `capacity` calls of the operation are in flight. Slots are released on
/// every exit path, including fallback and failure.
#[derive(Clone, Debug)]
pub struct BatchRunner {
    gate: ConcurrencyGate,
}

impl BatchRunner {
    /// Creates a runner sharing `gate`.
    pub fn new(gate: ConcurrencyGate) -> Self {
        Self { gate }
    }

    /// Creates a runner with its own gate of `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(ConcurrencyGate::with_capacity(capacity))
    }

    /// The gate bounding this runner.
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Invokes `operation` once per item and reports how each one ended.
    pub async fn run<S, Req, Res, I>(
        &self,
        operation: &ResilientOperation<S, Req, Res>,
        items: I,
    ) -> BatchReport<Res, S::Error>
    where
        S: Service<Req, Response = Res> + Clone + Send + 'static,
        S::Error: fmt::Display + Send + 'static,
        S::Future: Send + 'static,
        Req: Clone + Send + 'static,
        Res: Send + 'static,
        I: IntoIterator<Item = Req>,
    {
        let calls = items.into_iter().map(|item| async move {
            match self.gate.run(operation.invoke(item)).await {
                Ok(Ok(outcome)) => ItemOutcome::from(outcome),
                Ok(Err(err)) => ItemOutcome::Failed(BatchItemError::Operation(err)),
                Err(err) => ItemOutcome::Failed(BatchItemError::Gate(err)),
            }
        });
        let report = BatchReport::from_items(join_all(calls).await);

        tracing::info!(
            gate = %self.gate.name(),
            total = report.total(),
            succeeded = report.succeeded,
            fallback = report.fallback,
            degraded = report.degraded,
            failed = report.failed,
            "batch finished"
        );
        report
    }
}
