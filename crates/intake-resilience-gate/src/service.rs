//! Gated service implementation.

use crate::error::GateError;
use crate::gate::ConcurrencyGate;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};

/// Service that holds a gate slot for the whole duration of each call.
#[derive(Clone)]
pub struct Gated<S> {
    inner: S,
    gate: ConcurrencyGate,
}

impl<S> Gated<S> {
    /// Wraps `inner` behind `gate`.
    pub fn new(inner: S, gate: ConcurrencyGate) -> Self {
        Self { inner, gate }
    }

    /// The gate in front of this service.
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }
}

impl<S, Request> Service<Request> for Gated<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<GateError> + Send + 'static,
    Request: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Backpressure comes from queueing on the gate inside `call`.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let gate = self.gate.clone();
        let inner = self.inner.clone();

        Box::pin(async move {
            let _slot = gate.acquire().await?;
            inner.oneshot(request).await
        })
    }
}
