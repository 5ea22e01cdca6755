//! What a [`ResilientOperation`](crate::ResilientOperation) returns when the
//! protected call does not succeed.

use futures::future::BoxFuture;
use intake_resilience_circuitbreaker::FallbackHandler;
use intake_resilience_core::{BoxError, FailureCause, ResilienceError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Fallback attached to an operation at construction time.
pub enum FallbackSpec<Req, Res> {
    /// The same value for every failed call.
    Static(Res),
    /// A value computed from the original call arguments. The computation
    /// may itself fail, in which case the call resolves to no value.
    Computed(Arc<FallbackHandler<Req, Res>>),
}

impl<Req, Res> FallbackSpec<Req, Res> {
    /// Wraps an async function of the original arguments.
    ///
    /// ```
    /// use intake_resilience::{FallbackError, FallbackSpec};
    ///
    /// let spec: FallbackSpec<String, String> = FallbackSpec::computed(|file: String| async move {
    ///     if file.ends_with(".exe") {
    ///         Err(FallbackError::new("no placeholder for executables"))
    ///     } else {
    ///         Ok(format!("{file}: queued"))
    ///     }
    /// });
    /// assert!(matches!(spec, FallbackSpec::Computed(_)));
    /// ```
    pub fn computed<F, Fut, Er>(f: F) -> Self
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, Er>> + Send + 'static,
        Er: Into<BoxError>,
        Req: 'static,
        Res: 'static,
    {
        let handler: Arc<FallbackHandler<Req, Res>> =
            Arc::new(move |req: Req| -> BoxFuture<'static, Result<Res, BoxError>> {
                let fut = f(req);
                Box::pin(async move { fut.await.map_err(Into::into) })
            });
        FallbackSpec::Computed(handler)
    }

    pub(crate) fn into_handler(self) -> Arc<FallbackHandler<Req, Res>>
    where
        Req: 'static,
        Res: Clone + Send + Sync + 'static,
    {
        match self {
            FallbackSpec::Static(value) => {
                Arc::new(move |_: Req| -> BoxFuture<'static, Result<Res, BoxError>> {
                    let value = value.clone();
                    Box::pin(async move { Ok(value) })
                })
            }
            FallbackSpec::Computed(handler) => handler,
        }
    }
}

impl<Req, Res: fmt::Debug> fmt::Debug for FallbackSpec<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackSpec::Static(value) => f.debug_tuple("Static").field(value).finish(),
            FallbackSpec::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// A fallback could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct FallbackError {
    reason: String,
}

impl FallbackError {
    /// Creates an error with a human-readable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The error for a call that degraded to no value.
    pub(crate) fn degraded(cause: FailureCause) -> Self {
        Self::new(format!("fallback produced no value ({})", cause.as_str()))
    }

    /// Why the fallback failed.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl<E> From<FallbackError> for ResilienceError<E> {
    fn from(err: FallbackError) -> Self {
        ResilienceError::FallbackFailed { reason: err.reason }
    }
}
