use crate::controller::AdmissionController;
use crate::error::Throttled;
use crate::identity::Identity;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

/// A Tower [`Layer`] that charges each request to an [`Identity`] before it
/// reaches the inner service.
///
/// The identity is extracted from the request by a caller-supplied function.
/// The inner service's error type must be constructible from [`Throttled`].
///
/// # Examples
///
/// ```
/// use intake_resilience_admission::{AdmissionController, AdmissionLayer, Identity, Throttled};
/// use intake_resilience_loadlimit::FixedLimit;
/// use std::net::IpAddr;
/// use std::time::Duration;
/// use tower::ServiceBuilder;
///
/// struct Upload {
///     user: Option<String>,
///     peer: IpAddr,
/// }
///
/// #[derive(Debug)]
/// enum UploadError {
///     Throttled(Throttled),
/// }
///
/// impl From<Throttled> for UploadError {
///     fn from(err: Throttled) -> Self {
///         UploadError::Throttled(err)
///     }
/// }
///
/// let admission = AdmissionController::builder()
///     .window(Duration::from_secs(60))
///     .build(FixedLimit(100));
///
/// let service = ServiceBuilder::new()
///     .layer(AdmissionLayer::new(admission, |req: &Upload| {
///         Identity::resolve(req.user.as_deref(), req.peer)
///     }))
///     .service_fn(|_req: Upload| async { Ok::<_, UploadError>("stored") });
/// ```
pub struct AdmissionLayer<K> {
    controller: AdmissionController,
    key: Arc<K>,
}

impl<K> AdmissionLayer<K> {
    /// Creates a layer that charges requests to the identity `key` returns.
    pub fn new(controller: AdmissionController, key: K) -> Self {
        Self {
            controller,
            key: Arc::new(key),
        }
    }

    /// The shared controller.
    pub fn controller(&self) -> &AdmissionController {
        &self.controller
    }
}

impl<K> Clone for AdmissionLayer<K> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            key: Arc::clone(&self.key),
        }
    }
}

impl<S, K> Layer<S> for AdmissionLayer<K> {
    type Service = Admitted<S, K>;

    fn layer(&self, service: S) -> Self::Service {
        Admitted {
            inner: service,
            controller: self.controller.clone(),
            key: Arc::clone(&self.key),
        }
    }
}

/// Service produced by [`AdmissionLayer`].
pub struct Admitted<S, K> {
    inner: S,
    controller: AdmissionController,
    key: Arc<K>,
}

impl<S: Clone, K> Clone for Admitted<S, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            controller: self.controller.clone(),
            key: Arc::clone(&self.key),
        }
    }
}

impl<S, K> Admitted<S, K> {
    /// The controller in front of this service.
    pub fn controller(&self) -> &AdmissionController {
        &self.controller
    }
}

impl<S, K, Req> Service<Req> for Admitted<S, K>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<Throttled> + Send + 'static,
    K: Fn(&Req) -> Identity + Send + Sync + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let identity = (self.key)(&req);
        let controller = self.controller.clone();
        let inner = self.inner.clone();

        Box::pin(async move {
            controller.admit(&identity).await?;
            inner.oneshot(req).await
        })
    }
}
