use crate::config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
use crate::CircuitBreaker;
use std::sync::Arc;
use tower::Layer;

/// A Tower Layer that applies circuit breaker behavior to an inner service.
///
/// Every call to [`Layer::layer`] creates a breaker with its own state;
/// clones of the resulting service share it.
///
/// ```rust
/// use intake_resilience_circuitbreaker::CircuitBreakerLayer;
/// use std::time::Duration;
/// use tower::{service_fn, ServiceBuilder};
///
/// let layer = CircuitBreakerLayer::builder()
///     .error_threshold_percentage(50.0)
///     .reset_timeout(Duration::from_secs(30))
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) }));
/// ```
#[derive(Clone)]
pub struct CircuitBreakerLayer {
    config: Arc<CircuitBreakerConfig>,
}

impl CircuitBreakerLayer {
    pub(crate) fn new(config: impl Into<Arc<CircuitBreakerConfig>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// Creates a new builder for configuring a circuit breaker layer.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Returns the configuration shared by every breaker this layer creates.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

impl<S> Layer<S> for CircuitBreakerLayer {
    type Service = CircuitBreaker<S>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(service, Arc::clone(&self.config))
    }
}
