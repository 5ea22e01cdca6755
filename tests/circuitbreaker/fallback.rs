use super::Switchable;
use intake_resilience_circuitbreaker::{BoxError, CallOutcome, CircuitBreakerLayer, FailureCause};
use std::sync::{Arc, Mutex};
use tower::{Layer, ServiceExt};

#[tokio::test]
async fn fallback_receives_the_original_arguments() {
    let upstream = Switchable::new(true);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);

    let service = CircuitBreakerLayer::builder()
        .volume_threshold(100)
        .build()
        .layer(upstream.service())
        .with_fallback(move |req: u32| {
            recorder.lock().unwrap().push(req);
            Box::pin(async move { Ok::<_, BoxError>(req * 10) })
        });

    for req in [1, 2, 3] {
        let outcome = service.clone().oneshot(req).await.unwrap();
        assert_eq!(
            outcome,
            CallOutcome::Fallback {
                value: req * 10,
                cause: FailureCause::CallFailed
            }
        );
    }
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn open_circuit_goes_straight_to_the_fallback() {
    let upstream = Switchable::new(false);
    let service = CircuitBreakerLayer::builder()
        .build()
        .layer(upstream.service())
        .with_fallback(|_: u32| Box::pin(async { Ok::<_, BoxError>(0) }));

    service.breaker().force_open();
    let outcome = service.clone().oneshot(5).await.unwrap();
    assert_eq!(outcome.cause(), Some(FailureCause::CircuitOpen));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn failing_fallback_resolves_to_null() {
    let upstream = Switchable::new(true);
    let service = CircuitBreakerLayer::builder()
        .build()
        .layer(upstream.service())
        .with_fallback(|_: u32| Box::pin(async { Err::<u32, BoxError>("cache miss".into()) }));

    let first = service.clone().oneshot(1).await.unwrap();
    assert_eq!(first, CallOutcome::Null { cause: FailureCause::CallFailed });

    let second = service.clone().oneshot(1).await.unwrap();
    assert_eq!(second, CallOutcome::Null { cause: FailureCause::CircuitOpen });
    assert_eq!(upstream.calls(), 1);
}
