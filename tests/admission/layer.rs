use super::peer;
use intake_resilience_admission::{AdmissionController, AdmissionLayer, FixedLimit, Identity, Throttled};
use intake_resilience_gate::{ConcurrencyGate, GateError, GateLayer};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::{ServiceBuilder, ServiceExt, service_fn};

#[derive(Debug, Clone)]
struct Upload {
    user: Option<&'static str>,
    peer: IpAddr,
    file: &'static str,
}

#[derive(Debug)]
enum UploadError {
    Throttled(Throttled),
    Gate(GateError),
}

impl From<Throttled> for UploadError {
    fn from(err: Throttled) -> Self {
        UploadError::Throttled(err)
    }
}

impl From<GateError> for UploadError {
    fn from(err: GateError) -> Self {
        UploadError::Gate(err)
    }
}

fn upload(user: Option<&'static str>, last_octet: u8, file: &'static str) -> Upload {
    Upload {
        user,
        peer: peer(last_octet),
        file,
    }
}

fn identity_of(req: &Upload) -> Identity {
    Identity::resolve(req.user, req.peer)
}

#[tokio::test(start_paused = true)]
async fn throttled_uploads_carry_a_retry_hint() {
    let stored = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&stored);
    let admission = AdmissionController::builder()
        .window(Duration::from_secs(60))
        .build(FixedLimit(2));

    let service = ServiceBuilder::new()
        .layer(AdmissionLayer::new(admission, identity_of))
        .service(service_fn(move |req: Upload| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, UploadError>(format!("stored {}", req.file)) }
        }));

    for file in ["a.pdf", "b.pdf"] {
        let response = service.clone().oneshot(upload(Some("erin"), 1, file)).await.unwrap();
        assert_eq!(response, format!("stored {file}"));
    }

    tokio::time::advance(Duration::from_secs(15)).await;
    let err = service
        .clone()
        .oneshot(upload(Some("erin"), 2, "c.pdf"))
        .await
        .unwrap_err();
    match err {
        UploadError::Throttled(throttled) => {
            assert_eq!(throttled.identity, Identity::Principal("erin".into()));
            assert_eq!(throttled.retry_after, Duration::from_secs(45));
        }
        other => panic!("expected throttling, got {other:?}"),
    }
    assert_eq!(stored.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn admission_runs_before_the_gate() {
    let gate = ConcurrencyGate::with_capacity(1);
    let admission = AdmissionController::builder().build(FixedLimit(1));

    let service = ServiceBuilder::new()
        .layer(AdmissionLayer::new(admission.clone(), identity_of))
        .layer(GateLayer::new(gate.clone()))
        .service(service_fn(|req: Upload| async move { Ok::<_, UploadError>(req.file) }));

    assert_eq!(service.clone().oneshot(upload(None, 9, "x.png")).await.unwrap(), "x.png");
    let err = service.clone().oneshot(upload(None, 9, "y.png")).await.unwrap_err();
    assert!(matches!(err, UploadError::Throttled(_)));

    gate.close();
    let err = service.oneshot(upload(None, 10, "z.png")).await.unwrap_err();
    assert!(matches!(err, UploadError::Gate(GateError::Closed { .. })));
    assert_eq!(admission.usage(&Identity::from(peer(10))).count, 1);
}
