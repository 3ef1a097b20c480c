//! Intake API tests.
//!
//! Drives the router in-process and checks what reaches the decision loop.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use fleetscale_core::Direction;
use fleetscale_state::DebounceStore;
use fleetscaled::intake::{IntakeState, build_router};
use tokio::sync::mpsc;
use tower::ServiceExt;

fn telemetry(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/telemetry")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_answers() {
    let (tx, _rx) = mpsc::channel(1);
    let router = build_router(IntakeState {
        events: tx,
        store: DebounceStore::open_in_memory(),
    });

    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn telemetry_is_queued_for_decision_loop() {
    let (tx, mut rx) = mpsc::channel(4);
    let router = build_router(IntakeState {
        events: tx,
        store: DebounceStore::open_in_memory(),
    });

    let resp = router
        .oneshot(telemetry(r#"{"host":"web01","reading":12,"timestamp":1700000000}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.host, "web01");
    assert_eq!(event.reading, 12);
    assert_eq!(event.timestamp, 1_700_000_000);
}

#[tokio::test]
async fn missing_timestamp_uses_receive_time() {
    let (tx, mut rx) = mpsc::channel(4);
    let router = build_router(IntakeState {
        events: tx,
        store: DebounceStore::open_in_memory(),
    });

    let before = fleetscale_core::epoch_secs();
    let resp = router
        .oneshot(telemetry(r#"{"host":"web01","reading":50}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let event = rx.recv().await.unwrap();
    assert!(event.timestamp >= before);
}

#[tokio::test]
async fn extreme_timestamp_is_replaced_by_receive_time() {
    let (tx, mut rx) = mpsc::channel(4);
    let router = build_router(IntakeState {
        events: tx,
        store: DebounceStore::open_in_memory(),
    });

    let before = fleetscale_core::epoch_secs();
    let body = format!(r#"{{"host":"web01","reading":5,"timestamp":{}}}"#, i64::MIN);
    let resp = router.oneshot(telemetry(&body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let event = rx.recv().await.unwrap();
    assert!(event.timestamp >= before);
}

#[tokio::test]
async fn empty_host_is_rejected() {
    let (tx, mut rx) = mpsc::channel(4);
    let router = build_router(IntakeState {
        events: tx,
        store: DebounceStore::open_in_memory(),
    });

    let resp = router
        .oneshot(telemetry(r#"{"host":"  ","reading":50}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn stopped_decision_loop_is_unavailable() {
    let (tx, rx) = mpsc::channel(4);
    drop(rx);
    let router = build_router(IntakeState {
        events: tx,
        store: DebounceStore::open_in_memory(),
    });

    let resp = router
        .oneshot(telemetry(r#"{"host":"web01","reading":50}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn state_route_reflects_store() {
    let store = DebounceStore::open_in_memory();
    store.put("web01", 1_700_000_000, Direction::Max).unwrap();

    let (tx, _rx) = mpsc::channel(1);
    let router = build_router(IntakeState {
        events: tx,
        store,
    });

    let req = Request::builder().uri("/v1/state").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["scaling"], false);
    assert_eq!(json["data"]["hosts"]["web01"]["timestamp"], 1_700_000_000);
    assert_eq!(json["data"]["hosts"]["web01"]["type"], "max");
}
