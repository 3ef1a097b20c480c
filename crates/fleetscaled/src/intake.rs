//! Telemetry intake: axum handlers feeding the decision loop.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/v1/telemetry` | Queue one CPU reading for the decision loop |
//! | GET | `/v1/state` | Current debounce-state document |
//! | GET | `/healthz` | Liveness |

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use fleetscale_core::{EpochSecs, TelemetryEvent, epoch_secs};
use fleetscale_state::DebounceStore;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Shared state for intake handlers.
#[derive(Clone)]
pub struct IntakeState {
    pub events: mpsc::Sender<TelemetryEvent>,
    pub store: DebounceStore,
}

/// Body of `POST /v1/telemetry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryReport {
    pub host: String,
    /// Idle percentage as reported by the host.
    pub reading: i64,
    /// Sample time; receive time is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<EpochSecs>,
}

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

pub fn build_router(state: IntakeState) -> Router {
    Router::new()
        .route("/v1/telemetry", post(submit_telemetry))
        .route("/v1/state", get(debounce_state))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// How far ahead of the receiver's clock a sample time may be.
pub const MAX_CLOCK_SKEW_SECS: EpochSecs = 300;

/// The sample time to record. Missing, negative, or implausibly future
/// timestamps are replaced by the receive time.
pub fn sample_time(reported: Option<EpochSecs>, received: EpochSecs) -> EpochSecs {
    match reported {
        Some(ts) if ts >= 0 && ts <= received.saturating_add(MAX_CLOCK_SKEW_SECS) => ts,
        Some(ts) => {
            debug!(timestamp = ts, received, "out-of-range timestamp, using receive time");
            received
        }
        None => received,
    }
}

/// POST /v1/telemetry
async fn submit_telemetry(
    State(state): State<IntakeState>,
    Json(report): Json<TelemetryReport>,
) -> impl IntoResponse {
    let host = report.host.trim();
    if host.is_empty() {
        return error_response("host must not be empty", StatusCode::BAD_REQUEST).into_response();
    }

    let event = TelemetryEvent::new(
        host,
        report.reading,
        sample_time(report.timestamp, epoch_secs()),
    );
    debug!(host = %event.host, reading = event.reading, timestamp = event.timestamp, "telemetry received");

    match state.events.send(event).await {
        Ok(()) => (StatusCode::ACCEPTED, ApiResponse::ok("queued")).into_response(),
        Err(_) => {
            warn!("decision loop is not running, dropping telemetry");
            error_response("decision loop unavailable", StatusCode::SERVICE_UNAVAILABLE)
                .into_response()
        }
    }
}

/// GET /v1/state
async fn debounce_state(State(state): State<IntakeState>) -> impl IntoResponse {
    match state.store.snapshot() {
        Ok(doc) => ApiResponse::ok(doc).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// GET /healthz
async fn healthz() -> &'static str {
    "ok"
}
