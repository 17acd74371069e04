use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::Serialize;

use crate::cache::snapshot::SnapshotSummary;
use crate::manager::{CredentialHandle, ManagerState};
use crate::server::server::AppState;

pub static HEALTH_PATH: &str = "/health";
pub static STATUS_PATH: &str = "/status";

/// Public view of the manager; never includes the secret or the session token.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: ManagerState,
    pub generation: u64,
    pub credentials: SnapshotSummary,
    pub expired: bool,
    pub snapshot_age_seconds: i64,
    pub last_refresh_at: DateTime<Utc>,
    pub last_attempt_at: DateTime<Utc>,
    pub next_refresh_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl StatusResponse {
    pub fn from_handle(handle: &CredentialHandle) -> Self {
        let snapshot = handle.snapshot();
        let status = handle.status();
        let now = Utc::now();
        Self {
            state: status.state,
            generation: status.generation,
            credentials: snapshot.summary(),
            expired: snapshot.is_expired_at(now),
            snapshot_age_seconds: snapshot.age_at(now).num_seconds(),
            last_refresh_at: status.last_refresh_at,
            last_attempt_at: status.last_attempt_at,
            next_refresh_at: status.next_refresh_at,
            last_error: status.last_error,
            consecutive_failures: status.consecutive_failures,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(STATUS_PATH, get(status))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.credentials.is_expired() {
        false => (StatusCode::OK, "ok"),
        true => (StatusCode::SERVICE_UNAVAILABLE, "credentials expired"),
    }
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::from_handle(&state.credentials))
}
