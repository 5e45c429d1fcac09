use super::state::AppState;
use crate::bridge::InterruptOutcome;
use crate::error::BridgeError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Event posted by the client application
#[derive(Debug, Deserialize)]
pub struct ClientEvent {
    #[serde(rename = "type")]
    pub event_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InterruptResponse {
    pub status: String,
    /// Frame the renderer was told to resume from, if an interrupt was sent
    pub start_frame_idx: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /status
/// Current bridge statistics
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.bridge.stats()))
}

/// POST /interrupt
/// Interrupt the current utterance
pub async fn interrupt(State(state): State<AppState>) -> Response {
    info!("Interrupt requested over HTTP");
    run_interrupt(&state).await
}

/// POST /events
/// Client events; only `interrupt` has an effect
pub async fn post_event(
    State(state): State<AppState>,
    Json(event): Json<ClientEvent>,
) -> Response {
    match event.event_type.as_str() {
        "interrupt" => {
            info!("Interrupt event received");
            run_interrupt(&state).await
        }
        other => {
            debug!("Ignoring client event: {}", other);
            (StatusCode::ACCEPTED, Json(serde_json::json!({ "status": "ignored" }))).into_response()
        }
    }
}

async fn run_interrupt(state: &AppState) -> Response {
    match state.bridge.interrupt().await {
        Ok(InterruptOutcome::Sent { start_frame_idx }) => (
            StatusCode::OK,
            Json(InterruptResponse {
                status: "interrupted".to_string(),
                start_frame_idx: Some(start_frame_idx),
            }),
        )
            .into_response(),
        Ok(InterruptOutcome::Idle) => (
            StatusCode::OK,
            Json(InterruptResponse {
                status: "idle".to_string(),
                start_frame_idx: None,
            }),
        )
            .into_response(),
        Err(BridgeError::NoSession) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "No renderer session".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Interrupt failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("Interrupt failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}
