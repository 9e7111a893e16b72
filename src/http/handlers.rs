use super::state::AppState;
use crate::control::CommandKind;
use crate::session::PairingError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeResponse {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub frames: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(e: anyhow::Error) -> Response {
    let status = match e.downcast_ref::<PairingError>() {
        Some(PairingError::InvalidCode(_)) | Some(PairingError::WrongSide { .. }) => {
            StatusCode::BAD_REQUEST
        }
        Some(PairingError::Busy(_)) | Some(PairingError::NotConnected) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Request failed: {:#}", e);
    } else {
        warn!("Request rejected: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            error: format!("{:#}", e),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /pairing/status
/// Current session statistics
pub async fn pairing_status(State(state): State<AppState>) -> Response {
    match state.session.stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /pairing/code
/// Issue a fresh pairing code (host side)
pub async fn generate_code(State(state): State<AppState>) -> Response {
    match state.session.generate_code().await {
        Ok(code) => {
            info!("Pairing code issued over HTTP");
            (
                StatusCode::OK,
                Json(CodeResponse {
                    code: code.as_str().to_string(),
                    expires_at: code.expires_at(),
                }),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /pairing/connect
/// Join a host with its pairing code (guest side)
pub async fn connect(State(state): State<AppState>, Json(req): Json<ConnectRequest>) -> Response {
    match state.session.connect_with_code(req.code).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                status: "connecting".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /pairing/disconnect
/// Tear down the current pairing
pub async fn disconnect(State(state): State<AppState>) -> Response {
    match state.session.disconnect().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                status: "disconnected".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /pairing/commands
/// Send a command to the paired peer
pub async fn send_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Response {
    match state.session.send_command(req.kind, req.data).await {
        Ok(frames) => (StatusCode::OK, Json(CommandResponse { frames })).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
