use super::state::AppState;
use crate::capture::MicrophoneBackend;
use crate::error::SessionError;
use crate::session::SessionStats;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Connection status display: "connected" or "disconnected"
    pub connection: String,
    /// Recording status display: "recording" or "idle"
    pub recording: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /record/start
/// Start recording from the microphone
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    info!("Start recording requested");

    let backend = Box::new(MicrophoneBackend::new(state.capture.clone()));

    match state.session.start(backend).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StartRecordingResponse {
                session_id: state.session.id().to_string(),
                status: "recording".to_string(),
                message: "Recording...".to_string(),
            }),
        )
            .into_response(),
        Err(SessionError::AlreadyRecording) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "A recording is already in progress".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Could not access microphone: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /record/stop
/// Stop recording, publish the combined artifact, and save the local copy
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stop recording requested");

    match state.session.stop().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(StopRecordingResponse {
                session_id: state.session.id().to_string(),
                status: "idle".to_string(),
                message: "Recording saved!".to_string(),
                stats,
            }),
        )
            .into_response(),
        Err(SessionError::NotRecording) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "No recording is in progress".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to stop recording: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /status
/// Connection and recording status displays
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.session.status().await;

    (
        StatusCode::OK,
        Json(StatusResponse {
            connection: state.transport.status().to_string(),
            recording: state.session.state().to_string(),
            stats,
        }),
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
