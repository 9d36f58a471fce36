//! HTTP request handlers
//!
//! Implements the session control surface and the non-streaming
//! processing variants of the feedback API.

use crate::api::server::AppContext;
use crate::session::SessionType;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use podium_common::feedback::{FeedbackMessage, ScoreSet};
use podium_common::metrics::{AudioMetrics, VisionMetrics};
use podium_common::Error;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    active_sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    user_id: String,
    #[serde(default)]
    session_type: SessionType,
    #[serde(default)]
    #[allow(dead_code)]
    title: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    session_id: String,
    user_id: String,
    session_type: SessionType,
    start_time: DateTime<Utc>,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    session_id: String,
    duration: f64,
    average_scores: ScoreSet,
    frames_processed: u64,
    audio_chunks_processed: u64,
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcessFrameRequest {
    session_id: String,
    /// Base64-encoded image
    frame_data: String,
    timestamp_ms: i64,
    #[serde(default)]
    frame_number: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessAudioRequest {
    session_id: String,
    /// Base64-encoded PCM
    audio_data: String,
    timestamp_ms: i64,
    #[serde(default = "default_sample_rate")]
    sample_rate: u32,
}

fn default_sample_rate() -> u32 {
    16000
}

#[derive(Debug, Deserialize)]
pub struct GenerateFeedbackRequest {
    session_id: String,
    #[serde(default)]
    audio_metrics: Option<AudioMetrics>,
    #[serde(default)]
    vision_metrics: Option<VisionMetrics>,
    #[serde(default)]
    timestamp_ms: Option<i64>,
}

type HandlerError = (StatusCode, Json<StatusResponse>);

/// Map a core error to an HTTP response
fn error_response(e: Error) -> HandlerError {
    let code = match &e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::AlreadyExists(_) => StatusCode::CONFLICT,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if code == StatusCode::INTERNAL_SERVER_ERROR {
        error!("request failed: {}", e);
    }
    (code, Json(StatusResponse { status: format!("error: {}", e) }))
}

fn decode_base64(field: &str, data: &str) -> Result<Vec<u8>, HandlerError> {
    BASE64
        .decode(data)
        .map_err(|e| error_response(Error::InvalidInput(format!("{}: {}", field, e))))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "feedback_orchestrator".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: ctx.engine.active_sessions(),
    })
}

/// POST /api/v1/feedback/sessions/start
pub async fn start_session(
    State(ctx): State<AppContext>,
    Json(req): Json<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, HandlerError> {
    let session = ctx
        .engine
        .start_session(None, &req.user_id, req.session_type)
        .await
        .map_err(error_response)?;

    info!("started session {} for user {}", session.session_id, session.user_id);
    Ok(Json(StartSessionResponse {
        session_id: session.session_id,
        user_id: session.user_id,
        session_type: session.session_type,
        start_time: session.start_time,
        message: "Session started successfully".to_string(),
    }))
}

/// POST /api/v1/feedback/sessions/:session_id/stop
pub async fn stop_session(
    State(ctx): State<AppContext>,
    Path(session_id): Path<String>,
) -> Result<Json<StopSessionResponse>, HandlerError> {
    let summary = ctx
        .engine
        .stop_session(&session_id)
        .await
        .map_err(error_response)?;

    Ok(Json(StopSessionResponse {
        session_id: summary.session_id,
        duration: summary.duration_secs,
        average_scores: summary.average_scores,
        frames_processed: summary.frames_processed,
        audio_chunks_processed: summary.audio_chunks_processed,
        message: "Session stopped successfully".to_string(),
    }))
}

/// POST /api/v1/feedback/process-frame
///
/// Returns 202 with a "skipped" status when the sampling gate sheds the
/// frame; the client can tell load-shedding from failure.
pub async fn process_frame(
    State(ctx): State<AppContext>,
    Json(req): Json<ProcessFrameRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), HandlerError> {
    let frame = decode_base64("frame_data", &req.frame_data)?;

    let result = ctx
        .engine
        .process_frame(&req.session_id, &frame, req.timestamp_ms, req.frame_number)
        .await
        .map_err(error_response)?;

    match result {
        Some(metrics) => Ok((
            StatusCode::OK,
            Json(serde_json::to_value(metrics).unwrap_or_default()),
        )),
        None => Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({"message": "Frame skipped (sampling)"})),
        )),
    }
}

/// POST /api/v1/feedback/process-audio
pub async fn process_audio(
    State(ctx): State<AppContext>,
    Json(req): Json<ProcessAudioRequest>,
) -> Result<Json<AudioMetrics>, HandlerError> {
    let pcm = decode_base64("audio_data", &req.audio_data)?;

    let metrics = ctx
        .engine
        .process_audio(&req.session_id, &pcm, req.timestamp_ms, req.sample_rate)
        .await
        .map_err(error_response)?;

    Ok(Json(metrics))
}

/// POST /api/v1/feedback/generate-feedback
///
/// Synchronous feedback cycle from caller-supplied (or cached) metrics.
pub async fn generate_feedback(
    State(ctx): State<AppContext>,
    Json(req): Json<GenerateFeedbackRequest>,
) -> Result<Json<FeedbackMessage>, HandlerError> {
    let feedback = ctx
        .engine
        .generate_feedback(
            &req.session_id,
            req.audio_metrics,
            req.vision_metrics,
            req.timestamp_ms,
        )
        .await
        .map_err(error_response)?;

    Ok(Json(feedback))
}
