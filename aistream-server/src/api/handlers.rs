//! HTTP request handlers
//!
//! Control and inspection endpoints for the streaming session.

use crate::api::server::AppContext;
use crate::error::Error;
use crate::playlist::StatusSnapshot;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RootResponse {
    name: String,
    version: String,
    websocket: String,
    events: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    #[serde(flatten)]
    session: StatusSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct StartStreamParams {
    topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartStreamResponse {
    status: String,
    topic: String,
    scripts_generated: usize,
    audio_items_created: usize,
    playlist_size: usize,
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct StopStreamParams {
    #[serde(default)]
    clear: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    status: String,
    error: String,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct BuildInfoResponse {
    version: String,
    git_hash: String,
    build_timestamp: String,
    build_profile: String,
}

fn error_response(status: StatusCode, err: &Error) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            status: "error".to_string(),
            error: err.to_string(),
            message: "Failed to start stream".to_string(),
        }),
    )
}

// ============================================================================
// Service Endpoints
// ============================================================================

/// GET / - Browser client page when one is configured, else the service banner
pub async fn root(State(ctx): State<AppContext>) -> Response {
    if let Some(dir) = &ctx.static_dir {
        let index = dir.join("index.html");
        match tokio::fs::read_to_string(&index).await {
            Ok(page) => return Html(page).into_response(),
            Err(e) => debug!("No browser client at {}: {}", index.display(), e),
        }
    }

    Json(RootResponse {
        name: "aistream-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        websocket: "/ws/stream".to_string(),
        events: "/events".to_string(),
    })
    .into_response()
}

/// GET /health - Health check with session summary
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        session: ctx.session.status(),
    })
}

/// GET /build_info - Get build information
///
/// Returns version, git hash, build timestamp, and build profile
pub async fn get_build_info() -> Json<BuildInfoResponse> {
    Json(BuildInfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
    })
}

// ============================================================================
// Stream Control
// ============================================================================

/// POST /api/start_stream?topic=... - Start streaming a topic
///
/// Runs one generation cycle before responding, so this can take as long
/// as a full batch of synthesis calls. Generation failures only reduce the
/// number of items created.
pub async fn start_stream(
    State(ctx): State<AppContext>,
    Query(params): Query<StartStreamParams>,
) -> Result<Json<StartStreamResponse>, (StatusCode, Json<ErrorResponse>)> {
    let topic = params.topic.unwrap_or_default();

    match ctx.session.start(&topic).await {
        Ok(report) => {
            info!(
                "Stream started: {} items created for topic {}",
                report.audio_items_created, report.topic
            );
            Ok(Json(StartStreamResponse {
                status: "started".to_string(),
                message: format!("Stream started with topic: {}", report.topic),
                topic: report.topic,
                scripts_generated: report.scripts_generated,
                audio_items_created: report.audio_items_created,
                playlist_size: report.playlist_size,
            }))
        }
        Err(e @ Error::BadRequest(_)) => {
            warn!("Rejected start_stream request: {}", e);
            Err(error_response(StatusCode::BAD_REQUEST, &e))
        }
        Err(e) => {
            error!("Failed to start stream: {}", e);
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, &e))
        }
    }
}

/// POST /api/stop_stream?clear=true|false - Stop streaming
pub async fn stop_stream(
    State(ctx): State<AppContext>,
    Query(params): Query<StopStreamParams>,
) -> Json<StatusSnapshot> {
    Json(ctx.session.stop(params.clear))
}

/// GET /api/status - Session status snapshot
pub async fn get_status(State(ctx): State<AppContext>) -> Json<StatusSnapshot> {
    Json(ctx.session.status())
}
