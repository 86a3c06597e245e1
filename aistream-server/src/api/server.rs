//! HTTP server setup and routing
//!
//! Sets up the Axum router for the control endpoints, the WebSocket delivery
//! channel and SSE.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::Session;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
///
/// **Note:** AppContext implements Clone, which gives us `FromRef<AppContext>` for free
/// via Axum's blanket implementation.
#[derive(Clone)]
pub struct AppContext {
    pub session: Arc<Session>,
    /// Browser client files; `/` serves its index.html when present
    pub static_dir: Option<PathBuf>,
}

impl AppContext {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            static_dir: None,
        }
    }

    pub fn with_static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }
}

/// Build the router with all routes attached
pub fn create_router(ctx: AppContext) -> Router {
    let static_dir = ctx.static_dir.clone();

    let router = Router::new()
        .route("/", get(super::handlers::root))
        .route("/health", get(super::handlers::health))
        .route("/build_info", get(super::handlers::get_build_info))

        // Stream control
        .route("/api/start_stream", post(super::handlers::start_stream))
        .route("/api/stop_stream", post(super::handlers::stop_stream))
        .route("/api/status", get(super::handlers::get_status))

        // Delivery channel
        .route("/ws/stream", get(super::ws::stream_socket))

        // SSE event stream
        .route("/events", get(super::sse::event_stream));

    // Browser client assets
    let router = match static_dir {
        Some(dir) => {
            info!("Serving browser client from {}", dir.display());
            router.nest_service("/static", ServeDir::new(dir))
        }
        None => router,
    };

    router
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Browser clients are served from other origins
        .layer(CorsLayer::permissive())
}

/// Run HTTP API server until `shutdown` resolves
pub async fn run<F>(config: &Config, ctx: AppContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(ctx);

    let addr = config.bind_addr();
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    info!("HTTP server stopped");
    Ok(())
}
