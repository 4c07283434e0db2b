//! REST API server module
//!
//! Exposes the download endpoint, the per-task progress stream, and a few
//! system endpoints. Static assets (the browser client) are served from the
//! configured directory for every other path.

use crate::{Config, Orchestrator, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Downloads
/// - `POST /api/download` - Run a task and stream the artifact back
///
/// ## Progress
/// - `GET /api/progress?taskId=` - Server-sent events for one task
///
/// ## System
/// - `GET /api/health` - Health check
/// - `GET /api/capabilities` - External tool availability
/// - `GET /api/openapi.json` - OpenAPI specification
///
/// Anything else is looked up in `static_dir`, when it exists.
pub fn create_router(orchestrator: Orchestrator, config: Arc<Config>) -> Router {
    let state = AppState::new(orchestrator);

    let router = Router::new()
        // Downloads
        .route("/api/download", post(routes::start_download))
        // Progress
        .route("/api/progress", get(routes::progress_stream))
        // System
        .route("/api/health", get(routes::health_check))
        .route("/api/capabilities", get(routes::get_capabilities))
        .route("/api/openapi.json", get(routes::openapi_spec));

    let router = match &config.server.api.static_dir {
        Some(dir) if dir.is_dir() => router.fallback_service(ServeDir::new(dir)),
        Some(dir) => {
            tracing::debug!(dir = %dir.display(), "static directory not found, not serving assets");
            router
        }
        None => router,
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins are allowed. All methods and headers are allowed either way.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until `shutdown` resolves, then stops accepting connections and
/// waits for in-flight responses to finish.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, Orchestrator};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let orchestrator = Orchestrator::new((*config).clone()).await?;
///
/// media_dl::api::start_api_server(orchestrator, config, std::future::pending()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(
    orchestrator: Orchestrator,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(orchestrator, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(bind_address),
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, unix))]
mod tests;
