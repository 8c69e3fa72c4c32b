//! REST API server module
//!
//! Exposes download orchestration, artifact serving, metadata lookups and
//! maintenance endpoints over HTTP.

use crate::{Config, MediaBroker, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

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
/// - `POST /download?id=` - Start (or join) a download
/// - `GET /status?id=` - Task snapshot
/// - `DELETE /cancel?id=` - Cancel a live task
///
/// ## Files
/// - `GET /files/audio?id=` - Audio artifact (Range and conditional requests supported)
/// - `GET /files/subtitle?id=` - Subtitle artifact as plain text
///
/// ## Catalog
/// - `GET /info?id=` - Video info for a resource
/// - `GET /api/video/info?id=` - Video info lookup
/// - `GET /api/channel/info?id=` - Channel info lookup
/// - `GET /api/channel/videos?id=&limit=` - Recent channel uploads
/// - `GET /api/search/channel?q=&limit=` - Channel search
/// - `GET /api/cookies/status` - Cookies file status
///
/// ## System
/// - `GET /` - Service index
/// - `GET /health` - Health check
/// - `GET /debug/files?id=` - Files sharing a resource's artifact prefix
/// - `GET /fix/files?id=` - Rename an extension-less audio file
/// - `GET /api/cookies/diagnose` - Inspect the cookies file
/// - `GET /api/test/youtube/:video_id` - Test metadata extraction for a video
/// - `POST /admin/cleanup` - Run the janitor now
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(broker: Arc<MediaBroker>, config: Arc<Config>) -> Router {
    let state = AppState::new(broker, config.clone());

    let router = Router::new()
        // Downloads
        .route("/download", post(routes::start_download))
        .route("/status", get(routes::get_status))
        .route("/cancel", delete(routes::cancel_download))
        // Files
        .route("/files/audio", get(routes::serve_audio))
        .route("/files/subtitle", get(routes::serve_subtitle))
        // Catalog
        .route("/info", get(routes::get_info))
        .route("/api/video/info", get(routes::video_info))
        .route("/api/channel/info", get(routes::channel_info))
        .route("/api/channel/videos", get(routes::channel_videos))
        .route("/api/search/channel", get(routes::search_channels))
        .route("/api/cookies/status", get(routes::cookies_status))
        // System
        .route("/", get(routes::index))
        .route("/health", get(routes::health_check))
        .route("/debug/files", get(routes::debug_files))
        .route("/fix/files", get(routes::fix_files))
        .route("/api/cookies/diagnose", get(routes::cookies_diagnose))
        .route("/api/test/youtube/:video_id", get(routes::test_connection))
        .route("/admin/cleanup", post(routes::admin_cleanup))
        .route("/openapi.json", get(routes::openapi_spec));

    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin.
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
/// Runs until the server stops.
///
/// # Example
///
/// ```no_run
/// use media_cache_broker::{MediaBroker, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let broker = Arc::new(MediaBroker::new((*config).clone()).await?);
///
/// media_cache_broker::api::start_api_server(broker, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(broker: Arc<MediaBroker>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(broker, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
