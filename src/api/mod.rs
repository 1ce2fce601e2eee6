//! REST API server module
//!
//! Exposes scraping, sending, campaign folder management and remote task views
//! over HTTP, with an OpenAPI 3.1 description of every route.

use crate::{Config, LeadFlow, Result};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
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
/// ## Sending
/// - `POST /api/scrape` - Submit a scraping job
/// - `POST /api/send` - Download a job's results and email one batch (background)
/// - `GET /api/tasks/:id` - Status of a background send
///
/// ## Campaigns
/// - `GET /api/campaigns` - Campaigns with a folder
/// - `GET /api/campaigns/:id/csv-files` - Lead files of a campaign
/// - `GET /api/campaigns/:id/csv-files/:filename/validate` - Check a lead file
/// - `POST /api/campaigns/:id/create-folder` - Create a campaign folder
/// - `DELETE /api/campaigns/:id/cleanup` - Remove a campaign folder
/// - `GET /api/csv-files/all` - Lead files of every campaign
///
/// ## Remote
/// - `GET /api/locations[/:country]` - Regions of a country (default IT)
/// - `GET /api/scrape/task/:id` - Job status
/// - `GET /api/scrape/task/:id/info`, `GET /api/task/:id` - Job document
/// - `GET /api/task/:id/raw` - Unwrapped job document
/// - `GET /api/task/:id/download` - Fetch a finished job's result file
/// - `POST /api/download/file` - Fetch an arbitrary URL
///
/// ## System
/// - `GET /api/health` - Health check
/// - `GET /api/openapi.json` - OpenAPI specification
/// - `GET /api/events` - Server-sent events stream
/// - `GET /swagger-ui` - Swagger UI (if enabled)
pub fn create_router(flow: Arc<LeadFlow>, config: Arc<Config>) -> Router {
    let state = AppState::new(flow, config.clone());

    let router = Router::new()
        // Sending
        .route("/api/scrape", post(routes::start_scrape))
        .route("/api/send", post(routes::trigger_send))
        .route("/api/tasks/:task_id", get(routes::get_task_status))
        // Campaigns
        .route("/api/campaigns", get(routes::list_campaigns))
        .route(
            "/api/campaigns/:campaign_id/csv-files",
            get(routes::list_campaign_files),
        )
        .route(
            "/api/campaigns/:campaign_id/csv-files/:filename/validate",
            get(routes::validate_campaign_file),
        )
        .route(
            "/api/campaigns/:campaign_id/create-folder",
            post(routes::create_campaign_folder),
        )
        .route(
            "/api/campaigns/:campaign_id/cleanup",
            delete(routes::cleanup_campaign),
        )
        .route("/api/csv-files/all", get(routes::list_all_files))
        // Remote
        .route("/api/locations", get(routes::get_default_locations))
        .route("/api/locations/:country", get(routes::get_locations))
        .route("/api/scrape/task/:task_id", get(routes::get_scrape_task_status))
        .route(
            "/api/scrape/task/:task_id/info",
            get(routes::get_scrape_task_info),
        )
        .route("/api/task/:task_id", get(routes::get_task_info))
        .route("/api/task/:task_id/raw", get(routes::get_task_info_raw))
        .route("/api/task/:task_id/download", get(routes::download_task_file))
        .route("/api/download/file", post(routes::download_file_by_url))
        // System
        .route("/api/health", get(routes::health_check))
        .route("/api/openapi.json", get(routes::openapi_spec))
        .route("/api/events", get(routes::event_stream));

    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state);

    let router = if config.server.api.api_key.is_some() {
        router.layer(middleware::from_fn_with_state(
            config.server.api.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        router
    };

    let router = router.layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        router.layer(build_cors_layer(&config.server.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer for the configured origins; `"*"` or an empty list allows any
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

/// Serve the API on the configured bind address until `shutdown` resolves.
///
/// # Example
///
/// ```no_run
/// use leadflow::{Config, LeadFlow};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::from_env()?;
/// let flow = Arc::new(LeadFlow::new(config.clone())?);
///
/// leadflow::api::start_api_server(flow, Arc::new(config), leadflow::wait_for_signal()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(
    flow: Arc<LeadFlow>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.api.bind_address;
    let app = create_router(flow, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
