pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DICOM Viewer Notes API",
        version = "1.0.0",
        description = "Study and series descriptions, comments and report files for the DICOM viewer"
    ),
    paths(
        handlers::notes::load_notes,
        handlers::description::save_study_description,
        handlers::description::save_series_description,
        handlers::comment::create_comment,
        handlers::comment::update_comment,
        handlers::comment::delete_comment,
        handlers::report::upload_report,
        handlers::report::download_report,
        handlers::report::delete_report,
        handlers::migrate::migrate_notes,
    ),
    components(schemas(error::ErrorBody)),
    tags(
        (name = "Notes", description = "Batch loading of study notes"),
        (name = "Descriptions", description = "Study and series descriptions"),
        (name = "Comments", description = "Timestamped comments on studies and series"),
        (name = "Reports", description = "Report file attachments"),
        (name = "Migration", description = "Import of locally stored notes"),
    ),
)]
pub struct ApiDoc;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);

    routes::notes_routes(&state.config)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.max_age));

    if config.allow_origins.is_empty() || config.allow_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
