use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn notes_routes(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .route("/api/notes", get(handlers::notes::load_notes))
        .route("/api/notes/", get(handlers::notes::load_notes))
        .route("/api/notes/migrate", post(handlers::migrate::migrate_notes))
        .route(
            "/api/notes/reports/{report_id}/file",
            get(handlers::report::download_report),
        )
        .route(
            "/api/notes/{study_uid}/description",
            put(handlers::description::save_study_description),
        )
        .route(
            "/api/notes/{study_uid}/series/{series_uid}/description",
            put(handlers::description::save_series_description),
        )
        .route(
            "/api/notes/{study_uid}/comments",
            post(handlers::comment::create_comment),
        )
        .route(
            "/api/notes/{study_uid}/comments/{comment_id}",
            put(handlers::comment::update_comment).delete(handlers::comment::delete_comment),
        )
        .route(
            "/api/notes/{study_uid}/reports",
            post(handlers::report::upload_report).layer(
                handlers::report::report_upload_body_limit(config.storage.max_report_size),
            ),
        )
        .route(
            "/api/notes/{study_uid}/reports/{report_id}",
            delete(handlers::report::delete_report),
        )
}
