use std::sync::Arc;

use anyhow::Context;
use notes_common::storage::FilesystemBlobStore;
use tracing::info;

use notes_server::config::AppConfig;
use notes_server::state::AppState;
use notes_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    if let Some(dir) = sqlite_parent_dir(&config.database.url) {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
    }

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;

    let blob_store = FilesystemBlobStore::open(
        config.storage.reports_dir.clone(),
        config.storage.max_report_size,
    )
    .await
    .context("Failed to open report storage")?;

    let addr = config.bind_addr();
    let state = AppState::new(db, Arc::new(blob_store), config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Notes server listening on http://{addr}");
    info!("Swagger UI at http://{addr}/swagger-ui");

    axum::serve(listener, build_router(state))
        .await
        .context("Server error")?;

    Ok(())
}

/// Directory holding a file-backed SQLite database, if the URL names one.
fn sqlite_parent_dir(url: &str) -> Option<std::path::PathBuf> {
    let path = url.strip_prefix("sqlite://")?.split('?').next()?;
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    std::path::Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
}
