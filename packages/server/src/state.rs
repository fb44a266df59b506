use std::sync::Arc;

use notes_common::storage::BlobStore;
use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub blob_store: Arc<dyn BlobStore>,
    pub config: Arc<AppConfig>,
    /// Serializes report row changes with the blob reference checks that follow them.
    pub blob_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, blob_store: Arc<dyn BlobStore>, config: AppConfig) -> Self {
        Self {
            db,
            blob_store,
            config: Arc::new(config),
            blob_lock: Arc::new(Mutex::new(())),
        }
    }
}
