use std::net::SocketAddr;
use std::sync::Arc;

use notes_client::{
    CircuitBreaker, Clock, DeploymentMode, FeatureFlags, LocalStore, MemoryStorage, NotesApi,
    NotesBackend, RemoteStore, SystemClock,
};
use notes_common::limits::SERVER_RETRY_MS;
use notes_common::storage::MemoryBlobStore;
use tempfile::TempDir;

use notes_server::config::{AppConfig, CorsConfig, DatabaseConfig, ServerConfig, StorageConfig};
use notes_server::state::AppState;

/// A notes server on an ephemeral port, backed by a throwaway SQLite database.
pub struct TestServer {
    pub addr: SocketAddr,
    _data_dir: TempDir,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.path().join("notes.db").display()
        );

        let db = notes_server::database::init_db(&db_url)
            .await
            .expect("Failed to initialize test database");
        notes_server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig { url: db_url },
            storage: StorageConfig {
                reports_dir: data_dir.path().join("reports"),
                max_report_size: 1024 * 1024,
            },
        };

        let state = AppState::new(db, Arc::new(MemoryBlobStore::new()), config);
        let app = notes_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            _data_dir: data_dir,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// A base URL nothing listens on: the port was bound once and released.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Dispatcher wiring used by the tests, with handles on both stores.
pub struct Harness {
    pub api: NotesApi,
    pub local: Arc<LocalStore<MemoryStorage>>,
    pub remote: Arc<RemoteStore>,
    pub breaker: Arc<CircuitBreaker>,
}

impl Harness {
    pub fn server_mode(base_url: &str) -> Self {
        Self::with_clock(base_url, Arc::new(SystemClock))
    }

    pub fn with_clock(base_url: &str, clock: Arc<dyn Clock>) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(SERVER_RETRY_MS, clock));
        let remote = Arc::new(
            RemoteStore::new(base_url, None, breaker.clone()).expect("Failed to build client"),
        );
        let local = Arc::new(LocalStore::new(MemoryStorage::new()));

        let api = NotesApi::new(
            local.clone() as Arc<dyn NotesBackend>,
            remote.clone() as Arc<dyn NotesBackend>,
            breaker.clone(),
            FeatureFlags::for_mode(DeploymentMode::Personal),
        );

        Self {
            api,
            local,
            remote,
            breaker,
        }
    }
}

pub fn uids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
