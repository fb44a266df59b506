use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. `*` or an empty list allows any origin.
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root of the report blob store.
    pub reports_dir: PathBuf,
    pub max_report_size: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("DICOM_NOTES_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5001)?
            .set_default("server.cors.allow_origins", vec!["*"])?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://data/notes.db?mode=rwc")?
            .set_default("storage.reports_dir", "data/reports")?
            .set_default("storage.max_report_size", notes_common::limits::MAX_REPORT_BYTES)?
            .add_source(File::with_name(&path).required(false))
            // e.g. DICOM_NOTES__SERVER__PORT=8080
            .add_source(Environment::with_prefix("DICOM_NOTES").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
