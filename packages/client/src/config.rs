use std::fmt;
use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Where the viewer is running, which decides what it may persist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Public showcase. Stateless.
    Demo,
    /// Pull request preview. Stateless.
    Preview,
    /// Hosted platform.
    Cloud,
    /// Local development or self-hosted.
    #[default]
    Personal,
}

impl DeploymentMode {
    pub fn detect(hostname: &str) -> Self {
        let hostname = hostname.trim().to_ascii_lowercase();
        if hostname.ends_with("github.io") {
            DeploymentMode::Demo
        } else if hostname.ends_with("vercel.app") {
            DeploymentMode::Preview
        } else if hostname.contains("divergent.health") && !hostname.contains("localhost") {
            DeploymentMode::Cloud
        } else {
            DeploymentMode::Personal
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeploymentMode::Demo => "Demo",
            DeploymentMode::Preview => "Preview",
            DeploymentMode::Cloud => "Cloud",
            DeploymentMode::Personal => "Personal",
        }
    }

    fn persists(&self) -> bool {
        matches!(self, DeploymentMode::Personal | DeploymentMode::Cloud)
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    pub notes_persistence: bool,
    /// Notes go to the notes server rather than the local document.
    pub notes_server: bool,
    pub cloud_sync: bool,
    pub user_accounts: bool,
    pub sample_data: bool,
    pub test_mode: bool,
    pub analytics: bool,
}

impl FeatureFlags {
    pub fn for_mode(mode: DeploymentMode) -> Self {
        let cloud = mode == DeploymentMode::Cloud;
        Self {
            notes_persistence: mode.persists(),
            notes_server: mode.persists(),
            cloud_sync: cloud,
            user_accounts: cloud,
            sample_data: true,
            test_mode: mode == DeploymentMode::Personal,
            analytics: cloud,
        }
    }
}

/// Explicit flag values that win over the mode defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureOverrides {
    pub notes_persistence: Option<bool>,
    pub notes_server: Option<bool>,
    pub cloud_sync: Option<bool>,
    pub user_accounts: Option<bool>,
    pub sample_data: Option<bool>,
    pub test_mode: Option<bool>,
    pub analytics: Option<bool>,
}

impl FeatureOverrides {
    fn apply(&self, mut flags: FeatureFlags) -> FeatureFlags {
        let pairs = [
            (self.notes_persistence, &mut flags.notes_persistence),
            (self.notes_server, &mut flags.notes_server),
            (self.cloud_sync, &mut flags.cloud_sync),
            (self.user_accounts, &mut flags.user_accounts),
            (self.sample_data, &mut flags.sample_data),
            (self.test_mode, &mut flags.test_mode),
            (self.analytics, &mut flags.analytics),
        ];
        for (value, slot) in pairs {
            if let Some(value) = value {
                *slot = value;
            }
        }
        flags
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Fixed mode. When absent the mode is detected from `hostname`.
    #[serde(default)]
    pub mode: Option<DeploymentMode>,
    #[serde(default)]
    pub hostname: Option<String>,
    pub server_url: String,
    /// JSON document used by the local backend.
    pub notes_path: PathBuf,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub features: FeatureOverrides,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mode: None,
            hostname: None,
            server_url: "http://127.0.0.1:5001".to_string(),
            notes_path: PathBuf::from("data/dicom-viewer-notes-v3.json"),
            timeout_secs: None,
            features: FeatureOverrides::default(),
        }
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("DICOM_NOTES_CLIENT_CONFIG")
            .unwrap_or_else(|_| "config/client".to_string());

        Config::builder()
            .set_default("server_url", "http://127.0.0.1:5001")?
            .set_default("notes_path", "data/dicom-viewer-notes-v3.json")?
            .add_source(File::with_name(&path).required(false))
            // e.g. DICOM_NOTES_CLIENT__FEATURES__NOTES_SERVER=false
            .add_source(Environment::with_prefix("DICOM_NOTES_CLIENT").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn deployment_mode(&self) -> DeploymentMode {
        self.mode.unwrap_or_else(|| {
            self.hostname
                .as_deref()
                .map(DeploymentMode::detect)
                .unwrap_or_default()
        })
    }

    pub fn features(&self) -> FeatureFlags {
        self.features
            .apply(FeatureFlags::for_mode(self.deployment_mode()))
    }
}
