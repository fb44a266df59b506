use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use notes_common::{
    Comment, CommentId, CommentPayload, CommentUpdate, MigrateRequest, MigrateResponse, NotesStore,
    Report,
};
use tracing::{debug, info, warn};

use crate::backend::{BackendKind, NotesBackend, ReportUpload, SavedDescription};
use crate::breaker::CircuitBreaker;
use crate::config::{ClientConfig, FeatureFlags};
use crate::error::{CallError, CallResult, ClientError};
use crate::local::LocalStore;
use crate::remote::RemoteStore;
use crate::storage::FileStorage;

/// Entry point for the viewer's notes.
///
/// Routes each call to the server or the local document depending on the
/// feature flags. In server mode a call that could not reach the server is
/// retried against the local document; a call the server answered with an
/// error is not, so the two stores never hold diverging copies of one record.
///
/// Nothing here returns an error: failures collapse to `None`, `false` or an
/// empty document and are logged.
pub struct NotesApi {
    local: Arc<dyn NotesBackend>,
    remote: Arc<dyn NotesBackend>,
    breaker: Arc<CircuitBreaker>,
    features: FeatureFlags,
}

impl NotesApi {
    pub fn new(
        local: Arc<dyn NotesBackend>,
        remote: Arc<dyn NotesBackend>,
        breaker: Arc<CircuitBreaker>,
        features: FeatureFlags,
    ) -> Self {
        Self {
            local,
            remote,
            breaker,
            features,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let breaker = Arc::new(CircuitBreaker::default());
        let remote = RemoteStore::new(
            config.server_url.clone(),
            config.timeout_secs.map(Duration::from_secs),
            breaker.clone(),
        )?;
        let local = LocalStore::new(FileStorage::new(config.notes_path.clone()));

        info!(
            mode = %config.deployment_mode(),
            server = %config.server_url,
            "Notes persistence configured"
        );
        Ok(Self::new(
            Arc::new(local),
            Arc::new(remote),
            breaker,
            config.features(),
        ))
    }

    pub fn backend(&self) -> BackendKind {
        if self.features.notes_server {
            BackendKind::Server
        } else {
            BackendKind::Local
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.features.notes_persistence
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Both futures are built by the caller but only the chosen one is polled.
    async fn with_fallback<T>(
        &self,
        op: &'static str,
        server: impl Future<Output = CallResult<T>>,
        local: impl Future<Output = CallResult<T>>,
    ) -> CallResult<T> {
        if self.backend() == BackendKind::Local {
            return local.await;
        }

        match server.await {
            Err(e) if e.is_transport() => {
                warn!(op, "Notes server unreachable, using local storage: {e}");
                local.await
            }
            other => other,
        }
    }

    fn settle<T>(op: &'static str, result: CallResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(CallError::Unsupported) => {
                debug!(op, "Not supported by this backend");
                None
            }
            Err(e) => {
                warn!(op, "Notes operation failed: {e}");
                None
            }
        }
    }

    pub async fn load_notes(&self, study_uids: &[String]) -> NotesStore {
        if !self.is_enabled() {
            return NotesStore::new();
        }
        let result = self
            .with_fallback(
                "load_notes",
                self.remote.load_notes(study_uids),
                self.local.load_notes(study_uids),
            )
            .await;
        Self::settle("load_notes", result).unwrap_or_default()
    }

    pub async fn save_study_description(
        &self,
        study_uid: &str,
        description: Option<&str>,
    ) -> Option<SavedDescription> {
        if !self.is_enabled() {
            return None;
        }
        let result = self
            .with_fallback(
                "save_study_description",
                self.remote.save_study_description(study_uid, description),
                self.local.save_study_description(study_uid, description),
            )
            .await;
        Self::settle("save_study_description", result)
    }

    pub async fn save_series_description(
        &self,
        study_uid: &str,
        series_uid: &str,
        description: Option<&str>,
    ) -> Option<SavedDescription> {
        if !self.is_enabled() {
            return None;
        }
        let result = self
            .with_fallback(
                "save_series_description",
                self.remote
                    .save_series_description(study_uid, series_uid, description),
                self.local
                    .save_series_description(study_uid, series_uid, description),
            )
            .await;
        Self::settle("save_series_description", result)
    }

    pub async fn add_comment(&self, study_uid: &str, payload: &CommentPayload) -> Option<Comment> {
        if !self.is_enabled() {
            return None;
        }
        let result = self
            .with_fallback(
                "add_comment",
                self.remote.add_comment(study_uid, payload),
                self.local.add_comment(study_uid, payload),
            )
            .await;
        Self::settle("add_comment", result)
    }

    pub async fn update_comment(
        &self,
        study_uid: &str,
        comment_id: &CommentId,
        update: &CommentUpdate,
    ) -> Option<Comment> {
        if !self.is_enabled() {
            return None;
        }
        let result = self
            .with_fallback(
                "update_comment",
                self.remote.update_comment(study_uid, comment_id, update),
                self.local.update_comment(study_uid, comment_id, update),
            )
            .await;
        Self::settle("update_comment", result)
    }

    pub async fn delete_comment(&self, study_uid: &str, comment_id: &CommentId) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let result = self
            .with_fallback(
                "delete_comment",
                self.remote.delete_comment(study_uid, comment_id),
                self.local.delete_comment(study_uid, comment_id),
            )
            .await;
        Self::settle("delete_comment", result).is_some()
    }

    pub async fn upload_report(&self, study_uid: &str, upload: ReportUpload) -> Option<Report> {
        if !self.is_enabled() {
            return None;
        }
        let result = self
            .with_fallback(
                "upload_report",
                self.remote.upload_report(study_uid, upload.clone()),
                self.local.upload_report(study_uid, upload),
            )
            .await;
        Self::settle("upload_report", result)
    }

    pub async fn delete_report(&self, study_uid: &str, report_id: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let result = self
            .with_fallback(
                "delete_report",
                self.remote.delete_report(study_uid, report_id),
                self.local.delete_report(study_uid, report_id),
            )
            .await;
        Self::settle("delete_report", result).is_some()
    }

    pub async fn migrate(&self, request: &MigrateRequest) -> Option<MigrateResponse> {
        if !self.is_enabled() {
            return None;
        }
        let result = self
            .with_fallback(
                "migrate",
                self.remote.migrate(request),
                self.local.migrate(request),
            )
            .await;
        Self::settle("migrate", result)
    }

    pub fn report_file_url(&self, report_id: &str) -> String {
        if !self.is_enabled() {
            return String::new();
        }
        match self.backend() {
            BackendKind::Server => self.remote.report_file_url(report_id),
            BackendKind::Local => self.local.report_file_url(report_id),
        }
    }

    /// Push everything in the local document to the server. Safe to repeat:
    /// the server skips comments and descriptions it already has.
    pub async fn migrate_local_to_server(&self) -> Option<MigrateResponse> {
        if !self.is_enabled() || self.backend() != BackendKind::Server {
            return None;
        }

        let store = Self::settle("export", self.local.export().await)?;
        let request = MigrateRequest::from_store(&store);
        if request.is_empty() {
            return Some(MigrateResponse { migrated: 0 });
        }

        let response = Self::settle("migrate", self.remote.migrate(&request).await)?;
        info!(
            studies = request.comments.len(),
            migrated = response.migrated,
            "Migrated local notes to server"
        );
        Some(response)
    }
}
