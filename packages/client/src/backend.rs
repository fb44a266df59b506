use std::fmt;

use async_trait::async_trait;
use notes_common::{
    Comment, CommentId, CommentPayload, CommentUpdate, MigrateRequest, MigrateResponse, NotesStore,
    Report, ReportType, SeriesEntry, StudyEntry,
};

use crate::error::{CallError, CallResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Server,
    Local,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Server => "server",
            BackendKind::Local => "local",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A report file plus the optional metadata sent alongside it.
#[derive(Debug, Clone, Default)]
pub struct ReportUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
    /// Requested id. The server may replace it; use the returned one.
    pub id: Option<String>,
    pub name: Option<String>,
    pub report_type: Option<ReportType>,
    pub size: Option<u64>,
    pub added_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl ReportUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Display name sent to the server: explicit name, then the file name,
    /// then `"report"`.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(Some(self.file_name.as_str()).filter(|n| !n.is_empty()))
            .unwrap_or("report")
    }
}

/// Result of saving a description: the entry that now holds it.
#[derive(Debug, Clone, PartialEq)]
pub enum SavedDescription {
    Study(StudyEntry),
    Series(SeriesEntry),
    Remote(notes_common::DescriptionRecord),
}

impl SavedDescription {
    pub fn description(&self) -> &str {
        match self {
            SavedDescription::Study(entry) => &entry.description,
            SavedDescription::Series(entry) => &entry.description,
            SavedDescription::Remote(record) => &record.description,
        }
    }
}

/// The notes operation set, implemented once against local storage and once
/// against the notes HTTP API.
#[async_trait]
pub trait NotesBackend: Send + Sync {
    /// Notes for the requested studies. Studies without notes are absent.
    async fn load_notes(&self, study_uids: &[String]) -> CallResult<NotesStore>;

    async fn save_study_description(
        &self,
        study_uid: &str,
        description: Option<&str>,
    ) -> CallResult<SavedDescription>;

    async fn save_series_description(
        &self,
        study_uid: &str,
        series_uid: &str,
        description: Option<&str>,
    ) -> CallResult<SavedDescription>;

    async fn add_comment(&self, study_uid: &str, payload: &CommentPayload) -> CallResult<Comment>;

    async fn update_comment(
        &self,
        study_uid: &str,
        comment_id: &CommentId,
        update: &CommentUpdate,
    ) -> CallResult<Comment>;

    async fn delete_comment(&self, study_uid: &str, comment_id: &CommentId) -> CallResult<()>;

    async fn upload_report(&self, study_uid: &str, upload: ReportUpload) -> CallResult<Report>;

    async fn delete_report(&self, study_uid: &str, report_id: &str) -> CallResult<()>;

    async fn migrate(&self, request: &MigrateRequest) -> CallResult<MigrateResponse>;

    /// Whole stored document, for export into another backend.
    async fn export(&self) -> CallResult<NotesStore> {
        Err(CallError::Unsupported)
    }

    /// URL the viewer can fetch a report file from. Empty when there is none.
    fn report_file_url(&self, report_id: &str) -> String;
}

pub(crate) fn require<'a>(value: &'a str, what: &'static str) -> CallResult<&'a str> {
    if value.trim().is_empty() {
        Err(CallError::Invalid(what))
    } else {
        Ok(value)
    }
}
