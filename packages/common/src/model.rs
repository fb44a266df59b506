use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::report::ReportType;
use crate::time::lenient_millis;

/// The notes document: every study that has notes, keyed by study UID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NotesStore {
    #[serde(default)]
    pub studies: BTreeMap<String, StudyEntry>,
}

impl NotesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every study that no longer carries any notes.
    pub fn prune(&mut self) {
        for entry in self.studies.values_mut() {
            entry.prune_series();
        }
        self.studies.retain(|_, entry| entry.has_notes());
    }
}

/// Notes attached to a single study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StudyEntry {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Series-level notes, keyed by series UID within this study.
    #[serde(default)]
    pub series: BTreeMap<String, SeriesEntry>,
    #[serde(default)]
    pub reports: Vec<Report>,
}

impl StudyEntry {
    /// A study "exists" only while at least one piece of notes data is present.
    pub fn has_notes(&self) -> bool {
        !self.description.is_empty()
            || !self.comments.is_empty()
            || !self.series.is_empty()
            || !self.reports.is_empty()
    }

    /// Order study and series comments ascending by time. Ties keep insertion order.
    pub fn sort_comments(&mut self) {
        self.comments.sort_by_key(|c| c.time);
        for series in self.series.values_mut() {
            series.comments.sort_by_key(|c| c.time);
        }
    }

    /// Find a comment by id, scanning study-level comments before any series.
    pub fn find_comment_mut(&mut self, id: &CommentId) -> Option<&mut Comment> {
        let target = id.normalized();
        if let Some(pos) = self
            .comments
            .iter()
            .position(|c| c.id.normalized() == target)
        {
            return self.comments.get_mut(pos);
        }
        self.series
            .values_mut()
            .flat_map(|s| s.comments.iter_mut())
            .find(|c| c.id.normalized() == target)
    }

    /// Remove every comment with a matching id from the study and all of its
    /// series. Returns the number of comments removed.
    pub fn remove_comment(&mut self, id: &CommentId) -> usize {
        let target = id.normalized();
        let before = self.comment_count();
        self.comments.retain(|c| c.id.normalized() != target);
        for series in self.series.values_mut() {
            series.comments.retain(|c| c.id.normalized() != target);
        }
        before - self.comment_count()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
            + self
                .series
                .values()
                .map(|s| s.comments.len())
                .sum::<usize>()
    }

    pub fn prune_series(&mut self) {
        self.series.retain(|_, s| !s.is_empty());
    }
}

/// Notes attached to one series of a study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SeriesEntry {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl SeriesEntry {
    pub fn is_empty(&self) -> bool {
        self.description.is_empty() && self.comments.is_empty()
    }
}

/// Comment identifier. The server hands out numbers, the local backend
/// strings; `42` and `"42"` name the same comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum CommentId {
    Number(i64),
    Text(String),
}

impl CommentId {
    /// Canonical form used for equality: numeric when the value parses as one.
    pub fn normalized(&self) -> CommentId {
        match self {
            CommentId::Number(n) => CommentId::Number(*n),
            CommentId::Text(s) => match s.trim().parse::<i64>() {
                Ok(n) => CommentId::Number(n),
                Err(_) => CommentId::Text(s.clone()),
            },
        }
    }

    pub fn matches(&self, other: &CommentId) -> bool {
        self.normalized() == other.normalized()
    }

    pub fn as_number(&self) -> Option<i64> {
        match self.normalized() {
            CommentId::Number(n) => Some(n),
            CommentId::Text(_) => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CommentId::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentId::Number(n) => write!(f, "{n}"),
            CommentId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for CommentId {
    fn from(n: i64) -> Self {
        CommentId::Number(n)
    }
}

impl From<&str> for CommentId {
    fn from(s: &str) -> Self {
        CommentId::Text(s.to_string())
    }
}

impl From<String> for CommentId {
    fn from(s: String) -> Self {
        CommentId::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    /// Epoch milliseconds.
    pub time: i64,
}

/// Report metadata. The file bytes live in blob storage, addressed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[schema(example = "report-id-abcd1234")]
    pub id: String,
    pub study_uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub size: i64,
    pub added_at: i64,
    pub updated_at: i64,
}

/// Result of saving a study or series description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionRecord {
    pub study_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_uid: Option<String>,
    pub description: String,
    pub updated_at: i64,
}

/// A comment together with the study (and optionally series) it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: CommentId,
    pub study_uid: String,
    #[serde(default)]
    pub series_uid: Option<String>,
    pub text: String,
    pub time: i64,
}

impl CommentRecord {
    pub fn comment(&self) -> Comment {
        Comment {
            id: self.id.clone(),
            text: self.text.clone(),
            time: self.time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DeletedComment {
    pub deleted: bool,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DeletedReport {
    pub deleted: bool,
    pub id: String,
}

/// Body of a description save. A missing key means "clear".
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DescriptionPayload {
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of a comment creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentPayload {
    #[serde(default)]
    pub text: Option<String>,
    /// Epoch milliseconds. Only honored by the server within one year of its clock.
    #[serde(
        default,
        deserialize_with = "lenient_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_uid: Option<String>,
}

impl CommentPayload {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_time(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn in_series(mut self, series_uid: impl Into<String>) -> Self {
        self.series_uid = Some(series_uid.into());
        self
    }

    /// Trimmed text, `None` when missing or blank.
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Series UID, treating an empty string as "study-level".
    pub fn series(&self) -> Option<&str> {
        self.series_uid.as_deref().filter(|s| !s.is_empty())
    }
}

/// Body of a comment edit. Any `time` the caller sends is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CommentUpdate {
    #[serde(default)]
    pub text: Option<String>,
}

impl CommentUpdate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}
