//! Payload of the one-shot import of locally stored notes into the server.
//!
//! Older viewer builds stored series notes either as a bare comment list or
//! as a `{description, comments}` object, so both shapes are accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Comment, NotesStore, StudyEntry};
use crate::time::{lenient_millis, millis_from_value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LegacyComment {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<i64>,
}

impl LegacyComment {
    /// Read one comment, `None` unless it is an object. A non-string `text`
    /// reads as missing.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            text: obj.get("text").and_then(Value::as_str).map(str::to_string),
            time: obj.get("time").and_then(millis_from_value),
        })
    }
}

impl From<&Comment> for LegacyComment {
    fn from(comment: &Comment) -> Self {
        Self {
            text: Some(comment.text.clone()),
            time: Some(comment.time),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum LegacySeries {
    Comments(Vec<LegacyComment>),
    Entry {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        comments: Vec<LegacyComment>,
    },
}

impl LegacySeries {
    /// Read either series shape, `None` for anything else.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(_) => Some(LegacySeries::Comments(comments_from_value(Some(value)))),
            Value::Object(obj) => Some(LegacySeries::Entry {
                description: obj
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                comments: comments_from_value(obj.get("comments")),
            }),
            _ => None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            LegacySeries::Comments(_) => None,
            LegacySeries::Entry { description, .. } => description.as_deref(),
        }
    }

    pub fn comments(&self) -> &[LegacyComment] {
        match self {
            LegacySeries::Comments(comments) => comments,
            LegacySeries::Entry { comments, .. } => comments,
        }
    }
}

/// Notes of one study in the import format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LegacyStudyBlob {
    #[serde(default)]
    pub description: Option<String>,
    /// Study-level comments.
    #[serde(default)]
    pub study: Vec<LegacyComment>,
    #[serde(default)]
    pub series: BTreeMap<String, LegacySeries>,
}

impl LegacyStudyBlob {
    /// Read a study blob field by field. Malformed fields, series and
    /// comments are dropped individually; only a non-object blob yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let series = obj
            .get("series")
            .and_then(Value::as_object)
            .map(|series| {
                series
                    .iter()
                    .filter_map(|(uid, s)| Some((uid.clone(), LegacySeries::from_value(s)?)))
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            description: obj
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            study: comments_from_value(obj.get("study")),
            series,
        })
    }
}

fn comments_from_value(value: Option<&Value>) -> Vec<LegacyComment> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(LegacyComment::from_value).collect())
        .unwrap_or_default()
}

impl From<&StudyEntry> for LegacyStudyBlob {
    fn from(entry: &StudyEntry) -> Self {
        let series = entry
            .series
            .iter()
            .map(|(uid, s)| {
                (
                    uid.clone(),
                    LegacySeries::Entry {
                        description: Some(s.description.clone()).filter(|d| !d.is_empty()),
                        comments: s.comments.iter().map(LegacyComment::from).collect(),
                    },
                )
            })
            .collect();

        Self {
            description: Some(entry.description.clone()).filter(|d| !d.is_empty()),
            study: entry.comments.iter().map(LegacyComment::from).collect(),
            series,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MigrateRequest {
    #[serde(default)]
    pub comments: BTreeMap<String, LegacyStudyBlob>,
}

impl MigrateRequest {
    /// Export a local notes document. Reports are not carried over since the
    /// local backend never stores report files.
    pub fn from_store(store: &NotesStore) -> Self {
        let comments = store
            .studies
            .iter()
            .filter(|(_, entry)| {
                !entry.description.is_empty() || entry.comment_count() > 0 || !entry.series.is_empty()
            })
            .map(|(uid, entry)| (uid.clone(), LegacyStudyBlob::from(entry)))
            .collect();
        Self { comments }
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MigrateResponse {
    /// Number of comments actually inserted.
    pub migrated: u64,
}
