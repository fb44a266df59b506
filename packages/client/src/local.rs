//! Notes kept in a single JSON document on the viewer's machine.
//!
//! Every call reloads the whole document, mutates it and writes it back.
//! Storage failures never reach the caller: a failed read is an empty
//! document and a failed write is logged.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use notes_common::time::millis_from_value;
use notes_common::{
    Comment, CommentId, CommentPayload, CommentUpdate, MigrateRequest, MigrateResponse, NotesStore,
    Report, SeriesEntry, StudyEntry,
};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::warn;

use crate::backend::{NotesBackend, ReportUpload, SavedDescription, require};
use crate::clock::{Clock, SystemClock};
use crate::error::{CallError, CallResult};
use crate::ids::CommentIdGenerator;
use crate::storage::DocumentStorage;

pub struct LocalStore<S> {
    storage: S,
    clock: Arc<dyn Clock>,
    ids: CommentIdGenerator,
    write_lock: Mutex<()>,
}

impl<S: DocumentStorage> LocalStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            ids: CommentIdGenerator::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    async fn load(&self) -> NotesStore {
        match self.storage.read().await {
            Ok(Some(raw)) => decode_document(&raw),
            Ok(None) => NotesStore::new(),
            Err(e) => {
                warn!("Failed to read local notes: {e}");
                NotesStore::new()
            }
        }
    }

    async fn save(&self, store: &mut NotesStore) {
        store.prune();
        let result = match serde_json::to_string(store) {
            Ok(document) => self.storage.write(&document).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!("Failed to save local notes: {e}");
        }
    }

    /// Load, apply `f`, save. The document lock is held throughout so calls
    /// on one store do not lose each other's writes.
    async fn modify<T>(&self, f: impl FnOnce(&mut NotesStore) -> CallResult<T>) -> CallResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut store = self.load().await;
        let result = f(&mut store)?;
        self.save(&mut store).await;
        Ok(result)
    }
}

#[async_trait]
impl<S: DocumentStorage> NotesBackend for LocalStore<S> {
    async fn load_notes(&self, study_uids: &[String]) -> CallResult<NotesStore> {
        let mut result = NotesStore::new();
        if study_uids.iter().all(|uid| uid.is_empty()) {
            return Ok(result);
        }

        let store = self.load().await;
        for uid in study_uids.iter().filter(|uid| !uid.is_empty()) {
            if let Some(entry) = store.studies.get(uid) {
                let mut entry = entry.clone();
                entry.sort_comments();
                result.studies.insert(uid.clone(), entry);
            }
        }
        Ok(result)
    }

    async fn save_study_description(
        &self,
        study_uid: &str,
        description: Option<&str>,
    ) -> CallResult<SavedDescription> {
        let study_uid = require(study_uid, "study uid")?;
        let description = description.unwrap_or_default().trim().to_string();

        self.modify(|store| {
            let entry = store.studies.entry(study_uid.to_string()).or_default();
            entry.description = description;
            Ok(SavedDescription::Study(entry.clone()))
        })
        .await
    }

    async fn save_series_description(
        &self,
        study_uid: &str,
        series_uid: &str,
        description: Option<&str>,
    ) -> CallResult<SavedDescription> {
        let study_uid = require(study_uid, "study uid")?;
        let series_uid = require(series_uid, "series uid")?;
        let description = description.unwrap_or_default().trim().to_string();

        self.modify(|store| {
            let series = store
                .studies
                .entry(study_uid.to_string())
                .or_default()
                .series
                .entry(series_uid.to_string())
                .or_default();
            series.description = description;
            Ok(SavedDescription::Series(series.clone()))
        })
        .await
    }

    async fn add_comment(&self, study_uid: &str, payload: &CommentPayload) -> CallResult<Comment> {
        let study_uid = require(study_uid, "study uid")?;
        let text = payload
            .trimmed_text()
            .ok_or(CallError::Invalid("comment text"))?;

        let now = self.clock.now_ms();
        let comment = Comment {
            id: CommentId::Text(self.ids.next(now)),
            text: text.to_string(),
            time: payload.time.unwrap_or(now),
        };

        self.modify(|store| {
            let entry = store.studies.entry(study_uid.to_string()).or_default();
            let target = match payload.series() {
                Some(series_uid) => {
                    &mut entry
                        .series
                        .entry(series_uid.to_string())
                        .or_default()
                        .comments
                }
                None => &mut entry.comments,
            };
            target.push(comment.clone());
            Ok(comment)
        })
        .await
    }

    async fn update_comment(
        &self,
        study_uid: &str,
        comment_id: &CommentId,
        update: &CommentUpdate,
    ) -> CallResult<Comment> {
        let study_uid = require(study_uid, "study uid")?;
        if comment_id.is_blank() {
            return Err(CallError::Invalid("comment id"));
        }
        let text = update
            .trimmed_text()
            .ok_or(CallError::Invalid("comment text"))?;
        let now = self.clock.now_ms();

        self.modify(|store| {
            let comment = store
                .studies
                .get_mut(study_uid)
                .and_then(|entry| entry.find_comment_mut(comment_id))
                .ok_or(CallError::NotFound)?;
            comment.text = text.to_string();
            comment.time = now;
            Ok(comment.clone())
        })
        .await
    }

    async fn delete_comment(&self, study_uid: &str, comment_id: &CommentId) -> CallResult<()> {
        let study_uid = require(study_uid, "study uid")?;
        if comment_id.is_blank() {
            return Err(CallError::Invalid("comment id"));
        }

        let _guard = self.write_lock.lock().await;
        let mut store = self.load().await;
        let Some(entry) = store.studies.get_mut(study_uid) else {
            return Ok(());
        };
        entry.remove_comment(comment_id);
        self.save(&mut store).await;
        Ok(())
    }

    async fn upload_report(&self, _study_uid: &str, _upload: ReportUpload) -> CallResult<Report> {
        Err(CallError::Unsupported)
    }

    async fn delete_report(&self, study_uid: &str, report_id: &str) -> CallResult<()> {
        require(study_uid, "study uid")?;
        require(report_id, "report id")?;
        Ok(())
    }

    async fn migrate(&self, _request: &MigrateRequest) -> CallResult<MigrateResponse> {
        Err(CallError::Unsupported)
    }

    async fn export(&self) -> CallResult<NotesStore> {
        let mut store = self.load().await;
        store.prune();
        Ok(store)
    }

    fn report_file_url(&self, _report_id: &str) -> String {
        String::new()
    }
}

/// Parse a stored document, repairing whatever does not have the expected
/// shape instead of rejecting the whole thing.
pub fn decode_document(raw: &str) -> NotesStore {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Local notes document is not valid JSON, starting empty: {e}");
            return NotesStore::new();
        }
    };

    let Some(studies) = value.get("studies").and_then(Value::as_object) else {
        return NotesStore::new();
    };

    let mut store = NotesStore {
        studies: studies
            .iter()
            .map(|(uid, entry)| (uid.clone(), repair_study(entry)))
            .collect(),
    };
    store.prune();
    store
}

fn repair_study(value: &Value) -> StudyEntry {
    let Some(obj) = value.as_object() else {
        return StudyEntry::default();
    };

    let series = obj
        .get("series")
        .and_then(Value::as_object)
        .map(|series| {
            series
                .iter()
                .map(|(uid, entry)| (uid.clone(), repair_series(entry)))
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    let reports = obj
        .get("reports")
        .and_then(Value::as_array)
        .map(|reports| {
            reports
                .iter()
                .filter_map(|r| serde_json::from_value::<Report>(r.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    StudyEntry {
        description: string_field(obj, "description"),
        comments: repair_comments(obj.get("comments")),
        series,
        reports,
    }
}

fn repair_series(value: &Value) -> SeriesEntry {
    match value {
        // Older documents stored a series as its bare comment list.
        Value::Array(_) => SeriesEntry {
            description: String::new(),
            comments: repair_comments(Some(value)),
        },
        Value::Object(obj) => SeriesEntry {
            description: string_field(obj, "description"),
            comments: repair_comments(obj.get("comments")),
        },
        _ => SeriesEntry::default(),
    }
}

fn repair_comments(value: Option<&Value>) -> Vec<Comment> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(repair_comment).collect())
        .unwrap_or_default()
}

fn repair_comment(value: &Value) -> Option<Comment> {
    let obj = value.as_object()?;
    let id = match obj.get("id")? {
        Value::Number(n) => CommentId::Number(n.as_i64()?),
        Value::String(s) if !s.trim().is_empty() => CommentId::Text(s.clone()),
        _ => return None,
    };
    Some(Comment {
        id,
        text: string_field(obj, "text"),
        time: obj.get("time").and_then(millis_from_value).unwrap_or(0),
    })
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
