use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notes_common::{
    Comment, CommentId, CommentPayload, CommentRecord, CommentUpdate, DeletedComment,
    DeletedReport, DescriptionPayload, DescriptionRecord, MigrateRequest, MigrateResponse,
    NotesStore, Report,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use urlencoding::encode;

use crate::backend::{NotesBackend, ReportUpload, SavedDescription, require};
use crate::breaker::CircuitBreaker;
use crate::error::{CallError, CallResult, ClientError};

const NOTES_PATH: &str = "/api/notes";

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Notes backed by the notes HTTP API.
pub struct RemoteStore {
    client: Client,
    base_url: String,
    breaker: Arc<CircuitBreaker>,
}

impl RemoteStore {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
        breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, base_url, breaker))
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            breaker,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    fn url(&self, path: &str) -> String {
        format!("{}{NOTES_PATH}{path}", self.base_url)
    }

    fn study_url(&self, study_uid: &str, rest: &str) -> String {
        self.url(&format!("/{}{rest}", encode(study_uid)))
    }

    /// Send a request and decode a JSON body. A failure to get any response
    /// trips the breaker; an error status does not.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> CallResult<T> {
        self.breaker.check()?;

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.breaker.trip();
                return Err(CallError::Unreachable(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("error").to_string());
            debug!(%status, %message, "Notes server rejected request");
            return Err(if status == StatusCode::NOT_FOUND {
                CallError::NotFound
            } else {
                CallError::Application {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        response.json::<T>().await.map_err(|e| {
            warn!("Unexpected response from notes server: {e}");
            CallError::Application {
                status: status.as_u16(),
                message: e.to_string(),
            }
        })
    }

    async fn save_description(
        &self,
        url: String,
        description: Option<&str>,
    ) -> CallResult<SavedDescription> {
        let payload = DescriptionPayload {
            description: Some(description.unwrap_or_default().to_string()),
        };
        let record: DescriptionRecord = self.send(self.client.put(url).json(&payload)).await?;
        Ok(SavedDescription::Remote(record))
    }
}

#[async_trait]
impl NotesBackend for RemoteStore {
    async fn load_notes(&self, study_uids: &[String]) -> CallResult<NotesStore> {
        let list: Vec<_> = study_uids
            .iter()
            .filter(|uid| !uid.is_empty())
            .map(|uid| encode(uid))
            .collect();
        if list.is_empty() {
            return Ok(NotesStore::new());
        }

        let url = format!("{}?studies={}", self.url(""), list.join(","));
        self.send(self.client.get(url)).await
    }

    async fn save_study_description(
        &self,
        study_uid: &str,
        description: Option<&str>,
    ) -> CallResult<SavedDescription> {
        let study_uid = require(study_uid, "study uid")?;
        self.save_description(self.study_url(study_uid, "/description"), description)
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
        let rest = format!("/series/{}/description", encode(series_uid));
        self.save_description(self.study_url(study_uid, &rest), description)
            .await
    }

    async fn add_comment(&self, study_uid: &str, payload: &CommentPayload) -> CallResult<Comment> {
        let study_uid = require(study_uid, "study uid")?;
        let url = self.study_url(study_uid, "/comments");
        let record: CommentRecord = self.send(self.client.post(url).json(payload)).await?;
        Ok(record.comment())
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
        let rest = format!("/comments/{}", encode(&comment_id.to_string()));
        let url = self.study_url(study_uid, &rest);
        let record: CommentRecord = self.send(self.client.put(url).json(update)).await?;
        Ok(record.comment())
    }

    async fn delete_comment(&self, study_uid: &str, comment_id: &CommentId) -> CallResult<()> {
        let study_uid = require(study_uid, "study uid")?;
        if comment_id.is_blank() {
            return Err(CallError::Invalid("comment id"));
        }
        let rest = format!("/comments/{}", encode(&comment_id.to_string()));
        let url = self.study_url(study_uid, &rest);
        let _: DeletedComment = self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn upload_report(&self, study_uid: &str, upload: ReportUpload) -> CallResult<Report> {
        let study_uid = require(study_uid, "study uid")?;
        self.breaker.check()?;

        let name = upload.display_name().to_string();
        let mut part = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(mime) = upload.mime.as_deref() {
            part = part
                .mime_str(mime)
                .map_err(|_| CallError::Invalid("report mime type"))?;
        }

        let mut form = Form::new().part("file", part).text("name", name);
        if let Some(id) = upload.id {
            form = form.text("id", id);
        }
        if let Some(report_type) = upload.report_type {
            form = form.text("type", report_type.as_str());
        }
        if let Some(size) = upload.size {
            form = form.text("size", size.to_string());
        }
        if let Some(added_at) = upload.added_at {
            form = form.text("addedAt", added_at.to_string());
        }
        if let Some(updated_at) = upload.updated_at {
            form = form.text("updatedAt", updated_at.to_string());
        }

        let url = self.study_url(study_uid, "/reports");
        self.send(self.client.post(url).multipart(form)).await
    }

    async fn delete_report(&self, study_uid: &str, report_id: &str) -> CallResult<()> {
        let study_uid = require(study_uid, "study uid")?;
        let report_id = require(report_id, "report id")?;
        let rest = format!("/reports/{}", encode(report_id));
        let url = self.study_url(study_uid, &rest);
        let _: DeletedReport = self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn migrate(&self, request: &MigrateRequest) -> CallResult<MigrateResponse> {
        let url = self.url("/migrate");
        self.send(self.client.post(url).json(request)).await
    }

    fn report_file_url(&self, report_id: &str) -> String {
        if report_id.is_empty() {
            return String::new();
        }
        format!("{NOTES_PATH}/reports/{}/file", encode(report_id))
    }
}
