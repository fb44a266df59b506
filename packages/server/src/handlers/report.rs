use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use axum::Json;
use notes_common::limits::MAX_REPORT_NAME_CHARS;
use notes_common::storage::{BlobStore, ContentHash};
use notes_common::time::{millis_from_value, now_ms};
use notes_common::{DeletedReport, Report, ReportType, sanitize_report_id};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::entity::report;
use crate::error::{AppError, ErrorBody};
use crate::state::AppState;
use crate::utils::disposition::{download_name, inline_disposition};

/// Multipart overhead allowed on top of the configured report size.
const MULTIPART_SLACK: u64 = 64 * 1024;

pub fn report_upload_body_limit(max_report_size: u64) -> DefaultBodyLimit {
    let limit = max_report_size.saturating_add(MULTIPART_SLACK);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

/// Parts of an upload that matter once the multipart body has been drained.
#[derive(Default)]
struct UploadParts {
    file: Option<Vec<u8>>,
    file_name: Option<String>,
    content_type: Option<String>,
    id: Option<String>,
    name: Option<String>,
    type_hint: Option<String>,
    added_at: Option<i64>,
}

#[utoipa::path(
    post,
    path = "/api/notes/{study_uid}/reports",
    tag = "Reports",
    operation_id = "uploadReport",
    summary = "Upload or replace a report file",
    description = "The `file` multipart field is required. Optional fields: `id`, `name`, `type`, \
        `size`, `addedAt`, `updatedAt`. A requested `id` is kept only if it matches \
        `^[A-Za-z0-9_-]{8,64}$`; otherwise a fresh id is generated, so callers must use the \
        returned id. Uploading again with the same id replaces the report.",
    params(("study_uid" = String, Path, description = "Study instance UID")),
    request_body(content_type = "multipart/form-data", description = "Report file with optional metadata"),
    responses(
        (status = 200, description = "Stored report", body = Report),
        (status = 400, description = "Missing file or unsupported type (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Report id belongs to another study (CONFLICT)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_report(
    State(state): State<AppState>,
    Path(study_uid): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Report>, AppError> {
    let mut parts = UploadParts::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
                parts.file_name = field.file_name().map(str::to_string);
                parts.content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                parts.file = Some(bytes.to_vec());
            }
            Some(name @ ("id" | "name" | "type" | "addedAt")) => {
                let name = name.to_string();
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read {name}: {e}")))?;
                match name.as_str() {
                    "id" => parts.id = Some(text),
                    "name" => parts.name = Some(text),
                    "type" => parts.type_hint = Some(text),
                    _ => parts.added_at = millis_from_value(&Value::String(text)),
                }
            }
            _ => {} // size and updatedAt are computed here; anything else is ignored.
        }
    }

    let data = parts
        .file
        .take()
        .ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    let max_size = state.config.storage.max_report_size;
    if data.len() as u64 > max_size {
        return Err(AppError::PayloadTooLarge {
            actual: data.len() as u64,
            limit: max_size,
        });
    }

    let report_type = ReportType::detect(
        parts.content_type.as_deref(),
        parts.file_name.as_deref(),
        parts.type_hint.as_deref(),
    )
    .ok_or_else(|| AppError::Validation("Unsupported report file type".into()))?;

    let id = sanitize_report_id(parts.id.as_deref());
    let _guard = state.blob_lock.lock().await;
    let existing = report::Entity::find_by_id(id.clone()).one(&state.db).await?;
    if let Some(existing) = &existing
        && existing.study_uid != study_uid
    {
        return Err(AppError::Conflict(format!(
            "Report {id} belongs to another study"
        )));
    }

    let name = report_name(parts.name.as_deref(), parts.file_name.as_deref());
    let now = now_ms();
    let added_at = existing
        .as_ref()
        .map(|r| r.added_at)
        .or(parts.added_at)
        .unwrap_or(now);

    let hash = state.blob_store.put(&data).await?;

    let model = report::ActiveModel {
        id: Set(id.clone()),
        study_uid: Set(study_uid.clone()),
        name: Set(name),
        report_type: Set(report_type.as_str().to_string()),
        size: Set(data.len() as i64),
        content_hash: Set(hash.to_hex()),
        added_at: Set(added_at),
        updated_at: Set(now),
    };
    let upserted = report::Entity::insert(model)
        .on_conflict(
            OnConflict::column(report::Column::Id)
                .update_columns([
                    report::Column::Name,
                    report::Column::ReportType,
                    report::Column::Size,
                    report::Column::ContentHash,
                    report::Column::AddedAt,
                    report::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&state.db)
        .await;
    if let Err(e) = upserted {
        if let Err(cleanup) = release_blob(&state.db, &*state.blob_store, &hash.to_hex()).await {
            warn!(report_id = %id, "Failed to release blob after failed upsert: {cleanup:?}");
        }
        return Err(e.into());
    }

    if let Some(previous) = existing
        && previous.content_hash != hash.to_hex()
    {
        release_blob(&state.db, &*state.blob_store, &previous.content_hash).await?;
    }

    let saved = report::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("report missing after upsert".into()))?;

    info!(report_id = %saved.id, size = saved.size, "Report stored");
    Ok(Json(Report::try_from(saved)?))
}

#[utoipa::path(
    get,
    path = "/api/notes/reports/{report_id}/file",
    tag = "Reports",
    operation_id = "downloadReport",
    summary = "Download a report file",
    params(("report_id" = String, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report bytes with the stored content type"),
        (status = 404, description = "Report not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn download_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Response, AppError> {
    let model = report::Entity::find_by_id(report_id.clone())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {report_id} not found")))?;

    let report = Report::try_from(model.clone())?;
    let hash: ContentHash = model.content_hash.parse()?;
    let bytes = state.blob_store.get(&hash).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, report.report_type.mime_type())
        .header(header::CONTENT_LENGTH, bytes.len().to_string())
        .header(
            header::CONTENT_DISPOSITION,
            inline_disposition(&download_name(&report.name, report.report_type.as_str())),
        )
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    delete,
    path = "/api/notes/{study_uid}/reports/{report_id}",
    tag = "Reports",
    operation_id = "deleteReport",
    summary = "Delete a report and its file",
    params(
        ("study_uid" = String, Path, description = "Study instance UID"),
        ("report_id" = String, Path, description = "Report ID"),
    ),
    responses(
        (status = 200, description = "Report deleted", body = DeletedReport),
        (status = 404, description = "Report not found in this study (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_report(
    State(state): State<AppState>,
    Path((study_uid, report_id)): Path<(String, String)>,
) -> Result<Json<DeletedReport>, AppError> {
    let _guard = state.blob_lock.lock().await;
    let existing = report::Entity::find_by_id(report_id.clone())
        .filter(report::Column::StudyUid.eq(&study_uid))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {report_id} not found")))?;

    report::Entity::delete_by_id(existing.id.clone())
        .exec(&state.db)
        .await?;
    release_blob(&state.db, &*state.blob_store, &existing.content_hash).await?;

    Ok(Json(DeletedReport {
        deleted: true,
        id: existing.id,
    }))
}

fn report_name(name: Option<&str>, file_name: Option<&str>) -> String {
    let name = [name, file_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|n| !n.is_empty())
        .unwrap_or("report");
    name.chars().take(MAX_REPORT_NAME_CHARS).collect()
}

/// Drop a blob once no report points at it any more. Callers hold `blob_lock`.
async fn release_blob(
    db: &DatabaseConnection,
    blob_store: &dyn BlobStore,
    content_hash: &str,
) -> Result<(), AppError> {
    let still_used = report::Entity::find()
        .filter(report::Column::ContentHash.eq(content_hash))
        .count(db)
        .await?;
    if still_used > 0 {
        return Ok(());
    }

    match content_hash.parse::<ContentHash>() {
        Ok(hash) => {
            blob_store.delete(&hash).await?;
        }
        Err(e) => warn!("Skipping cleanup of malformed content hash {content_hash}: {e}"),
    }
    Ok(())
}
