use axum::Json;
use axum::extract::{Path, State};
use notes_common::limits::COMMENT_TIME_DRIFT_MS;
use notes_common::time::{now_ms, within_drift};
use notes_common::{CommentPayload, CommentRecord, CommentUpdate, DeletedComment};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use tracing::{info, instrument};

use crate::entity::comment;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::LenientJson;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/notes/{study_uid}/comments",
    tag = "Comments",
    operation_id = "createComment",
    summary = "Add a comment to a study or one of its series",
    description = "`time` is kept only when it lies within one year of server time; otherwise \
        the server stamps its own. Posting an identical (series, text, time) comment again \
        returns the existing one.",
    params(("study_uid" = String, Path, description = "Study instance UID")),
    request_body(content = CommentPayload, description = "Comment to add"),
    responses(
        (status = 200, description = "Stored comment", body = CommentRecord),
        (status = 400, description = "Missing or empty text (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn create_comment(
    State(state): State<AppState>,
    Path(study_uid): Path<String>,
    LenientJson(payload): LenientJson<CommentPayload>,
) -> Result<Json<CommentRecord>, AppError> {
    let text = payload
        .trimmed_text()
        .ok_or_else(|| AppError::Validation("Comment text is required".into()))?
        .to_string();

    let now = now_ms();
    let time = payload
        .time
        .filter(|&t| within_drift(t, now, COMMENT_TIME_DRIFT_MS))
        .unwrap_or(now);
    let series_uid = payload.series().unwrap_or_default().to_string();

    let model = comment::ActiveModel {
        study_uid: Set(study_uid.clone()),
        series_uid: Set(series_uid.clone()),
        text: Set(text.clone()),
        time: Set(time),
        created_at: Set(now),
        ..Default::default()
    };

    match insert_comment_if_absent(&state.db, model).await? {
        0 => info!("Comment already stored, returning existing row"),
        _ => info!("Comment created"),
    }

    let saved = comment::Entity::find()
        .filter(comment::Column::StudyUid.eq(&study_uid))
        .filter(comment::Column::SeriesUid.eq(&series_uid))
        .filter(comment::Column::Text.eq(&text))
        .filter(comment::Column::Time.eq(time))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("comment missing after insert".into()))?;

    Ok(Json(CommentRecord::from(saved)))
}

#[utoipa::path(
    put,
    path = "/api/notes/{study_uid}/comments/{comment_id}",
    tag = "Comments",
    operation_id = "updateComment",
    summary = "Edit a comment's text",
    description = "The comment's time is always reset to server time. Comments can only be \
        reached through the study they belong to.",
    params(
        ("study_uid" = String, Path, description = "Study instance UID"),
        ("comment_id" = String, Path, description = "Comment ID"),
    ),
    request_body(content = CommentUpdate, description = "Replacement text"),
    responses(
        (status = 200, description = "Updated comment", body = CommentRecord),
        (status = 400, description = "Missing or empty text (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Comment not found in this study (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn update_comment(
    State(state): State<AppState>,
    Path((study_uid, comment_id)): Path<(String, String)>,
    LenientJson(payload): LenientJson<CommentUpdate>,
) -> Result<Json<CommentRecord>, AppError> {
    let existing = find_study_comment(&state.db, &study_uid, &comment_id).await?;
    let text = payload
        .trimmed_text()
        .ok_or_else(|| AppError::Validation("Comment text is required".into()))?
        .to_string();

    let mut active: comment::ActiveModel = existing.into();
    active.text = Set(text);
    active.time = Set(now_ms());
    let updated = active.update(&state.db).await?;

    Ok(Json(CommentRecord::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/notes/{study_uid}/comments/{comment_id}",
    tag = "Comments",
    operation_id = "deleteComment",
    summary = "Delete a comment",
    params(
        ("study_uid" = String, Path, description = "Study instance UID"),
        ("comment_id" = String, Path, description = "Comment ID"),
    ),
    responses(
        (status = 200, description = "Comment deleted", body = DeletedComment),
        (status = 404, description = "Comment not found in this study (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((study_uid, comment_id)): Path<(String, String)>,
) -> Result<Json<DeletedComment>, AppError> {
    let existing = find_study_comment(&state.db, &study_uid, &comment_id).await?;
    comment::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await?;

    Ok(Json(DeletedComment {
        deleted: true,
        id: i64::from(existing.id),
    }))
}

/// Insert a comment unless the same (study, series, text, time) tuple exists.
/// Returns the number of rows inserted.
pub(crate) async fn insert_comment_if_absent<C>(
    db: &C,
    model: comment::ActiveModel,
) -> Result<u64, DbErr>
where
    C: sea_orm::ConnectionTrait,
{
    let result = comment::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                comment::Column::StudyUid,
                comment::Column::SeriesUid,
                comment::Column::Text,
                comment::Column::Time,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(n) => Ok(n),
        Err(DbErr::RecordNotInserted) => Ok(0),
        Err(e) => Err(e),
    }
}

/// Look a comment up by id, scoped to its study. Ids that are not numbers,
/// unknown ids and ids from another study are all "not found".
async fn find_study_comment(
    db: &DatabaseConnection,
    study_uid: &str,
    comment_id: &str,
) -> Result<comment::Model, AppError> {
    let not_found = || AppError::NotFound(format!("Comment {comment_id} not found"));
    let id: i32 = comment_id.trim().parse().map_err(|_| not_found())?;

    comment::Entity::find_by_id(id)
        .filter(comment::Column::StudyUid.eq(study_uid))
        .one(db)
        .await?
        .ok_or_else(not_found)
}
