use axum::Json;
use axum::extract::State;
use notes_common::time::now_ms;
use notes_common::{LegacyComment, LegacyStudyBlob, MigrateRequest, MigrateResponse};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Set, TransactionTrait};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::entity::{comment, series_note, study_note};
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::LenientJson;
use crate::handlers::comment::insert_comment_if_absent;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/notes/migrate",
    tag = "Migration",
    operation_id = "migrateNotes",
    summary = "Import notes from a local notes document",
    description = "Descriptions are only inserted where none exist. Comments are deduplicated on \
        (study, series, text, time), so importing the same payload twice inserts nothing the \
        second time. Study entries that are not objects are skipped, as are malformed fields \
        within an entry.",
    request_body(content = MigrateRequest, description = "Legacy notes keyed by study UID"),
    responses(
        (status = 200, description = "Number of comments inserted", body = MigrateResponse),
        (status = 400, description = "`comments` is not an object (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, body))]
pub async fn migrate_notes(
    State(state): State<AppState>,
    LenientJson(body): LenientJson<Value>,
) -> Result<Json<MigrateResponse>, AppError> {
    let studies = legacy_studies(body)?;

    let txn = state.db.begin().await?;
    let now = now_ms();
    let mut migrated = 0u64;

    for (study_uid, blob) in studies {
        let study_uid = study_uid.trim().to_string();
        let blob = match LegacyStudyBlob::from_value(&blob) {
            Some(blob) if !study_uid.is_empty() => blob,
            _ => {
                warn!(%study_uid, "Skipping malformed migration entry");
                continue;
            }
        };

        if let Some(description) = non_empty(blob.description.as_deref()) {
            insert_study_description(&txn, &study_uid, description, now).await?;
        }
        migrated += import_comments(&txn, &study_uid, "", &blob.study, now).await?;

        for (series_uid, series) in &blob.series {
            if let Some(description) = non_empty(series.description())
                && !series_uid.is_empty()
            {
                insert_series_description(&txn, &study_uid, series_uid, description, now).await?;
            }
            migrated += import_comments(&txn, &study_uid, series_uid, series.comments(), now).await?;
        }
    }

    txn.commit().await?;
    info!(migrated, "Migration finished");

    Ok(Json(MigrateResponse { migrated }))
}

/// `comments` may be missing or null (nothing to import); anything other than
/// an object is rejected.
fn legacy_studies(body: Value) -> Result<Map<String, Value>, AppError> {
    let comments = match body {
        Value::Null => Value::Null,
        Value::Object(mut map) => map.remove("comments").unwrap_or(Value::Null),
        _ => return Err(AppError::Validation("Migration payload must be an object".into())),
    };

    match comments {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Validation("'comments' must be an object".into())),
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

async fn import_comments<C: ConnectionTrait>(
    db: &C,
    study_uid: &str,
    series_uid: &str,
    comments: &[LegacyComment],
    now: i64,
) -> Result<u64, DbErr> {
    let mut inserted = 0;
    for legacy in comments {
        let Some(text) = non_empty(legacy.text.as_deref()) else {
            continue;
        };
        let model = comment::ActiveModel {
            study_uid: Set(study_uid.to_string()),
            series_uid: Set(series_uid.to_string()),
            text: Set(text.to_string()),
            time: Set(legacy.time.unwrap_or(now)),
            created_at: Set(now),
            ..Default::default()
        };
        inserted += insert_comment_if_absent(db, model).await?;
    }
    Ok(inserted)
}

async fn insert_study_description<C: ConnectionTrait>(
    db: &C,
    study_uid: &str,
    description: &str,
    now: i64,
) -> Result<(), DbErr> {
    let model = study_note::ActiveModel {
        study_uid: Set(study_uid.to_string()),
        description: Set(description.to_string()),
        updated_at: Set(now),
    };
    let result = study_note::Entity::insert(model)
        .on_conflict(
            OnConflict::column(study_note::Column::StudyUid)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e),
    }
}

async fn insert_series_description<C: ConnectionTrait>(
    db: &C,
    study_uid: &str,
    series_uid: &str,
    description: &str,
    now: i64,
) -> Result<(), DbErr> {
    let model = series_note::ActiveModel {
        study_uid: Set(study_uid.to_string()),
        series_uid: Set(series_uid.to_string()),
        description: Set(description.to_string()),
        updated_at: Set(now),
    };
    let result = series_note::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([series_note::Column::StudyUid, series_note::Column::SeriesUid])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e),
    }
}
