use axum::Json;
use axum::extract::{Path, State};
use notes_common::time::now_ms;
use notes_common::{DescriptionPayload, DescriptionRecord};
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, Set};
use tracing::instrument;

use crate::entity::{series_note, study_note};
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::LenientJson;
use crate::state::AppState;

#[utoipa::path(
    put,
    path = "/api/notes/{study_uid}/description",
    tag = "Descriptions",
    operation_id = "saveStudyDescription",
    summary = "Save or clear a study description",
    description = "The description is trimmed. An empty result (or a missing body) removes the \
        stored description.",
    params(("study_uid" = String, Path, description = "Study instance UID")),
    request_body(content = DescriptionPayload, description = "New description"),
    responses(
        (status = 200, description = "Saved description", body = DescriptionRecord),
        (status = 400, description = "Malformed body (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn save_study_description(
    State(state): State<AppState>,
    Path(study_uid): Path<String>,
    LenientJson(payload): LenientJson<DescriptionPayload>,
) -> Result<Json<DescriptionRecord>, AppError> {
    let description = trimmed(&payload);
    let now = now_ms();

    if description.is_empty() {
        study_note::Entity::delete_by_id(study_uid.clone())
            .exec(&state.db)
            .await?;
    } else {
        let model = study_note::ActiveModel {
            study_uid: Set(study_uid.clone()),
            description: Set(description.clone()),
            updated_at: Set(now),
        };
        study_note::Entity::insert(model)
            .on_conflict(
                OnConflict::column(study_note::Column::StudyUid)
                    .update_columns([study_note::Column::Description, study_note::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&state.db)
            .await?;
    }

    Ok(Json(DescriptionRecord {
        study_uid,
        series_uid: None,
        description,
        updated_at: now,
    }))
}

#[utoipa::path(
    put,
    path = "/api/notes/{study_uid}/series/{series_uid}/description",
    tag = "Descriptions",
    operation_id = "saveSeriesDescription",
    summary = "Save or clear a series description",
    description = "Same rules as the study description, scoped to one series of the study.",
    params(
        ("study_uid" = String, Path, description = "Study instance UID"),
        ("series_uid" = String, Path, description = "Series instance UID"),
    ),
    request_body(content = DescriptionPayload, description = "New description"),
    responses(
        (status = 200, description = "Saved description", body = DescriptionRecord),
        (status = 400, description = "Malformed body (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn save_series_description(
    State(state): State<AppState>,
    Path((study_uid, series_uid)): Path<(String, String)>,
    LenientJson(payload): LenientJson<DescriptionPayload>,
) -> Result<Json<DescriptionRecord>, AppError> {
    let description = trimmed(&payload);
    let now = now_ms();

    if description.is_empty() {
        series_note::Entity::delete_by_id((study_uid.clone(), series_uid.clone()))
            .exec(&state.db)
            .await?;
    } else {
        let model = series_note::ActiveModel {
            study_uid: Set(study_uid.clone()),
            series_uid: Set(series_uid.clone()),
            description: Set(description.clone()),
            updated_at: Set(now),
        };
        series_note::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([series_note::Column::StudyUid, series_note::Column::SeriesUid])
                    .update_columns([
                        series_note::Column::Description,
                        series_note::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&state.db)
            .await?;
    }

    Ok(Json(DescriptionRecord {
        study_uid,
        series_uid: Some(series_uid),
        description,
        updated_at: now,
    }))
}

fn trimmed(payload: &DescriptionPayload) -> String {
    payload
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}
