use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{RawQuery, State};
use notes_common::{Comment, NotesStore, Report, StudyEntry};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::instrument;

use crate::entity::{comment, report, series_note, study_note};
use crate::error::{AppError, ErrorBody};
use crate::state::AppState;
use crate::utils::study_list::parse_study_uids;

#[utoipa::path(
    get,
    path = "/api/notes",
    tag = "Notes",
    operation_id = "loadNotes",
    summary = "Batch-load notes for several studies",
    description = "Returns descriptions, comments (ascending by time), series notes and reports \
        for every requested study that has any. Studies without notes are omitted.",
    params(("studies" = Option<String>, Query, description = "Comma-separated, percent-encoded study UIDs (at most 200)")),
    responses(
        (status = 200, description = "Notes keyed by study UID", body = NotesStore),
        (status = 400, description = "Too many studies (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn load_notes(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<NotesStore>, AppError> {
    let uids = parse_study_uids(query.as_deref())?;
    if uids.is_empty() {
        return Ok(Json(NotesStore::default()));
    }

    let mut studies: BTreeMap<String, StudyEntry> = uids
        .iter()
        .map(|uid| (uid.clone(), StudyEntry::default()))
        .collect();

    let descriptions = study_note::Entity::find()
        .filter(study_note::Column::StudyUid.is_in(uids.clone()))
        .all(&state.db)
        .await?;
    for note in descriptions {
        if let Some(entry) = studies.get_mut(&note.study_uid) {
            entry.description = note.description;
        }
    }

    let series_notes = series_note::Entity::find()
        .filter(series_note::Column::StudyUid.is_in(uids.clone()))
        .all(&state.db)
        .await?;
    for note in series_notes {
        if let Some(entry) = studies.get_mut(&note.study_uid) {
            entry.series.entry(note.series_uid).or_default().description = note.description;
        }
    }

    let comments = comment::Entity::find()
        .filter(comment::Column::StudyUid.is_in(uids.clone()))
        .order_by_asc(comment::Column::Time)
        .order_by_asc(comment::Column::Id)
        .all(&state.db)
        .await?;
    for row in &comments {
        let Some(entry) = studies.get_mut(&row.study_uid) else {
            continue;
        };
        let comment = Comment::from(row);
        match row.series() {
            Some(series_uid) => entry
                .series
                .entry(series_uid.to_string())
                .or_default()
                .comments
                .push(comment),
            None => entry.comments.push(comment),
        }
    }

    let reports = report::Entity::find()
        .filter(report::Column::StudyUid.is_in(uids))
        .order_by_asc(report::Column::AddedAt)
        .order_by_asc(report::Column::Id)
        .all(&state.db)
        .await?;
    for row in reports {
        if let Some(entry) = studies.get_mut(&row.study_uid) {
            entry.reports.push(Report::try_from(row)?);
        }
    }

    let mut store = NotesStore { studies };
    store.prune();
    Ok(Json(store))
}
