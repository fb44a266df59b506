use sea_orm::sea_query::{Index, SqliteQueryBuilder};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use tracing::info;

use crate::entity::comment;

pub const COMMENT_DEDUP_INDEX: &str = "idx_comment_study_series_text_time";

/// Ensure required database indexes exist.
///
/// Schema sync only knows single-column constraints, so the composite unique
/// index that makes comment import idempotent is created here.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name(COMMENT_DEDUP_INDEX)
        .table(comment::Entity)
        .col(comment::Column::StudyUid)
        .col(comment::Column::SeriesUid)
        .col(comment::Column::Text)
        .col(comment::Column::Time)
        .to_string(SqliteQueryBuilder);

    db.execute_unprepared(&stmt).await?;
    info!("Ensured index {COMMENT_DEDUP_INDEX} exists");

    Ok(())
}
