use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub study_uid: String,

    /// Empty for study-level comments. Kept non-null so the
    /// (study, series, text, time) unique index also dedups study-level rows.
    pub series_uid: String,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    /// Epoch milliseconds; the ordering key.
    pub time: i64,

    pub created_at: i64,
}

impl Model {
    pub fn series(&self) -> Option<&str> {
        Some(self.series_uid.as_str()).filter(|s| !s.is_empty())
    }
}

impl ActiveModelBehavior for ActiveModel {}
