use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Study-level description. A row exists only while the description is non-empty.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "study_note")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub study_uid: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl ActiveModelBehavior for ActiveModel {}
