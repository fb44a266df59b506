use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report metadata. The file itself lives in the blob store under `content_hash`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub study_uid: String,

    pub name: String,

    /// `pdf`, `png` or `jpg`.
    pub report_type: String,

    pub size: i64,

    pub content_hash: String,

    pub added_at: i64,
    pub updated_at: i64,
}

impl ActiveModelBehavior for ActiveModel {}
