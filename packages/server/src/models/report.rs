use notes_common::{Report, ReportType};

use crate::entity::report;
use crate::error::AppError;

impl TryFrom<report::Model> for Report {
    type Error = AppError;

    fn try_from(model: report::Model) -> Result<Self, Self::Error> {
        let report_type = ReportType::parse(&model.report_type).ok_or_else(|| {
            AppError::Internal(format!(
                "report {} has unknown type {:?}",
                model.id, model.report_type
            ))
        })?;

        Ok(Self {
            id: model.id,
            study_uid: model.study_uid,
            name: model.name,
            report_type,
            size: model.size,
            added_at: model.added_at,
            updated_at: model.updated_at,
        })
    }
}
