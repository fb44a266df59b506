use notes_common::{CommentId, CommentRecord};

use crate::entity::comment;

impl From<comment::Model> for CommentRecord {
    fn from(model: comment::Model) -> Self {
        Self {
            id: CommentId::Number(i64::from(model.id)),
            series_uid: model.series().map(str::to_string),
            study_uid: model.study_uid,
            text: model.text,
            time: model.time,
        }
    }
}

impl From<&comment::Model> for notes_common::Comment {
    fn from(model: &comment::Model) -> Self {
        Self {
            id: CommentId::Number(i64::from(model.id)),
            text: model.text.clone(),
            time: model.time,
        }
    }
}
