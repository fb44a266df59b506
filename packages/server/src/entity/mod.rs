pub mod comment;
pub mod report;
pub mod series_note;
pub mod study_note;
