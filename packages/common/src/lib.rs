//! Types shared by the notes server and the viewer-side notes client.
//!
//! The notes document ([`NotesStore`]) has one shape everywhere: it is what
//! the batch load endpoint returns and what the local backend persists, so
//! callers never need to know which backend produced it.

pub mod limits;
pub mod migrate;
pub mod model;
pub mod report;
pub mod storage;
pub mod time;

pub use migrate::{LegacyComment, LegacySeries, LegacyStudyBlob, MigrateRequest, MigrateResponse};
pub use model::{
    Comment, CommentId, CommentPayload, CommentRecord, CommentUpdate, DeletedComment,
    DeletedReport, DescriptionPayload, DescriptionRecord, NotesStore, Report, SeriesEntry,
    StudyEntry,
};
pub use report::{ReportType, is_valid_report_id, sanitize_report_id};
