pub mod comment;
pub mod report;
