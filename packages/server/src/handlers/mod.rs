pub mod comment;
pub mod description;
pub mod migrate;
pub mod notes;
pub mod report;
