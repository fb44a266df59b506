pub mod disposition;
pub mod study_list;
