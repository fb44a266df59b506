mod description;
mod migrate;
mod notes;
mod report;
