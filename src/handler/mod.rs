pub mod jobs;
pub mod quotes;
