pub mod jobs;
pub mod pipelines;
