pub mod cost;
pub mod scoring;
pub mod sources;
