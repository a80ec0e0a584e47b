pub mod config;
pub mod db;
pub mod error;
pub mod ingestion;
pub mod inserter;
pub mod pipeline;
pub mod report;
pub mod validation;

pub use error::{PipelineError, Result};
