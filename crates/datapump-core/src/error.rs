// crates/datapump-core/src/error.rs

use std::fmt;
use std::path::PathBuf;

use datapump_parser::ParserError;
use thiserror::Error;

/// Where inside a file's transaction an unexpected database error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertStage {
    Begin,
    Row(usize),
    Commit,
}

impl fmt::Display for InsertStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertStage::Begin => write!(f, "begin"),
            InsertStage::Row(row) => write!(f, "row {row}"),
            InsertStage::Commit => write!(f, "commit"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("could not connect to the database after {attempts} attempts: {source}")]
    ConnectionExhausted {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("could not list input directory {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{pair}: could not read {}: {source}", path.display())]
    Read {
        pair: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParserError),

    #[error(
        "{pair}: timestamp {timestamp} at row {row} is not {period} ms away from previous timestamp {previous}"
    )]
    Continuity {
        pair: String,
        row: usize,
        timestamp: i64,
        previous: i64,
        period: i64,
    },

    #[error("{pair}: integrity violation at row {row}: {source}")]
    IntegrityViolation {
        pair: String,
        row: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("{pair}: unexpected insert error at {stage}: {source}")]
    UnexpectedInsert {
        pair: String,
        stage: InsertStage,
        #[source]
        source: sqlx::Error,
    },
}

impl PipelineError {
    /// Fatal errors stop the whole run; everything else only skips one file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Configuration(_)
                | PipelineError::ConnectionExhausted { .. }
                | PipelineError::Connect(_)
                | PipelineError::Discovery { .. }
        )
    }

    /// Label of the file this error belongs to, if it is a per-file error.
    pub fn pair(&self) -> Option<&str> {
        match self {
            PipelineError::Read { pair, .. }
            | PipelineError::Continuity { pair, .. }
            | PipelineError::IntegrityViolation { pair, .. }
            | PipelineError::UnexpectedInsert { pair, .. } => Some(pair),
            PipelineError::Parse(err) => Some(err.pair()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
