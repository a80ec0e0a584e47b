use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::PipelineError;
use crate::inserter::InsertReport;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Imported,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub pair: String,
    pub status: FileStatus,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub discovered: usize,
    pub imported: usize,
    pub skipped: usize,
    pub rows_inserted: usize,
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn new(discovered: usize, dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            dry_run,
            discovered,
            imported: 0,
            skipped: 0,
            rows_inserted: 0,
            files: Vec::with_capacity(discovered),
        }
    }

    pub fn record_imported(&mut self, report: InsertReport) {
        self.imported += 1;
        self.rows_inserted += report.rows;
        self.files.push(FileReport {
            pair: report.pair,
            status: FileStatus::Imported,
            rows: report.rows,
            error: None,
        });
    }

    pub fn record_skipped(&mut self, pair: &str, err: &PipelineError) {
        self.skipped += 1;
        self.files.push(FileReport {
            pair: pair.to_string(),
            status: FileStatus::Skipped,
            rows: 0,
            error: Some(err.to_string()),
        });
    }
}
