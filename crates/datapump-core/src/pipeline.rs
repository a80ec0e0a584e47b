//! Drives discovery, loading, validation and insertion file by file.

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::{PipelineError, Result};
use crate::ingestion::{discover_files, load_job, source_path, ImportJob};
use crate::inserter::InsertReport;
use crate::report::RunReport;
use crate::validation::{ContinuityValidator, CANDLE_PERIOD_MS};

/// Destination for validated jobs. Each call consumes the job.
#[async_trait]
pub trait CandleSink: Send {
    async fn insert(&mut self, job: ImportJob) -> Result<InsertReport>;

    /// Whether this sink leaves the database untouched.
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Accepts every job without writing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunSink;

#[async_trait]
impl CandleSink for DryRunSink {
    async fn insert(&mut self, job: ImportJob) -> Result<InsertReport> {
        info!(pair = %job.pair, rows = job.len(), "dry run: file would be inserted");
        Ok(InsertReport {
            rows: job.len(),
            pair: job.pair,
        })
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub extension: String,
    pub period_ms: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./data"),
            extension: ".csv".to_string(),
            period_ms: CANDLE_PERIOD_MS,
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Discovery found nothing to import.
    NoInputFiles,
    Completed(RunReport),
}

/// Processes every discovered file in order.
///
/// Per-file failures are logged and recorded in the report; only fatal
/// errors (see [`PipelineError::is_fatal`]) end the run early.
pub async fn run<S>(config: &PipelineConfig, sink: &mut S) -> Result<RunOutcome>
where
    S: CandleSink + ?Sized,
{
    let labels = discover_files(&config.input_dir, &config.extension)?;
    if labels.is_empty() {
        info!(
            input_dir = %config.input_dir.display(),
            extension = %config.extension,
            "no input files found; nothing to do"
        );
        return Ok(RunOutcome::NoInputFiles);
    }

    let files: Vec<String> = labels
        .iter()
        .map(|pair| source_path(&config.input_dir, pair, &config.extension).display().to_string())
        .collect();
    info!(count = labels.len(), ?files, "pushing data of the discovered files");

    let validator = ContinuityValidator::new(config.period_ms);
    let mut report = RunReport::new(labels.len(), sink.is_dry_run());
    let started = Instant::now();

    for pair in &labels {
        match import_file(config, &validator, sink, pair).await {
            Ok(inserted) => report.record_imported(inserted),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                log_skip(pair, &err);
                report.record_skipped(pair, &err);
            }
        }
    }

    info!(
        discovered = report.discovered,
        imported = report.imported,
        skipped = report.skipped,
        rows = report.rows_inserted,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run finished"
    );
    Ok(RunOutcome::Completed(report))
}

async fn import_file<S>(
    config: &PipelineConfig,
    validator: &ContinuityValidator,
    sink: &mut S,
    pair: &str,
) -> Result<InsertReport>
where
    S: CandleSink + ?Sized,
{
    let job = load_job(&config.input_dir, pair, &config.extension)?;
    validator.validate(&job)?;
    sink.insert(job).await
}

fn log_skip(pair: &str, err: &PipelineError) {
    match err {
        PipelineError::UnexpectedInsert { .. } => {
            error!(pair, error = %err, "unexpected error while inserting; file skipped");
        }
        PipelineError::IntegrityViolation { .. } => {
            warn!(pair, error = %err, "integrity violation; file rolled back and skipped");
        }
        _ => {
            warn!(pair, error = %err, "file rejected before insertion; skipped");
        }
    }
}
