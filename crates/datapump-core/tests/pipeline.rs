use std::path::Path;

use async_trait::async_trait;
use datapump_core::ingestion::ImportJob;
use datapump_core::inserter::InsertReport;
use datapump_core::pipeline::{run, CandleSink, DryRunSink, PipelineConfig, RunOutcome};
use datapump_core::report::{FileStatus, RunReport};
use datapump_core::{PipelineError, Result};

fn config(dir: &str) -> PipelineConfig {
    PipelineConfig {
        input_dir: Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(dir),
        ..PipelineConfig::default()
    }
}

/// Records every job it receives; optionally fails for one pair.
#[derive(Default)]
struct RecordingSink {
    jobs: Vec<ImportJob>,
    fail_pair: Option<(&'static str, fn(&str) -> PipelineError)>,
}

#[async_trait]
impl CandleSink for RecordingSink {
    async fn insert(&mut self, job: ImportJob) -> Result<InsertReport> {
        let failure = match self.fail_pair {
            Some((pair, make_error)) if pair == job.pair => Some(make_error(pair)),
            _ => None,
        };
        let report = InsertReport {
            pair: job.pair.clone(),
            rows: job.len(),
        };
        self.jobs.push(job);
        match failure {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }
}

fn completed(outcome: RunOutcome) -> RunReport {
    match outcome {
        RunOutcome::Completed(report) => report,
        RunOutcome::NoInputFiles => panic!("expected a completed run"),
    }
}

fn status_of<'a>(report: &'a RunReport, pair: &str) -> &'a datapump_core::report::FileReport {
    report
        .files
        .iter()
        .find(|file| file.pair == pair)
        .unwrap_or_else(|| panic!("no report for {pair}"))
}

#[tokio::test]
async fn invalid_files_never_reach_the_sink() {
    let mut sink = RecordingSink::default();
    let report = completed(run(&config("pipeline"), &mut sink).await.expect("run failed"));

    let inserted: Vec<&str> = sink.jobs.iter().map(|job| job.pair.as_str()).collect();
    assert_eq!(inserted, ["BTCUSD", "ETHUSD"]);

    assert_eq!(report.discovered, 4);
    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.rows_inserted, 5);
    assert!(!report.dry_run);

    let gap = status_of(&report, "GAPUSD");
    assert_eq!(gap.status, FileStatus::Skipped);
    assert_eq!(gap.rows, 0);
    assert!(gap.error.as_deref().unwrap_or_default().contains("500000"));

    assert_eq!(status_of(&report, "BADUSD").status, FileStatus::Skipped);
    assert_eq!(status_of(&report, "BTCUSD").status, FileStatus::Imported);
    assert_eq!(status_of(&report, "BTCUSD").rows, 2);
}

#[tokio::test]
async fn insert_failure_skips_only_that_file() {
    let mut sink = RecordingSink {
        fail_pair: Some(("BTCUSD", |pair: &str| PipelineError::IntegrityViolation {
            pair: pair.to_string(),
            row: 1,
            source: sqlx::Error::RowNotFound,
        })),
        ..RecordingSink::default()
    };
    let report = completed(run(&config("pipeline"), &mut sink).await.expect("run failed"));

    assert_eq!(sink.jobs.len(), 2);
    assert_eq!(status_of(&report, "BTCUSD").status, FileStatus::Skipped);
    assert_eq!(status_of(&report, "ETHUSD").status, FileStatus::Imported);
    assert_eq!(report.rows_inserted, 3);
}

#[tokio::test]
async fn fatal_sink_error_stops_the_run() {
    let mut sink = RecordingSink {
        fail_pair: Some(("BTCUSD", |_: &str| PipelineError::ConnectionExhausted {
            attempts: 10,
            source: sqlx::Error::PoolTimedOut,
        })),
        ..RecordingSink::default()
    };
    let err = run(&config("pipeline"), &mut sink).await.expect_err("run must abort");

    assert!(matches!(err, PipelineError::ConnectionExhausted { .. }));
    let attempted: Vec<&str> = sink.jobs.iter().map(|job| job.pair.as_str()).collect();
    assert_eq!(attempted, ["BTCUSD"]);
}

#[tokio::test]
async fn empty_directory_is_not_an_error() {
    let mut sink = RecordingSink::default();
    let outcome = run(&config("empty"), &mut sink).await.expect("run failed");

    assert!(matches!(outcome, RunOutcome::NoInputFiles));
    assert!(sink.jobs.is_empty());
}

#[tokio::test]
async fn dry_run_validates_without_writing() {
    let report = completed(run(&config("pipeline"), &mut DryRunSink).await.expect("run failed"));

    assert!(report.dry_run);
    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped, 2);
}
