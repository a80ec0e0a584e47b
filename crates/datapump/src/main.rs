use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::Table;
use datapump_core::config::ConnectionDescriptor;
use datapump_core::db::{RetryPolicy, MAX_CONNECT_ATTEMPTS, RETRY_DELAY};
use datapump_core::inserter::{PostgresSink, TargetTable, DEFAULT_TABLE};
use datapump_core::pipeline::{self, DryRunSink, PipelineConfig, RunOutcome};
use datapump_core::report::{FileStatus, RunReport};
use datapump_core::validation::CANDLE_PERIOD_MS;
use tracing::dispatcher::{self, Dispatch};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit status when the input directory holds no candle files.
const NO_INPUT_FILES_STATUS: u8 = 3;

#[derive(Parser, Debug)]
#[command(author, version, about = "Push candle CSV files into Postgres", long_about = None)]
struct Cli {
    /// Directory holding `<pair>.csv` files
    #[arg(long, default_value = "./data")]
    input_dir: PathBuf,

    /// Extension of the files to import
    #[arg(long, default_value = ".csv")]
    extension: String,

    /// Connection string; falls back to DATABASE_URL / DATAPUMP_DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    /// Table the candles are inserted into (must already exist)
    #[arg(long, env = "DATAPUMP_TABLE", default_value = DEFAULT_TABLE)]
    table: String,

    /// Expected spacing between consecutive timestamps, in milliseconds
    #[arg(long, default_value_t = CANDLE_PERIOD_MS)]
    period_ms: i64,

    /// Connection attempts before giving up
    #[arg(
        long,
        default_value_t = MAX_CONNECT_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_attempts: u32,

    /// Seconds to wait between connection attempts
    #[arg(long, default_value_t = RETRY_DELAY.as_secs())]
    retry_delay_secs: u64,

    /// Parse and validate every file without touching the database
    #[arg(long)]
    dry_run: bool,

    /// Print the run report as JSON instead of a table
    #[arg(long)]
    report_json: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let dispatch = log_dispatch(cli.log_format);
    dispatcher::with_default(&dispatch, || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                error!(error = %err, "failed to start runtime");
                return ExitCode::FAILURE;
            }
        };

        match runtime.block_on(run(cli)) {
            Ok(code) => code,
            Err(err) => {
                error!("datapump aborted: {err:#}");
                ExitCode::FAILURE
            }
        }
    })
}

/// Builds the subscriber for this run. Colors are only used when stderr is a
/// terminal and NO_COLOR is unset; JSON output is never colored.
fn log_dispatch(format: LogFormat) -> Dispatch {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => Dispatch::new(builder.json().finish()),
        LogFormat::Pretty => {
            let ansi = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
            Dispatch::new(builder.with_ansi(ansi).finish())
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = PipelineConfig {
        input_dir: cli.input_dir,
        extension: cli.extension,
        period_ms: cli.period_ms,
    };

    let outcome = if cli.dry_run {
        info!("dry run: no database connection will be opened");
        pipeline::run(&config, &mut DryRunSink).await?
    } else {
        let descriptor = match cli.database_url.as_deref() {
            Some(url) => ConnectionDescriptor::from_url(url),
            None => ConnectionDescriptor::from_env(),
        }
        .context("database configuration is required")?;
        let table = TargetTable::new(&cli.table)?;
        let policy = RetryPolicy {
            max_attempts: cli.max_attempts,
            delay: Duration::from_secs(cli.retry_delay_secs),
        };
        info!(target_db = %descriptor, table = table.name(), "resolved database target");

        let mut sink = PostgresSink::new(descriptor, policy, table);
        pipeline::run(&config, &mut sink).await?
    };

    match outcome {
        RunOutcome::NoInputFiles => Ok(ExitCode::from(NO_INPUT_FILES_STATUS)),
        RunOutcome::Completed(report) => {
            if cli.report_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report_table(&report));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn report_table(report: &RunReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Pair", "Status", "Rows", "Error"]);
    for file in &report.files {
        let status = match (file.status, report.dry_run) {
            (FileStatus::Imported, true) => "validated",
            (FileStatus::Imported, false) => "imported",
            (FileStatus::Skipped, _) => "skipped",
        };
        table.add_row(vec![
            file.pair.clone(),
            status.to_string(),
            file.rows.to_string(),
            file.error.clone().unwrap_or_default(),
        ]);
    }
    table
}
