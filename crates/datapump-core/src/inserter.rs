//! Writes one file's candles inside a single transaction.

use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Connection, PgConnection, Postgres, Transaction};
use tracing::{debug, info, warn};

use crate::config::ConnectionDescriptor;
use crate::db::{self, RetryPolicy};
use crate::error::{InsertStage, PipelineError, Result};
use crate::ingestion::ImportJob;
use crate::pipeline::CandleSink;

pub const DEFAULT_TABLE: &str = "Candles";

/// Name of the pre-existing relation candles are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTable(String);

impl TargetTable {
    /// Accepts plain identifiers only; the name is always quoted in SQL.
    pub fn new(name: &str) -> Result<Self> {
        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !name.starts_with(|c: char| c.is_ascii_digit());
        if !valid {
            return Err(PipelineError::Configuration(format!(
                "invalid target table name '{name}'"
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn insert_sql(&self) -> String {
        format!(
            r#"INSERT INTO "{}" ("Timestamp", "Open", "Close", "High", "Low", "Volume", "TradingPair")
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
            self.0
        )
    }
}

impl Default for TargetTable {
    fn default() -> Self {
        Self(DEFAULT_TABLE.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertReport {
    pub pair: String,
    pub rows: usize,
}

/// Integrity constraint violations: unique, foreign key, not null, check.
pub fn is_integrity_sqlstate(code: &str) -> bool {
    code.starts_with("23")
}

fn classify_row_error(pair: &str, row: usize, source: sqlx::Error) -> PipelineError {
    let integrity = match &source {
        sqlx::Error::Database(db) => db.code().as_deref().is_some_and(is_integrity_sqlstate),
        _ => false,
    };

    if integrity {
        PipelineError::IntegrityViolation {
            pair: pair.to_string(),
            row,
            source,
        }
    } else {
        PipelineError::UnexpectedInsert {
            pair: pair.to_string(),
            stage: InsertStage::Row(row),
            source,
        }
    }
}

/// Aborts the file's transaction. A failed rollback is only logged: the
/// connection is closed right after, which discards the transaction anyway.
pub async fn rollback(tx: Transaction<'_, Postgres>, pair: &str) {
    match tx.rollback().await {
        Ok(()) => debug!(pair, "transaction rolled back"),
        Err(err) => warn!(pair, error = %err, "rollback failed; discarding connection"),
    }
}

/// Inserts every candle of `job` and commits, or rolls back on the first
/// failing row. Nothing from the file persists unless every row succeeded.
pub async fn insert_job(
    conn: &mut PgConnection,
    table: &TargetTable,
    job: ImportJob,
) -> Result<InsertReport> {
    let ImportJob { pair, candles, .. } = job;
    let sql = table.insert_sql();

    let mut tx = conn
        .begin()
        .await
        .map_err(|source| PipelineError::UnexpectedInsert {
            pair: pair.clone(),
            stage: InsertStage::Begin,
            source,
        })?;

    for (idx, candle) in candles.iter().enumerate() {
        let outcome = sqlx::query(&sql)
            .bind(candle.timestamp)
            .bind(candle.open)
            .bind(candle.close)
            .bind(candle.high)
            .bind(candle.low)
            .bind(candle.volume)
            .bind(&candle.pair)
            .execute(&mut *tx)
            .await;

        if let Err(source) = outcome {
            rollback(tx, &pair).await;
            return Err(classify_row_error(&pair, idx + 1, source));
        }
    }

    tx.commit()
        .await
        .map_err(|source| PipelineError::UnexpectedInsert {
            pair: pair.clone(),
            stage: InsertStage::Commit,
            source,
        })?;

    Ok(InsertReport {
        pair,
        rows: candles.len(),
    })
}

/// Sink that opens a fresh connection per file and closes it afterwards.
#[derive(Debug, Clone)]
pub struct PostgresSink {
    descriptor: ConnectionDescriptor,
    policy: RetryPolicy,
    table: TargetTable,
}

impl PostgresSink {
    pub fn new(descriptor: ConnectionDescriptor, policy: RetryPolicy, table: TargetTable) -> Self {
        Self {
            descriptor,
            policy,
            table,
        }
    }
}

#[async_trait]
impl CandleSink for PostgresSink {
    async fn insert(&mut self, job: ImportJob) -> Result<InsertReport> {
        let mut conn = db::connect(&self.descriptor, &self.policy).await?;

        let started = Instant::now();
        info!(pair = %job.pair, rows = job.len(), table = self.table.name(), "starting insertion");
        let outcome = insert_job(&mut conn, &self.table, job).await;

        if let Err(err) = conn.close().await {
            warn!(error = %err, "failed to close database connection cleanly");
        }

        if let Ok(report) = &outcome {
            info!(
                pair = %report.pair,
                rows = report.rows,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "finished insertion"
            );
        }
        outcome
    }
}
