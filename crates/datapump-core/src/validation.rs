// crates/datapump-core/src/validation.rs

use crate::error::{PipelineError, Result};
use crate::ingestion::ImportJob;

/// One minute, in the millisecond timestamps the candle files carry.
pub const CANDLE_PERIOD_MS: i64 = 60_000;

/// Checks that consecutive candles of one file are exactly one period apart.
///
/// The step may go either way: a file listed newest-first passes as long as
/// the spacing stays constant.
#[derive(Debug, Clone, Copy)]
pub struct ContinuityValidator {
    period_ms: i64,
}

impl Default for ContinuityValidator {
    fn default() -> Self {
        Self::new(CANDLE_PERIOD_MS)
    }
}

impl ContinuityValidator {
    pub fn new(period_ms: i64) -> Self {
        Self { period_ms }
    }

    pub fn period_ms(&self) -> i64 {
        self.period_ms
    }

    /// Fails on the first row that breaks the spacing; the whole job is rejected.
    pub fn validate(&self, job: &ImportJob) -> Result<()> {
        for (idx, window) in job.candles.windows(2).enumerate() {
            let (previous, current) = (window[0].timestamp, window[1].timestamp);
            if !self.is_step(previous, current) {
                return Err(PipelineError::Continuity {
                    pair: job.pair.clone(),
                    row: idx + 2,
                    timestamp: current,
                    previous,
                    period: self.period_ms,
                });
            }
        }
        Ok(())
    }

    fn is_step(&self, previous: i64, current: i64) -> bool {
        previous.checked_add(self.period_ms) == Some(current)
            || previous.checked_sub(self.period_ms) == Some(current)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use datapump_parser::{Candle, HeaderCheck};

    use super::*;

    fn job(timestamps: &[i64]) -> ImportJob {
        ImportJob {
            pair: "BTCUSD".to_string(),
            path: PathBuf::from("BTCUSD.csv"),
            header: HeaderCheck::Absent,
            candles: timestamps
                .iter()
                .map(|&timestamp| Candle {
                    timestamp,
                    open: 1.0,
                    close: 2.0,
                    high: 3.0,
                    low: 4.0,
                    volume: 5.0,
                    pair: "BTCUSD".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn accepts_evenly_spaced_rows() {
        let validator = ContinuityValidator::default();
        validator.validate(&job(&[1000, 61000, 121000])).expect("spacing is constant");
    }

    #[test]
    fn accepts_descending_rows() {
        let validator = ContinuityValidator::default();
        validator.validate(&job(&[121000, 61000, 1000])).expect("descending spacing");
    }

    #[test]
    fn empty_and_single_row_jobs_pass() {
        let validator = ContinuityValidator::default();
        validator.validate(&job(&[])).expect("empty job");
        validator.validate(&job(&[42])).expect("single row");
    }

    #[test]
    fn reports_first_gap() {
        let validator = ContinuityValidator::default();
        let err = validator
            .validate(&job(&[1000, 61000, 500000, 560000]))
            .expect_err("gap must fail");

        match err {
            PipelineError::Continuity {
                pair,
                row,
                timestamp,
                previous,
                period,
            } => {
                assert_eq!(pair, "BTCUSD");
                assert_eq!(row, 3);
                assert_eq!(timestamp, 500000);
                assert_eq!(previous, 61000);
                assert_eq!(period, CANDLE_PERIOD_MS);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn duplicate_timestamp_is_a_gap() {
        let validator = ContinuityValidator::default();
        assert!(validator.validate(&job(&[1000, 1000])).is_err());
    }

    #[test]
    fn period_is_configurable() {
        let validator = ContinuityValidator::new(300_000);
        validator.validate(&job(&[0, 300_000, 600_000])).expect("five minute spacing");
        assert!(validator.validate(&job(&[0, 60_000])).is_err());
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let validator = ContinuityValidator::default();
        assert!(validator.validate(&job(&[i64::MAX, i64::MIN])).is_err());
    }
}
