//! @ai:module:intent Reduce repeated runs of one invocation into a single outcome
//! @ai:module:layer domain
//! @ai:module:public_api CombinedResult, RunOutcome
//! @ai:module:stateless true

use crate::error::{BenchError, Result};
use crate::execution::RunRecord;
use serde::{Deserialize, Serialize};

/// @ai:intent Category of a single enriched run, first matching rule wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunOutcome {
    NotSupported,
    Ignored,
    Timeout,
    ExpectedError,
    Memout,
    UnexpectedError,
    Incorrect,
    Solved,
}

impl RunOutcome {
    /// @ai:intent Classify one record in priority order
    /// @ai:effects pure
    pub fn classify(record: &RunRecord) -> Self {
        let flag = |value: Option<bool>| value.unwrap_or(false);

        if !record.is_supported() {
            RunOutcome::NotSupported
        } else if flag(record.ignored) {
            RunOutcome::Ignored
        } else if flag(record.timeout) {
            RunOutcome::Timeout
        } else if flag(record.expected_error) {
            RunOutcome::ExpectedError
        } else if flag(record.memout) {
            RunOutcome::Memout
        } else if flag(record.execution_error) {
            RunOutcome::UnexpectedError
        } else if record.result_correct == Some(false) {
            RunOutcome::Incorrect
        } else {
            RunOutcome::Solved
        }
    }
}

/// @ai:intent Counters and solved-run metrics for N runs sharing one identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    pub num_runs: usize,
    pub num_not_supported: usize,
    pub num_ignored: usize,
    pub num_timeout: usize,
    pub num_expected_error: usize,
    pub num_memout: usize,
    pub num_unexpected_error: usize,
    pub num_incorrect: usize,
    /// Wall times of solved runs
    pub runtimes: Vec<f64>,
    pub iterations: Vec<u64>,
    /// Wall times of all runs that have one
    pub walltimes: Vec<f64>,
    pub return_codes: Vec<i32>,
}

impl CombinedResult {
    /// @ai:intent Build the combined result for a batch of runs
    /// @ai:pre all records share one tool, configuration and benchmark
    /// @ai:post not-supported and ignored counts are each 0 or N
    /// @ai:effects pure
    pub fn from_records(records: &[RunRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(BenchError::Consistency("Empty array of results".to_string()));
        }

        let mut combined = Self {
            num_runs: records.len(),
            ..Default::default()
        };

        for record in records {
            match RunOutcome::classify(record) {
                RunOutcome::NotSupported => combined.num_not_supported += 1,
                RunOutcome::Ignored => combined.num_ignored += 1,
                RunOutcome::Timeout => combined.num_timeout += 1,
                RunOutcome::ExpectedError => combined.num_expected_error += 1,
                RunOutcome::Memout => combined.num_memout += 1,
                RunOutcome::UnexpectedError => combined.num_unexpected_error += 1,
                RunOutcome::Incorrect => combined.num_incorrect += 1,
                RunOutcome::Solved => {
                    let runtime = record.wallclock_time.ok_or_else(|| {
                        BenchError::Consistency(format!(
                            "Missing wallclock time in solved run {}",
                            describe(record)
                        ))
                    })?;
                    let iterations = record.iterations.ok_or_else(|| {
                        BenchError::Consistency(format!(
                            "Missing iterations in solved run {}",
                            describe(record)
                        ))
                    })?;

                    combined.runtimes.push(runtime);
                    combined.iterations.push(iterations);
                }
            }

            if let Some(walltime) = record.wallclock_time {
                combined.walltimes.push(walltime);
            }

            if let Some(codes) = &record.return_codes {
                combined.return_codes.extend(codes);
            }
        }

        for count in [combined.num_not_supported, combined.num_ignored] {
            if count != 0 && count != records.len() {
                return Err(BenchError::Consistency(format!(
                    "{} not supported, {} ignored, {} total",
                    combined.num_not_supported,
                    combined.num_ignored,
                    records.len()
                )));
            }
        }

        Ok(combined)
    }

    /// @ai:intent Mean wall time of solved runs, `None` when nothing was solved
    /// @ai:effects pure
    pub fn average_runtime(&self) -> Option<f64> {
        if self.runtimes.is_empty() {
            return None;
        }

        Some(self.runtimes.iter().sum::<f64>() / self.runtimes.len() as f64)
    }

    /// @ai:intent Mean iteration count of solved runs, `None` when nothing was solved
    /// @ai:effects pure
    pub fn average_iterations(&self) -> Option<f64> {
        if self.iterations.is_empty() {
            return None;
        }

        Some(self.iterations.iter().map(|&i| i as f64).sum::<f64>() / self.iterations.len() as f64)
    }

    /// @ai:intent All exceptional counters are zero
    /// @ai:effects pure
    pub fn is_solved(&self) -> bool {
        self.num_not_supported
            + self.num_ignored
            + self.num_timeout
            + self.num_expected_error
            + self.num_memout
            + self.num_unexpected_error
            + self.num_incorrect
            == 0
    }

    /// @ai:intent Dominant category for reports; solved only when every run was
    /// @ai:effects pure
    pub fn outcome(&self) -> RunOutcome {
        let ordered = [
            (self.num_not_supported, RunOutcome::NotSupported),
            (self.num_ignored, RunOutcome::Ignored),
            (self.num_timeout, RunOutcome::Timeout),
            (self.num_expected_error, RunOutcome::ExpectedError),
            (self.num_memout, RunOutcome::Memout),
            (self.num_unexpected_error, RunOutcome::UnexpectedError),
            (self.num_incorrect, RunOutcome::Incorrect),
        ];

        ordered
            .into_iter()
            .find(|(count, _)| *count > 0)
            .map(|(_, outcome)| outcome)
            .unwrap_or(RunOutcome::Solved)
    }
}

fn describe(record: &RunRecord) -> String {
    format!(
        "{}.{}.{}.run{}",
        record.tool, record.configuration_id, record.benchmark_id, record.run_id
    )
}
