//! @ai:module:intent Campaign-level statistics per tool configuration
//! @ai:module:layer application
//! @ai:module:public_api SummaryAggregator, SummaryAggregatorTrait, CampaignSummary, ConfigurationStats, BenchmarkOutcome
//! @ai:module:stateless true

use crate::error::Result;
use crate::execution::RunRecord;
use crate::metrics::combined::{CombinedResult, RunOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// @ai:intent Combined outcome of one benchmark for one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkOutcome {
    pub benchmark_id: String,
    pub outcome: RunOutcome,
    pub runs: usize,
    pub average_runtime: Option<f64>,
    pub average_iterations: Option<f64>,
}

/// @ai:intent Benchmark counts per outcome for one (tool, configuration) pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationStats {
    pub tool: String,
    pub configuration_id: String,
    pub benchmarks: usize,
    pub solved: usize,
    pub timeout: usize,
    pub memout: usize,
    /// Expected and unexpected errors
    pub errors: usize,
    pub incorrect: usize,
    pub not_supported: usize,
    pub ignored: usize,
    /// Mean over solved benchmarks of their average runtime
    pub mean_solved_runtime: Option<f64>,
    pub outcomes: Vec<BenchmarkOutcome>,
}

/// @ai:intent Summary of a whole log directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub timestamp: String,
    pub total_runs: usize,
    pub configurations: Vec<ConfigurationStats>,
}

/// @ai:intent Trait for summary aggregation
pub trait SummaryAggregatorTrait: Send + Sync {
    /// @ai:intent Aggregate grouped run records into a campaign summary
    fn aggregate(&self, groups: &BTreeMap<String, Vec<RunRecord>>) -> Result<CampaignSummary>;
}

/// @ai:intent Aggregates combined results into per-configuration statistics
pub struct SummaryAggregator;

impl SummaryAggregator {
    /// @ai:intent Create a new summary aggregator
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }

    /// @ai:intent Fold one benchmark outcome into the configuration counters
    /// @ai:effects pure
    fn record_outcome(stats: &mut ConfigurationStats, outcome: BenchmarkOutcome) {
        stats.benchmarks += 1;

        match outcome.outcome {
            RunOutcome::Solved => stats.solved += 1,
            RunOutcome::Timeout => stats.timeout += 1,
            RunOutcome::Memout => stats.memout += 1,
            RunOutcome::ExpectedError | RunOutcome::UnexpectedError => stats.errors += 1,
            RunOutcome::Incorrect => stats.incorrect += 1,
            RunOutcome::NotSupported => stats.not_supported += 1,
            RunOutcome::Ignored => stats.ignored += 1,
        }

        stats.outcomes.push(outcome);
    }
}

impl Default for SummaryAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryAggregatorTrait for SummaryAggregator {
    /// @ai:intent Aggregate grouped run records into a campaign summary
    /// @ai:post fails on the first inconsistent group
    /// @ai:effects pure
    fn aggregate(&self, groups: &BTreeMap<String, Vec<RunRecord>>) -> Result<CampaignSummary> {
        let mut by_configuration: BTreeMap<(String, String), ConfigurationStats> = BTreeMap::new();
        let mut total_runs = 0;

        for records in groups.values() {
            let Some(first) = records.first() else {
                continue;
            };

            let combined = CombinedResult::from_records(records)?;
            total_runs += combined.num_runs;

            let key = (first.tool.clone(), first.configuration_id.clone());
            let stats = by_configuration.entry(key).or_insert_with(|| ConfigurationStats {
                tool: first.tool.clone(),
                configuration_id: first.configuration_id.clone(),
                ..Default::default()
            });

            let outcome = BenchmarkOutcome {
                benchmark_id: first.benchmark_id.clone(),
                outcome: combined.outcome(),
                runs: combined.num_runs,
                average_runtime: combined.average_runtime(),
                average_iterations: combined.average_iterations(),
            };

            Self::record_outcome(stats, outcome);
        }

        let configurations = by_configuration
            .into_values()
            .map(|mut stats| {
                stats.mean_solved_runtime = average(
                    stats
                        .outcomes
                        .iter()
                        .filter(|o| o.outcome == RunOutcome::Solved)
                        .filter_map(|o| o.average_runtime),
                );
                stats
            })
            .collect();

        Ok(CampaignSummary {
            timestamp: chrono::Utc::now().to_rfc3339(),
            total_runs,
            configurations,
        })
    }
}

/// @ai:intent Average of an iterator of f64, `None` when empty
/// @ai:effects pure
fn average<I: Iterator<Item = f64>>(iter: I) -> Option<f64> {
    let (sum, count) = iter.fold((0.0, 0u32), |(s, c), v| (s + v, c + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(config: &str, benchmark: &str, walltime: f64, timeout: bool) -> RunRecord {
        RunRecord {
            tool: "storm".to_string(),
            configuration_id: config.to_string(),
            benchmark_id: benchmark.to_string(),
            run_id: 1,
            wallclock_time: Some(walltime),
            timeout: Some(timeout),
            execution_error: Some(false),
            supported: Some(true),
            iterations: (!timeout).then_some(5),
            ..Default::default()
        }
    }

    fn group(records: Vec<RunRecord>) -> BTreeMap<String, Vec<RunRecord>> {
        let mut groups: BTreeMap<String, Vec<RunRecord>> = BTreeMap::new();

        for r in records {
            let key = r.identity().group_key();
            groups.entry(key).or_default().push(r);
        }
        groups
    }

    #[test]
    fn test_aggregate_per_configuration() {
        let groups = group(vec![
            record("sparse", "brp", 2.0, false),
            record("sparse", "brp", 4.0, false),
            record("sparse", "csma", 10.0, true),
            record("hybrid", "brp", 1.0, false),
        ]);

        let summary = SummaryAggregator::new().aggregate(&groups).unwrap();

        assert_eq!(summary.total_runs, 4);
        assert_eq!(summary.configurations.len(), 2);

        let sparse = summary
            .configurations
            .iter()
            .find(|c| c.configuration_id == "sparse")
            .unwrap();
        assert_eq!(sparse.benchmarks, 2);
        assert_eq!(sparse.solved, 1);
        assert_eq!(sparse.timeout, 1);
        assert_eq!(sparse.mean_solved_runtime, Some(3.0));
    }

    #[test]
    fn test_no_solved_benchmarks_has_no_mean() {
        let groups = group(vec![record("sparse", "csma", 10.0, true)]);
        let summary = SummaryAggregator::new().aggregate(&groups).unwrap();

        assert_eq!(summary.configurations[0].mean_solved_runtime, None);
    }

    #[test]
    fn test_inconsistent_group_fails() {
        let mut unsupported = record("sparse", "brp", 1.0, false);
        unsupported.supported = Some(false);

        let groups = group(vec![unsupported, record("sparse", "brp", 1.0, false)]);
        assert!(SummaryAggregator::new().aggregate(&groups).is_err());
    }
}
