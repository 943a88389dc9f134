//! @ai:module:intent JSON report generation for campaign summaries
//! @ai:module:layer infrastructure
//! @ai:module:public_api JsonReporter, JsonReporterTrait
//! @ai:module:stateless true

use crate::metrics::CampaignSummary;
use anyhow::{Context, Result};
use std::path::Path;

/// @ai:intent Trait for JSON report generation
pub trait JsonReporterTrait: Send + Sync {
    /// @ai:intent Generate JSON report from a campaign summary
    fn generate(&self, summary: &CampaignSummary, output_path: &Path) -> Result<()>;
}

/// @ai:intent Writes campaign summaries as pretty-printed JSON
pub struct JsonReporter;

impl JsonReporter {
    /// @ai:intent Create a new JSON reporter
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporterTrait for JsonReporter {
    /// @ai:intent Generate JSON report to file, creating parent directories
    /// @ai:effects fs:write
    fn generate(&self, summary: &CampaignSummary, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        tracing::info!("Summary written to {}", output_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{BenchmarkOutcome, ConfigurationStats, RunOutcome};
    use tempfile::TempDir;

    #[test]
    fn test_generate_json_report() {
        let reporter = JsonReporter::new();
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("reports").join("stats.json");

        let summary = CampaignSummary {
            timestamp: "2026-01-19T00:00:00Z".to_string(),
            total_runs: 1,
            configurations: vec![ConfigurationStats {
                tool: "storm".to_string(),
                configuration_id: "sparse".to_string(),
                benchmarks: 1,
                solved: 1,
                mean_solved_runtime: Some(2.5),
                outcomes: vec![BenchmarkOutcome {
                    benchmark_id: "brp.16-2".to_string(),
                    outcome: RunOutcome::Solved,
                    runs: 1,
                    average_runtime: Some(2.5),
                    average_iterations: None,
                }],
                ..Default::default()
            }],
        };

        reporter.generate(&summary, &output).unwrap();
        assert!(output.exists());

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("brp.16-2"));
        assert!(content.contains("\"solved\""));
    }
}
