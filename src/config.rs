//! @ai:module:intent Configuration structs for benchmark campaigns
//! @ai:module:layer infrastructure
//! @ai:module:public_api CampaignConfig, RunConfig, VerificationConfig, PathConfig
//! @ai:module:stateless true

use crate::error::{BenchError, Result};
use crate::numeric::ExactValue;
use crate::verify::VerificationPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Goal precision value that requires results to match the reference exactly
pub const EXACT_PRECISION: &str = "exact";

/// @ai:intent Main configuration for a benchmark campaign
/// @ai:effects pure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub paths: PathConfig,
}

/// @ai:intent Execution settings applied to generated and loaded invocations
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Seconds per invocation; 0 disables the limit
    #[serde(default = "default_time_limit")]
    pub time_limit: f64,
    #[serde(default)]
    pub warm_up: bool,
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
}

/// @ai:intent Precision policy for result verification
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Numeric literal such as `1e-3` or `1/1000`, or `exact`
    #[serde(default = "default_goal_precision")]
    pub goal_precision: String,
    #[serde(default = "default_relative_precision")]
    pub relative_precision: bool,
}

/// @ai:intent Path configuration for logs and tool binaries
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    /// Substituted for `$MCBENCH_DIR` in command lines
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
    #[serde(default = "default_stats_file")]
    pub stats_file: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_limit: default_time_limit(),
            warm_up: false,
            repetitions: default_repetitions(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            goal_precision: default_goal_precision(),
            relative_precision: default_relative_precision(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            logs_dir: default_logs_dir(),
            root_dir: None,
            stats_file: default_stats_file(),
        }
    }
}

fn default_time_limit() -> f64 {
    2700.0
}

fn default_repetitions() -> u32 {
    1
}

fn default_goal_precision() -> String {
    "1e-3".to_string()
}

fn default_relative_precision() -> bool {
    true
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_stats_file() -> PathBuf {
    PathBuf::from("stats.json")
}

impl RunConfig {
    /// @ai:intent Time limit handed to invocations, `None` when disabled
    /// @ai:effects pure
    pub fn time_limit(&self) -> Option<f64> {
        (self.time_limit > 0.0).then_some(self.time_limit)
    }
}

impl CampaignConfig {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| BenchError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// @ai:intent Save configuration to a TOML file
    /// @ai:effects fs:write
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl VerificationConfig {
    /// @ai:intent Build the immutable policy handed to the verifier
    /// @ai:post a malformed goal precision is a parse error, never coerced to zero
    /// @ai:effects pure
    pub fn policy(&self) -> Result<VerificationPolicy> {
        let precision_threshold = if self.goal_precision.trim().eq_ignore_ascii_case(EXACT_PRECISION) {
            None
        } else {
            Some(ExactValue::parse(&self.goal_precision)?)
        };

        Ok(VerificationPolicy {
            relative_error_mode: self.relative_precision,
            precision_threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_reference_settings() {
        let config = CampaignConfig::default();

        assert_eq!(config.run.time_limit(), Some(2700.0));
        assert_eq!(config.paths.logs_dir, PathBuf::from("logs"));
        assert_eq!(config.verification.policy().unwrap(), VerificationPolicy::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CampaignConfig = toml::from_str(
            r#"
            [run]
            warm_up = true

            [verification]
            relative_precision = false
            goal_precision = "1/1000000"
            "#,
        )
        .unwrap();

        assert!(config.run.warm_up);
        assert_eq!(config.run.repetitions, 1);

        let policy = config.verification.policy().unwrap();
        assert!(!policy.relative_error_mode);
        assert_eq!(policy.precision_threshold, Some(ExactValue::power_of_ten_inverse(6)));
    }

    #[test]
    fn test_invalid_goal_precision_is_rejected() {
        let verification = VerificationConfig {
            goal_precision: "tight".to_string(),
            relative_precision: true,
        };
        assert!(verification.policy().is_err());
    }

    #[test]
    fn test_exact_precision_and_disabled_time_limit() {
        let config: CampaignConfig = toml::from_str(
            r#"
            [run]
            time_limit = 0

            [verification]
            goal_precision = "exact"
            "#,
        )
        .unwrap();

        assert_eq!(config.run.time_limit(), None);
        assert_eq!(config.verification.policy().unwrap().precision_threshold, None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcbench.toml");

        let mut config = CampaignConfig::default();
        config.paths.root_dir = Some(PathBuf::from("/opt/tools"));
        config.save(&path).unwrap();

        let loaded = CampaignConfig::load(&path).unwrap();
        assert_eq!(loaded.paths.root_dir, Some(PathBuf::from("/opt/tools")));
        assert_eq!(loaded.verification.goal_precision, "1e-3");

        std::fs::write(&path, "[run]\nwarm_up = \"yes\"\n").unwrap();
        assert!(matches!(CampaignConfig::load(&path), Err(BenchError::TomlRead(_))));
    }
}
