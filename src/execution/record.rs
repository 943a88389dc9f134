//! @ai:module:intent Per-command and per-invocation execution records, and their persisted JSON form
//! @ai:module:layer domain
//! @ai:module:public_api CommandRecord, ExecutionRecord, RunRecord
//! @ai:module:stateless true

use crate::error::{BenchError, Result};
use crate::execution::command::ExitStatus;
use crate::execution::invocation::{Invocation, InvocationIdentity};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// @ai:intent Outcome of one command of an invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRecord {
    pub command: String,
    pub wall_time: f64,
    pub status: ExitStatus,
    pub output: String,
}

/// @ai:intent Aggregate of all commands run for one invocation
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub invocation: Invocation,
    pub commands: Vec<CommandRecord>,
    /// Sum of wall times of commands actually run
    pub wall_time: f64,
    pub timeout: bool,
    /// Some completed command exited non-zero; always false on timeout
    pub error: bool,
    pub return_codes: Vec<i32>,
    pub logs: Vec<String>,
}

impl ExecutionRecord {
    /// @ai:intent Join per-command log sections with a horizontal rule
    /// @ai:effects pure
    pub fn concatenate_logs(&self) -> String {
        let rule = format!("\n{}\n", "#".repeat(40));
        self.logs.join(&rule)
    }

    /// @ai:intent Persisted form of the invocation and its execution results
    /// @ai:effects pure
    pub fn to_run_record(&self) -> RunRecord {
        let mut record = RunRecord::from_invocation(&self.invocation);

        record.wallclock_time = Some(self.wall_time);
        record.timeout = Some(self.timeout);
        record.execution_error = Some(self.error);
        record.return_codes = Some(self.return_codes.clone());
        record
    }
}

/// @ai:intent One JSON document per invocation run, enriched stage by stage
///
/// Invocation fields are always present. Execution fields appear once the
/// invocation ran; result fields once its log was post-processed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunRecord {
    pub benchmark_id: String,
    pub tool: String,
    pub configuration_id: String,
    #[serde(default)]
    pub invocation_note: String,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub time_limit: Option<f64>,
    #[serde(default = "default_run_id")]
    pub run_id: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallclock_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_codes: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_error: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_error: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memout: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_building_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_checking_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_solving_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

fn default_run_id() -> u32 {
    1
}

impl RunRecord {
    /// @ai:intent Record carrying only the invocation fields
    /// @ai:effects pure
    pub fn from_invocation(invocation: &Invocation) -> Self {
        Self {
            benchmark_id: invocation.benchmark_id.clone(),
            tool: invocation.tool.clone(),
            configuration_id: invocation.configuration_id.clone(),
            invocation_note: invocation.note.clone(),
            commands: invocation.commands.clone(),
            time_limit: invocation.time_limit,
            run_id: invocation.run_id,
            ..Default::default()
        }
    }

    /// @ai:intent Read a persisted record
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| BenchError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// @ai:intent Write the record as pretty JSON
    /// @ai:effects fs:write
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// @ai:intent Rebuild the invocation this record was produced from
    /// @ai:effects pure
    pub fn invocation(&self) -> Result<Invocation> {
        let mut invocation = Invocation::new(
            &self.tool,
            &self.configuration_id,
            &self.benchmark_id,
            self.run_id,
        )
        .with_note(&self.invocation_note)
        .with_time_limit(self.time_limit);

        for command in &self.commands {
            invocation.add_command(command);
        }

        invocation.validate()?;
        Ok(invocation)
    }

    /// @ai:effects pure
    pub fn identity(&self) -> InvocationIdentity {
        InvocationIdentity {
            tool: self.tool.clone(),
            configuration_id: self.configuration_id.clone(),
            benchmark_id: self.benchmark_id.clone(),
            run_id: Some(self.run_id),
        }
    }

    /// @ai:intent Records without a `supported` field count as supported
    /// @ai:effects pure
    pub fn is_supported(&self) -> bool {
        self.supported.unwrap_or(true)
    }
}
