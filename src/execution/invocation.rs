//! @ai:module:intent Benchmark invocation identity and command list
//! @ai:module:layer domain
//! @ai:module:public_api Invocation, InvocationIdentity
//! @ai:module:stateless true

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};

/// Separator between identity components in identifiers and log file names
pub const IDENTITY_SEPARATOR: char = '.';

/// @ai:intent One benchmark request: a tool configuration applied to a benchmark, with its commands
/// @ai:effects pure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "InvocationData")]
pub struct Invocation {
    pub benchmark_id: String,
    pub tool: String,
    pub configuration_id: String,
    #[serde(rename = "invocation-note")]
    pub note: String,
    pub commands: Vec<String>,
    /// Seconds for all commands combined; `None` means unlimited
    pub time_limit: Option<f64>,
    pub run_id: u32,
}

/// Persisted form, validated before it becomes an `Invocation`
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct InvocationData {
    benchmark_id: String,
    tool: String,
    configuration_id: String,
    #[serde(rename = "invocation-note", default)]
    note: String,
    commands: Vec<String>,
    #[serde(default)]
    time_limit: Option<f64>,
    #[serde(default = "default_run_id")]
    run_id: u32,
}

fn default_run_id() -> u32 {
    1
}

impl TryFrom<InvocationData> for Invocation {
    type Error = BenchError;

    fn try_from(data: InvocationData) -> Result<Self> {
        let invocation = Invocation {
            benchmark_id: data.benchmark_id,
            tool: data.tool,
            configuration_id: data.configuration_id,
            note: data.note,
            commands: data.commands,
            time_limit: data.time_limit,
            run_id: data.run_id,
        };

        invocation.validate()?;
        Ok(invocation)
    }
}

/// @ai:intent Identity components recovered from an identifier or log file name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvocationIdentity {
    pub tool: String,
    pub configuration_id: String,
    pub benchmark_id: String,
    pub run_id: Option<u32>,
}

impl Invocation {
    /// @ai:intent Create an invocation without commands; fill it with `add_command`
    /// @ai:effects pure
    pub fn new(tool: &str, configuration_id: &str, benchmark_id: &str, run_id: u32) -> Self {
        Self {
            benchmark_id: benchmark_id.to_string(),
            tool: tool.to_string(),
            configuration_id: configuration_id.to_string(),
            note: String::new(),
            commands: Vec::new(),
            time_limit: None,
            run_id,
        }
    }

    /// @ai:effects pure
    pub fn with_note(mut self, note: &str) -> Self {
        self.note = note.to_string();
        self
    }

    /// @ai:effects pure
    pub fn with_time_limit(mut self, time_limit: Option<f64>) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// @ai:intent Append a command line to the sequence
    /// @ai:effects state:write
    pub fn add_command(&mut self, command: &str) {
        self.commands.push(command.to_string());
    }

    /// @ai:intent Check identity components and the command list
    /// @ai:post Ok iff tool and configuration contain no separator and at least one command exists
    /// @ai:effects pure
    pub fn validate(&self) -> Result<()> {
        self.identifier_no_run_id()?;

        if self.commands.is_empty() {
            return Err(BenchError::Config(format!(
                "No command defined for invocation '{}'",
                self.identifier_no_run_id()?
            )));
        }

        Ok(())
    }

    /// @ai:intent `<tool>.<configuration>.<benchmark>`, shared by all repetitions
    /// @ai:effects pure
    pub fn identifier_no_run_id(&self) -> Result<String> {
        if self.tool.contains(IDENTITY_SEPARATOR) {
            return Err(BenchError::Config(format!(
                "Tool name '{}' contains a '{}'",
                self.tool, IDENTITY_SEPARATOR
            )));
        }

        if self.configuration_id.contains(IDENTITY_SEPARATOR) {
            return Err(BenchError::Config(format!(
                "Configuration id '{}' contains a '{}'",
                self.configuration_id, IDENTITY_SEPARATOR
            )));
        }

        Ok(format!(
            "{}{sep}{}{sep}{}",
            self.tool,
            self.configuration_id,
            self.benchmark_id,
            sep = IDENTITY_SEPARATOR
        ))
    }

    /// @ai:intent `<tool>.<configuration>.<benchmark>.run<run-id>`, used as log file stem
    /// @ai:effects pure
    pub fn identifier(&self) -> Result<String> {
        Ok(format!("{}{}run{}", self.identifier_no_run_id()?, IDENTITY_SEPARATOR, self.run_id))
    }
}

impl InvocationIdentity {
    /// @ai:intent Split an identifier back into its components; the benchmark id may contain dots
    /// @ai:effects pure
    pub fn parse(identifier: &str) -> Result<Self> {
        let mut parts = identifier.splitn(3, IDENTITY_SEPARATOR);

        let (Some(tool), Some(configuration_id), Some(rest)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(BenchError::parse(identifier, "expected <tool>.<configuration>.<benchmark>"));
        };

        if tool.is_empty() || configuration_id.is_empty() || rest.is_empty() {
            return Err(BenchError::parse(identifier, "empty identity component"));
        }

        let run_suffix = rest.rsplit_once(IDENTITY_SEPARATOR).and_then(|(benchmark, suffix)| {
            suffix
                .strip_prefix("run")
                .and_then(|n| n.parse::<u32>().ok())
                .map(|run_id| (benchmark, run_id))
        });

        let (benchmark_id, run_id) = match run_suffix {
            Some((benchmark, run_id)) => (benchmark, Some(run_id)),
            None => (rest, None),
        };

        Ok(Self {
            tool: tool.to_string(),
            configuration_id: configuration_id.to_string(),
            benchmark_id: benchmark_id.to_string(),
            run_id,
        })
    }

    /// @ai:intent Identity without the run component, used to group repetitions
    /// @ai:effects pure
    pub fn group_key(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.tool,
            self.configuration_id,
            self.benchmark_id,
            sep = IDENTITY_SEPARATOR
        )
    }
}
