//! @ai:module:intent Supervise a single external process under a wall-clock budget
//! @ai:module:layer infrastructure
//! @ai:module:public_api CommandRunner, CommandRunnerTrait, CommandOutcome, ExitStatus, MockCommandRunner
//! @ai:module:stateless true

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Placeholder in command lines that expands to the configured root directory
pub const ROOT_DIR_TOKEN: &str = "$MCBENCH_DIR";

/// Budget of the discarded cache-priming run
pub const WARM_UP_BUDGET: Duration = Duration::from_secs(5);

/// @ai:intent How a supervised command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitStatus {
    /// Process ran to completion; negative codes mean termination by that signal
    Exited(i32),
    /// Watchdog killed the process because the budget ran out
    Killed,
    /// Process could not be spawned
    LaunchFailed,
}

impl ExitStatus {
    /// Return code recorded for commands killed due to a timeout
    pub const TIMEOUT_CODE: i32 = -9;

    /// Return code recorded for commands whose binary could not be launched
    pub const LAUNCH_FAILURE_CODE: i32 = 127;

    /// @ai:intent Integer code as persisted in the return-codes list
    /// @ai:effects pure
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Exited(code) => *code,
            ExitStatus::Killed => Self::TIMEOUT_CODE,
            ExitStatus::LaunchFailed => Self::LAUNCH_FAILURE_CODE,
        }
    }

    /// @ai:effects pure
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExitStatus::Killed)
    }

    /// @ai:intent Whether the command completed without error
    /// @ai:effects pure
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Exited(0))
    }
}

/// @ai:intent Captured result of one supervised command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    /// stdout followed by stderr (after a banner line) when stderr is non-empty
    pub output: String,
    /// Seconds
    pub wall_time: f64,
    pub status: ExitStatus,
}

/// @ai:intent Trait for running one command line under an optional budget
#[allow(async_fn_in_trait)]
pub trait CommandRunnerTrait: Send + Sync {
    /// @ai:intent Run the command, killing it once the budget is spent
    async fn run(&self, command_line: &str, budget: Option<Duration>) -> CommandOutcome;
}

/// @ai:intent Launches tool processes, captures output and enforces deadlines
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    warm_up: bool,
    root_dir: Option<PathBuf>,
}

impl CommandRunner {
    /// @ai:intent Create a runner without warm-up and without root directory expansion
    /// @ai:effects pure
    pub fn new() -> Self {
        Self::default()
    }

    /// @ai:intent Run each command once with a short budget before the timed run
    /// @ai:effects pure
    pub fn with_warm_up(mut self, warm_up: bool) -> Self {
        self.warm_up = warm_up;
        self
    }

    /// @ai:intent Directory substituted for `$MCBENCH_DIR` in command lines
    /// @ai:effects pure
    pub fn with_root_dir(mut self, root_dir: Option<PathBuf>) -> Self {
        self.root_dir = root_dir;
        self
    }

    /// @ai:intent Split a command line into argv, expanding the root token and a leading `~`
    /// @ai:effects env:read
    pub fn expand(&self, command_line: &str) -> Vec<String> {
        let line = match &self.root_dir {
            Some(root) => command_line.replace(ROOT_DIR_TOKEN, &root.to_string_lossy()),
            None => command_line.to_string(),
        };

        let mut argv: Vec<String> = line.split_whitespace().map(str::to_string).collect();

        if let Some(program) = argv.first_mut() {
            if let Some(rest) = program.strip_prefix("~/") {
                if let Some(home) = std::env::var_os("HOME") {
                    *program = PathBuf::from(home).join(rest).to_string_lossy().to_string();
                }
            }
        }

        argv
    }

    /// @ai:intent Spawn the process once and wait for it, racing the watchdog
    /// @ai:effects io, process
    async fn run_once(&self, argv: &[String], budget: Option<Duration>) -> CommandOutcome {
        let start = Instant::now();

        let Some((program, args)) = argv.split_first() else {
            return CommandOutcome {
                output: "Error when executing the command:\nempty command line\n".to_string(),
                wall_time: 0.0,
                status: ExitStatus::LaunchFailed,
            };
        };

        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("Failed to launch '{}': {}", program, e);
                return CommandOutcome {
                    output: format!("Error when executing the command:\n{e}\n"),
                    wall_time: start.elapsed().as_secs_f64(),
                    status: ExitStatus::LaunchFailed,
                };
            }
        };

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let supervise = async {
            let waited = match budget.filter(|b| !b.is_zero()) {
                Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                    Ok(waited) => Some(waited),
                    Err(_) => {
                        tracing::debug!("Budget of {:?} exhausted, killing '{}'", limit, program);

                        if let Err(e) = child.kill().await {
                            tracing::warn!("Failed to kill '{}': {}", program, e);
                        }
                        None
                    }
                },
                None => Some(child.wait().await),
            };

            (waited, start.elapsed().as_secs_f64())
        };

        let ((waited, wall_time), stdout, stderr) =
            tokio::join!(supervise, read_pipe(stdout_pipe), read_pipe(stderr_pipe));

        let mut output = String::new();

        let status = match waited {
            None => ExitStatus::Killed,
            Some(Ok(status)) => ExitStatus::Exited(exit_code(status)),
            Some(Err(e)) => {
                output.push_str(&format!("Error when executing the command:\n{e}\n"));
                ExitStatus::LaunchFailed
            }
        };

        output.push_str(&String::from_utf8_lossy(&stdout));

        if !stderr.is_empty() {
            output.push_str(&stderr_banner());
            output.push_str(&String::from_utf8_lossy(&stderr));
        }

        tracing::debug!(
            "'{}' finished in {:.3}s with {:?} ({} bytes of output)",
            program,
            wall_time,
            status,
            output.len()
        );

        CommandOutcome {
            output,
            wall_time,
            status,
        }
    }
}

impl CommandRunnerTrait for CommandRunner {
    /// @ai:intent Run a command line, optionally after a discarded warm-up run
    /// @ai:effects io, process
    async fn run(&self, command_line: &str, budget: Option<Duration>) -> CommandOutcome {
        let argv = self.expand(command_line);

        if self.warm_up {
            let warm = self.run_once(&argv, Some(WARM_UP_BUDGET)).await;
            tracing::debug!("Warm-up run ended with {:?}", warm.status);
        }

        self.run_once(&argv, budget).await
    }
}

/// @ai:intent Separator placed between captured stdout and stderr
/// @ai:effects pure
pub fn stderr_banner() -> String {
    format!("\n{}Output to stderr{}\n", "#".repeat(30), "#".repeat(30))
}

/// @ai:intent Drain a child pipe to the end
/// @ai:effects io
async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buffer = Vec::new();

    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buffer).await {
            tracing::warn!("Failed to read process output: {}", e);
        }
    }

    buffer
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// @ai:intent Scripted behaviour of one command for the mock runner
#[derive(Debug, Clone)]
pub struct ScriptedCommand {
    /// Seconds the command would need to finish
    pub duration: f64,
    pub exit_code: i32,
    pub output: String,
    pub launch_fails: bool,
}

impl ScriptedCommand {
    /// @ai:effects pure
    pub fn exits(duration: f64, exit_code: i32) -> Self {
        Self {
            duration,
            exit_code,
            output: String::new(),
            launch_fails: false,
        }
    }

    /// @ai:effects pure
    pub fn missing_binary() -> Self {
        Self {
            duration: 0.0,
            exit_code: 0,
            output: String::new(),
            launch_fails: true,
        }
    }

    /// @ai:effects pure
    pub fn with_output(mut self, output: &str) -> Self {
        self.output = output.to_string();
        self
    }
}

/// @ai:intent Mock runner for testing: simulates durations against budgets without spawning
pub struct MockCommandRunner {
    script: HashMap<String, ScriptedCommand>,
    calls: Mutex<Vec<(String, Option<Duration>)>>,
}

impl MockCommandRunner {
    /// @ai:intent Create a mock runner with per-command behaviour
    /// @ai:effects pure
    pub fn new(script: impl IntoIterator<Item = (String, ScriptedCommand)>) -> Self {
        Self {
            script: script.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// @ai:intent Commands run so far together with the budget each received
    /// @ai:effects state:read
    pub fn calls(&self) -> Vec<(String, Option<Duration>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CommandRunnerTrait for MockCommandRunner {
    /// @ai:intent Return the scripted outcome, timing out when the duration exceeds the budget
    /// @ai:effects state:write
    async fn run(&self, command_line: &str, budget: Option<Duration>) -> CommandOutcome {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((command_line.to_string(), budget));
        }

        let Some(scripted) = self.script.get(command_line) else {
            return CommandOutcome {
                output: format!("Error when executing the command:\nunknown command {command_line}\n"),
                wall_time: 0.0,
                status: ExitStatus::LaunchFailed,
            };
        };

        if scripted.launch_fails {
            return CommandOutcome {
                output: "Error when executing the command:\nNo such file or directory\n".to_string(),
                wall_time: 0.0,
                status: ExitStatus::LaunchFailed,
            };
        }

        match budget.filter(|b| !b.is_zero()) {
            Some(limit) if scripted.duration > limit.as_secs_f64() => CommandOutcome {
                output: scripted.output.clone(),
                wall_time: limit.as_secs_f64(),
                status: ExitStatus::Killed,
            },
            _ => CommandOutcome {
                output: scripted.output.clone(),
                wall_time: scripted.duration,
                status: ExitStatus::Exited(scripted.exit_code),
            },
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let runner = CommandRunner::new();
        let outcome = runner.run("echo hello benchmark", None).await;

        assert_eq!(outcome.status, ExitStatus::Exited(0));
        assert!(outcome.output.contains("hello benchmark"));
        assert!(!outcome.output.contains("Output to stderr"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_code() {
        let runner = CommandRunner::new();
        let outcome = runner.run("false", Some(Duration::from_secs(10))).await;

        assert_eq!(outcome.status, ExitStatus::Exited(1));
        assert!(!outcome.status.success());
    }

    #[tokio::test]
    async fn test_stderr_is_appended_after_banner() {
        let runner = CommandRunner::new();
        let outcome = runner.run("ls /nonexistent-mcbench-path", None).await;

        assert!(!outcome.status.success());
        assert!(outcome.output.contains("Output to stderr"));
    }

    #[tokio::test]
    async fn test_watchdog_kills_long_command() {
        let runner = CommandRunner::new();
        let outcome = runner.run("sleep 5", Some(Duration::from_millis(300))).await;

        assert_eq!(outcome.status, ExitStatus::Killed);
        assert_eq!(outcome.status.code(), -9);
        assert!(outcome.wall_time < 4.0);
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported_in_output() {
        let runner = CommandRunner::new();
        let outcome = runner.run("/nonexistent/mcbench-tool --help", None).await;

        assert_eq!(outcome.status, ExitStatus::LaunchFailed);
        assert!(outcome.output.starts_with("Error when executing the command"));
    }

    #[test]
    fn test_expand_root_dir_and_home() {
        let runner = CommandRunner::new().with_root_dir(Some(PathBuf::from("/opt/bench")));
        let argv = runner.expand("$MCBENCH_DIR/bin/storm  --prop  $MCBENCH_DIR/p.props");

        assert_eq!(argv, vec!["/opt/bench/bin/storm", "--prop", "/opt/bench/p.props"]);

        if let Some(home) = std::env::var_os("HOME") {
            let argv = runner.expand("~/bin/tool -v");
            assert_eq!(argv[0], PathBuf::from(home).join("bin/tool").to_string_lossy());
        }
    }

    #[tokio::test]
    async fn test_mock_runner_times_out_against_budget() {
        let runner = MockCommandRunner::new([("slow".to_string(), ScriptedCommand::exits(6.0, 0))]);
        let outcome = runner.run("slow", Some(Duration::from_secs(4))).await;

        assert_eq!(outcome.status, ExitStatus::Killed);
        assert!((outcome.wall_time - 4.0).abs() < 1e-9);
        assert_eq!(runner.calls().len(), 1);
    }
}
