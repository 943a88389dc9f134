//! @ai:module:intent Run the command sequence of one invocation under a shared time budget
//! @ai:module:layer application
//! @ai:module:public_api InvocationExecutor, create_executor
//! @ai:module:stateless false

use crate::config::CampaignConfig;
use crate::execution::command::{CommandRunner, CommandRunnerTrait, ExitStatus};
use crate::execution::invocation::Invocation;
use crate::execution::record::{CommandRecord, ExecutionRecord};
use std::sync::Arc;
use std::time::Duration;

/// @ai:intent Executes invocations command by command, aborting on timeout
pub struct InvocationExecutor<R: CommandRunnerTrait> {
    runner: Arc<R>,
}

impl<R: CommandRunnerTrait> InvocationExecutor<R> {
    /// @ai:intent Create an executor around a command runner
    /// @ai:effects pure
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }

    /// @ai:intent Run all commands of the invocation in order
    /// @ai:post timeout implies !error and return_codes ends with -9
    /// @ai:post wall_time is the sum over the commands that ran
    /// @ai:effects process
    pub async fn execute(&self, invocation: &Invocation) -> ExecutionRecord {
        let mut record = ExecutionRecord {
            invocation: invocation.clone(),
            commands: Vec::new(),
            wall_time: 0.0,
            timeout: false,
            error: false,
            return_codes: Vec::new(),
            logs: Vec::new(),
        };

        for command in &invocation.commands {
            let budget = remaining_budget(invocation.time_limit, record.wall_time);
            let outcome = self.runner.run(command, budget).await;

            record.wall_time += outcome.wall_time;

            let mut log = format!(
                "Command:\t{}\nRepetition:\t{}\nWallclock time:\t{}\nReturn code:\t{}\nOutput:\n{}\n",
                command,
                invocation.run_id,
                outcome.wall_time,
                outcome.status.code(),
                outcome.output
            );

            match outcome.status {
                ExitStatus::Killed => {
                    tracing::warn!(
                        "'{}' exceeded the time limit after {:.1}s",
                        command,
                        record.wall_time
                    );

                    log.push_str(&format!(
                        "\n{}\nComputation aborted after {} seconds since the total time limit of {} seconds was exceeded.\n",
                        "-".repeat(10),
                        record.wall_time,
                        invocation
                            .time_limit
                            .map(|limit| limit.to_string())
                            .unwrap_or_else(|| "none".to_string())
                    ));
                }
                ExitStatus::LaunchFailed => {
                    tracing::warn!("Could not launch '{}'", command);
                    record.error = true;
                }
                ExitStatus::Exited(code) => {
                    if code != 0 {
                        tracing::debug!("'{}' exited with code {}", command, code);
                    }
                    record.error |= code != 0;
                }
            }

            record.return_codes.push(outcome.status.code());
            record.logs.push(log);
            record.commands.push(CommandRecord {
                command: command.clone(),
                wall_time: outcome.wall_time,
                status: outcome.status,
                output: outcome.output,
            });

            if outcome.status.is_timeout() {
                record.timeout = true;
                record.error = false;
                break;
            }
        }

        record
    }
}

/// @ai:intent Budget left for the next command; an exhausted budget yields an immediate deadline
/// @ai:pre a limit that is unset or not positive means unlimited
/// @ai:effects pure
fn remaining_budget(time_limit: Option<f64>, consumed: f64) -> Option<Duration> {
    let limit = time_limit.filter(|limit| *limit > 0.0)?;
    let remaining = limit - consumed;

    if remaining <= 0.0 {
        return Some(Duration::from_nanos(1));
    }

    Duration::try_from_secs_f64(remaining).ok()
}

/// @ai:intent Create an executor backed by real processes, configured from the campaign file
/// @ai:effects pure
pub fn create_executor(config: &CampaignConfig) -> InvocationExecutor<CommandRunner> {
    let runner = CommandRunner::new()
        .with_warm_up(config.run.warm_up)
        .with_root_dir(config.paths.root_dir.clone());

    InvocationExecutor::new(Arc::new(runner))
}
