//! @ai:module:intent Process supervision for benchmark invocations
//! @ai:module:layer application
//! @ai:module:public_api CommandRunner, InvocationExecutor, Invocation, ExecutionRecord, RunRecord

pub mod command;
pub mod executor;
pub mod invocation;
pub mod record;

pub use command::{CommandOutcome, CommandRunner, CommandRunnerTrait, ExitStatus, MockCommandRunner, ScriptedCommand};
pub use executor::{create_executor, InvocationExecutor};
pub use invocation::{Invocation, InvocationIdentity};
pub use record::{CommandRecord, ExecutionRecord, RunRecord};
