//! @ai:module:intent Benchmark campaign engine for probabilistic model checkers
//! @ai:module:layer application
//! @ai:module:public_api campaign, config, error, execution, metrics, numeric, postprocess, report, verify

pub mod campaign;
pub mod config;
pub mod error;
pub mod execution;
pub mod metrics;
pub mod numeric;
pub mod postprocess;
pub mod report;
pub mod verify;

pub use config::CampaignConfig;
pub use error::{BenchError, Result};
pub use execution::{CommandRunner, Invocation, InvocationExecutor, RunRecord};
pub use metrics::{CombinedResult, SummaryAggregator};
pub use numeric::{ExactValue, ReferenceResult, ToolResult};
pub use postprocess::{apply_verdict, MemoutEvidence, MemoutRule, PostProcessor};
pub use report::JsonReporter;
pub use verify::{CorrectnessVerifier, CorrectnessVerifierTrait, VerificationPolicy, Verdict};
