//! @ai:module:intent CLI for model checker benchmark campaigns
//! @ai:module:layer presentation

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mcbench::{
    campaign::{
        apply_time_limits, check_invocations, expand_repetitions, gather_records,
        load_invocations, load_parsed_results, load_references, merge_invocation_files,
        postprocess_logs, run_interruptible, save_invocations, select_invocation,
    },
    config::CampaignConfig,
    execution::create_executor,
    metrics::{CampaignSummary, SummaryAggregator, SummaryAggregatorTrait},
    postprocess::PostProcessor,
    report::{JsonReporter, JsonReporterTrait},
    verify::CorrectnessVerifier,
};
use std::path::PathBuf;

const DEFAULT_CONFIG_FILE: &str = "mcbench.toml";

#[derive(Parser)]
#[command(name = "mcbench")]
#[command(about = "Benchmark campaign runner for probabilistic model checkers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute invocations and write logs and records
    Run {
        /// JSON file with the list of invocations
        invocations: PathBuf,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only run the invocation with this 0-based index
        #[arg(short, long)]
        index: Option<usize>,

        /// Override the logs directory
        #[arg(short, long)]
        logs_dir: Option<PathBuf>,

        /// Override the time limit of every invocation in seconds, 0 for none
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Run each command once with a short budget before the timed run
        #[arg(long)]
        warm_up: bool,
    },

    /// Check invocation identifiers for validity and uniqueness
    Check {
        /// JSON file with the list of invocations
        invocations: PathBuf,
    },

    /// Merge several invocation files into one
    Merge {
        /// Invocation files, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Verify parsed results in a logs directory against reference results
    Verify {
        /// JSON object mapping benchmark ids to reference results
        #[arg(short, long)]
        references: PathBuf,

        /// JSON object mapping invocation identifiers to parsed results (null when none was found)
        #[arg(short, long)]
        parsed: PathBuf,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the logs directory
        #[arg(short, long)]
        logs_dir: Option<PathBuf>,
    },

    /// Combine repeated runs and write campaign statistics
    Summarize {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the logs directory
        #[arg(short, long)]
        logs_dir: Option<PathBuf>,

        /// Override the statistics file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mcbench=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            invocations,
            config,
            index,
            logs_dir,
            time_limit,
            warm_up,
        } => {
            run_campaign(RunArgs {
                invocations,
                config,
                index,
                logs_dir,
                time_limit,
                warm_up,
            })
            .await
        }
        Commands::Check { invocations } => check(invocations),
        Commands::Merge { inputs, output } => merge(inputs, output),
        Commands::Verify {
            references,
            parsed,
            config,
            logs_dir,
        } => verify(references, parsed, config, logs_dir),
        Commands::Summarize {
            config,
            logs_dir,
            output,
        } => summarize(config, logs_dir, output),
        Commands::Init { output } => init_config(output),
    }
}

struct RunArgs {
    invocations: PathBuf,
    config: Option<PathBuf>,
    index: Option<usize>,
    logs_dir: Option<PathBuf>,
    time_limit: Option<f64>,
    warm_up: bool,
}

/// @ai:intent Run a campaign until done or interrupted
/// @ai:effects process, fs:write
async fn run_campaign(args: RunArgs) -> Result<()> {
    let mut config = load_or_default_config(args.config)?;

    if let Some(logs_dir) = args.logs_dir {
        config.paths.logs_dir = logs_dir;
    }
    config.run.warm_up |= args.warm_up;

    let mut invocations = load_invocations(&args.invocations)?;

    if config.run.repetitions > 1 {
        invocations = expand_repetitions(&invocations, config.run.repetitions);
    }

    if let Some(index) = args.index {
        invocations = select_invocation(invocations, index)?;
    }

    apply_time_limits(&mut invocations, args.time_limit, config.run.time_limit());

    let problems = check_invocations(&invocations);

    if !problems.is_empty() {
        for problem in &problems {
            tracing::error!("{}", problem);
        }
        bail!("{} invalid invocations, nothing was executed", problems.len());
    }

    tracing::info!(
        "Executing {} invocations, logs in {}",
        invocations.len(),
        config.paths.logs_dir.display()
    );

    let executor = create_executor(&config);

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let stats =
        run_interruptible(&executor, &invocations, &config.paths.logs_dir, interrupt).await?;

    println!();
    println!("Executed {} invocations", stats.executed);
    println!("  Timeouts:        {}", stats.timeouts);
    println!("  Execution errors: {}", stats.errors);

    if stats.failed > 0 {
        println!("  Not persisted:   {}", stats.failed);
    }

    Ok(())
}

/// @ai:intent Check invocation identifiers
/// @ai:effects fs:read
fn check(path: PathBuf) -> Result<()> {
    let invocations = load_invocations(&path)?;
    let problems = check_invocations(&invocations);

    if problems.is_empty() {
        println!("All {} invocations are valid.", invocations.len());
        return Ok(());
    }

    for problem in &problems {
        println!("  - {}", problem);
    }
    bail!("{} problems found in {}", problems.len(), path.display())
}

/// @ai:intent Merge invocation files
/// @ai:effects fs:read, fs:write
fn merge(inputs: Vec<PathBuf>, output: PathBuf) -> Result<()> {
    let merged = merge_invocation_files(&inputs)?;
    save_invocations(&merged, &output)?;

    println!("Merged {} invocations into {}", merged.len(), output.display());
    Ok(())
}

/// @ai:intent Post-process and verify all records in the logs directory
/// @ai:effects fs:read, fs:write
fn verify(
    references: PathBuf,
    parsed: PathBuf,
    config: Option<PathBuf>,
    logs_dir: Option<PathBuf>,
) -> Result<()> {
    let config = load_or_default_config(config)?;
    let logs_dir = logs_dir.unwrap_or(config.paths.logs_dir.clone());

    let policy = config.verification.policy()?;
    let references = load_references(&references)?;
    let parsed = load_parsed_results(&parsed)?;
    let processor = PostProcessor::new(CorrectnessVerifier::new(policy));

    let processed = postprocess_logs(&logs_dir, &parsed, &references, &processor)?;

    println!("Verified {} records in {}", processed, logs_dir.display());
    Ok(())
}

/// @ai:intent Summarize a logs directory and write statistics
/// @ai:effects fs:read, fs:write
fn summarize(config: Option<PathBuf>, logs_dir: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let config = load_or_default_config(config)?;
    let logs_dir = logs_dir.unwrap_or(config.paths.logs_dir.clone());
    let output = output.unwrap_or(config.paths.stats_file.clone());

    let groups = gather_records(&logs_dir)?;
    let summary = SummaryAggregator::new().aggregate(&groups)?;

    JsonReporter::new().generate(&summary, &output)?;
    print_summary(&summary);
    Ok(())
}

/// @ai:intent Initialize default configuration file
/// @ai:effects fs:write
fn init_config(output: PathBuf) -> Result<()> {
    let config = CampaignConfig::default();
    config.save(&output)?;
    println!("Configuration saved to {}", output.display());
    Ok(())
}

/// @ai:intent Load configuration or use defaults
/// @ai:effects fs:read
fn load_or_default_config(path: Option<PathBuf>) -> Result<CampaignConfig> {
    let path = path.or_else(|| {
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        default_path.exists().then_some(default_path)
    });

    match path {
        Some(p) => CampaignConfig::load(&p)
            .with_context(|| format!("Failed to load configuration from {}", p.display())),
        None => Ok(CampaignConfig::default()),
    }
}

/// @ai:intent Print per-configuration outcome counts
/// @ai:effects io
fn print_summary(summary: &CampaignSummary) {
    println!();
    println!("Campaign Summary ({} runs)", summary.total_runs);
    println!("=========================");
    println!();
    println!(
        "{:<30} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>10}",
        "Tool.Configuration", "Solved", "TO", "MO", "Error", "Incorr", "N/S", "Avg time"
    );
    println!("{}", "-".repeat(90));

    for stats in &summary.configurations {
        let average = stats
            .mean_solved_runtime
            .map(|t| format!("{:.2}s", t))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<30} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>10}",
            format!("{}.{}", stats.tool, stats.configuration_id),
            stats.solved,
            stats.timeout,
            stats.memout,
            stats.errors,
            stats.incorrect,
            stats.not_supported,
            average
        );
    }
    println!();
}
