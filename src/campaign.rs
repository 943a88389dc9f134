//! @ai:module:intent Drive whole campaigns: check, run, merge invocation lists and gather logs
//! @ai:module:layer application
//! @ai:module:public_api check_invocations, run_invocations, expand_repetitions, apply_time_limits, run_interruptible, merge_invocation_files, select_invocation, gather_records, load_parsed_results, postprocess_logs
//! @ai:module:stateless false

use crate::execution::{
    CommandRunnerTrait, ExecutionRecord, Invocation, InvocationExecutor, InvocationIdentity, RunRecord,
};
use crate::numeric::ReferenceResult;
use crate::postprocess::PostProcessor;
use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// @ai:intent Counts reported after a campaign run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub executed: usize,
    pub timeouts: usize,
    pub errors: usize,
    /// Invocations whose records could not be written
    pub failed: usize,
}

/// @ai:intent Load a JSON list of invocations
/// @ai:effects fs:read
pub fn load_invocations(path: &Path) -> Result<Vec<Invocation>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let invocations: Vec<Invocation> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse invocations in {}", path.display()))?;
    Ok(invocations)
}

/// @ai:intent Save a list of invocations as pretty JSON
/// @ai:effects fs:write
pub fn save_invocations(invocations: &[Invocation], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(invocations)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// @ai:intent Find invalid or duplicate identifiers
/// @ai:post empty result means every invocation can be run and logged under a unique name
/// @ai:effects pure
pub fn check_invocations(invocations: &[Invocation]) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();

    for (index, invocation) in invocations.iter().enumerate() {
        if let Err(e) = invocation.validate() {
            problems.push(format!("Invocation #{index}: {e}"));
            continue;
        }

        let identifier = match invocation.identifier() {
            Ok(identifier) => identifier,
            Err(e) => {
                problems.push(format!("Invocation #{index}: {e}"));
                continue;
            }
        };

        if !is_valid_file_stem(&identifier) {
            problems.push(format!(
                "Invocation #{index}: identifier '{identifier}' is not a valid file name"
            ));
        }

        if !seen.insert(identifier.clone()) {
            problems.push(format!(
                "Invocation #{index}: identifier '{identifier}' already exists"
            ));
        }
    }

    problems
}

fn is_valid_file_stem(identifier: &str) -> bool {
    !identifier.is_empty()
        && !identifier
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '\0') || c.is_whitespace())
}

/// @ai:intent Concatenate the invocation lists of several files, in order
/// @ai:effects fs:read
pub fn merge_invocation_files(paths: &[PathBuf]) -> Result<Vec<Invocation>> {
    let mut merged = Vec::new();

    for path in paths {
        let invocations = load_invocations(path)?;
        tracing::info!("Loaded {} invocations from {}", invocations.len(), path.display());
        merged.extend(invocations);
    }

    Ok(merged)
}

/// @ai:intent Keep only the invocation at `index` (0-based)
/// @ai:effects pure
pub fn select_invocation(invocations: Vec<Invocation>, index: usize) -> Result<Vec<Invocation>> {
    let count = invocations.len();

    match invocations.into_iter().nth(index) {
        Some(invocation) => Ok(vec![invocation]),
        None => bail!("Invocation index {} out of range (have {})", index, count),
    }
}

/// @ai:intent Repeat every invocation with run ids 1..=repetitions
/// @ai:effects pure
pub fn expand_repetitions(invocations: &[Invocation], repetitions: u32) -> Vec<Invocation> {
    invocations
        .iter()
        .flat_map(|invocation| {
            (1..=repetitions).map(move |run_id| Invocation {
                run_id,
                ..invocation.clone()
            })
        })
        .collect()
}

/// @ai:intent Resolve the time limit of every invocation before running
/// @ai:post an override replaces every limit (0 removes it); otherwise missing limits take the campaign default
/// @ai:effects state:write
pub fn apply_time_limits(
    invocations: &mut [Invocation],
    override_limit: Option<f64>,
    default_limit: Option<f64>,
) {
    for invocation in invocations {
        invocation.time_limit = match override_limit {
            Some(limit) => (limit > 0.0).then_some(limit),
            None => invocation.time_limit.or(default_limit),
        };
    }
}

/// @ai:intent Write `<id>.log` and `<id>.json` for one executed invocation
/// @ai:effects fs:write
pub fn write_execution(execution: &ExecutionRecord, logs_dir: &Path) -> Result<PathBuf> {
    let identifier = execution.invocation.identifier()?;
    let log_name = format!("{identifier}.log");

    std::fs::write(logs_dir.join(&log_name), execution.concatenate_logs())
        .with_context(|| format!("Failed to write log for {identifier}"))?;

    let mut record = execution.to_run_record();
    record.log = Some(log_name);

    let json_path = logs_dir.join(format!("{identifier}.json"));
    record
        .save(&json_path)
        .with_context(|| format!("Failed to write record for {identifier}"))?;

    Ok(json_path)
}

/// @ai:intent Execute invocations one after another and persist each result
/// @ai:post records of completed invocations stay on disk even if later ones fail
/// @ai:effects process, fs:write
pub async fn run_invocations<R: CommandRunnerTrait>(
    executor: &InvocationExecutor<R>,
    invocations: &[Invocation],
    logs_dir: &Path,
) -> Result<RunStats> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create {}", logs_dir.display()))?;

    let mut stats = RunStats::default();
    let total = invocations.len();

    for (index, invocation) in invocations.iter().enumerate() {
        let identifier = match invocation.identifier() {
            Ok(identifier) => identifier,
            Err(e) => {
                tracing::error!("Skipping invocation #{}: {}", index, e);
                stats.failed += 1;
                continue;
            }
        };

        tracing::info!("[{}/{}] Executing {}", index + 1, total, identifier);

        let execution = executor.execute(invocation).await;
        stats.executed += 1;

        if execution.timeout {
            stats.timeouts += 1;
        }

        if execution.error {
            stats.errors += 1;
        }

        if let Err(e) = write_execution(&execution, logs_dir) {
            tracing::error!("Failed to persist {}: {:#}", identifier, e);
            stats.failed += 1;
        }
    }

    Ok(stats)
}

/// @ai:intent Run invocations unless `interrupt` completes first
/// @ai:post an interruption is an error; records of finished invocations stay on disk
/// @ai:effects process, fs:write
pub async fn run_interruptible<R, I>(
    executor: &InvocationExecutor<R>,
    invocations: &[Invocation],
    logs_dir: &Path,
    interrupt: I,
) -> Result<RunStats>
where
    R: CommandRunnerTrait,
    I: Future<Output = ()>,
{
    tokio::select! {
        biased;

        _ = interrupt => {
            tracing::warn!(
                "Interrupted; records of completed invocations remain in {}",
                logs_dir.display()
            );
            bail!("Campaign interrupted before all invocations were executed")
        }
        stats = run_invocations(executor, invocations, logs_dir) => stats,
    }
}

/// @ai:intent Paths of all JSON files directly inside the logs directory
/// @ai:effects fs:read
fn record_files(logs_dir: &Path) -> Result<Vec<PathBuf>> {
    if !logs_dir.is_dir() {
        bail!("Directory '{}' does not exist", logs_dir.display());
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(logs_dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to scan {}", logs_dir.display()))?;
        let path = entry.path();

        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// @ai:effects fs:read
fn read_record(path: &Path) -> Result<RunRecord> {
    RunRecord::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// @ai:intent Read a record whose file stem is its identifier
/// @ai:post a record stored under another invocation's name is rejected
/// @ai:effects fs:read
fn read_named_record(path: &Path) -> Result<(String, RunRecord)> {
    let record = read_record(path)?;
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string();
    let identity = InvocationIdentity::parse(&stem)?;

    if identity != record.identity() {
        bail!(
            "File name '{}' does not match the record of {}",
            stem,
            record.identity().group_key()
        );
    }

    Ok((stem, record))
}

/// @ai:intent Read all run records in a logs directory grouped by `tool.config.benchmark`
/// @ai:post files that are not run records are skipped with a warning
/// @ai:effects fs:read
pub fn gather_records(logs_dir: &Path) -> Result<BTreeMap<String, Vec<RunRecord>>> {
    let mut groups: BTreeMap<String, Vec<RunRecord>> = BTreeMap::new();

    for path in record_files(logs_dir)? {
        match read_named_record(&path) {
            Ok((_, record)) => {
                let key = record.identity().group_key();
                groups.entry(key).or_default().push(record);
            }
            Err(e) => tracing::warn!("Skipping {}: {:#}", path.display(), e),
        }
    }

    for records in groups.values_mut() {
        records.sort_by_key(|r| r.run_id);
    }

    tracing::info!(
        "Gathered {} benchmark groups from {}",
        groups.len(),
        logs_dir.display()
    );
    Ok(groups)
}

/// @ai:intent Load reference results keyed by benchmark id from a JSON object
/// @ai:effects fs:read
pub fn load_references(path: &Path) -> Result<HashMap<String, ReferenceResult>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let raw: HashMap<String, serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    raw.into_iter()
        .map(|(benchmark, value)| {
            let reference = ReferenceResult::from_json(&value)
                .with_context(|| format!("Invalid reference result for '{benchmark}'"))?;
            Ok::<_, anyhow::Error>((benchmark, reference))
        })
        .collect()
}

/// @ai:intent Load the log parser's output: identifier to result string, `null` when none was found
/// @ai:effects fs:read
pub fn load_parsed_results(path: &Path) -> Result<HashMap<String, Option<String>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let results = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(results)
}

/// @ai:intent Post-process every record in a logs directory in place
/// @ai:pre `parsed` holds an entry for every record whose log was parsed
/// @ai:post returns the number of records rewritten; records without a parse attempt are left untouched
/// @ai:effects fs:read, fs:write
pub fn postprocess_logs(
    logs_dir: &Path,
    parsed: &HashMap<String, Option<String>>,
    references: &HashMap<String, ReferenceResult>,
    processor: &PostProcessor,
) -> Result<usize> {
    let mut processed = 0;

    for path in record_files(logs_dir)? {
        let (identifier, mut record) = match read_named_record(&path) {
            Ok(named) => named,
            Err(e) => {
                tracing::warn!("Skipping {}: {:#}", path.display(), e);
                continue;
            }
        };

        let Some(result) = parsed.get(&identifier) else {
            tracing::warn!("No parsed result for {}, leaving it unverified", identifier);
            continue;
        };

        let log = match &record.log {
            Some(name) => std::fs::read_to_string(logs_dir.join(name)).unwrap_or_else(|e| {
                tracing::warn!("Cannot read log {}: {}", name, e);
                String::new()
            }),
            None => String::new(),
        };

        let reference = references.get(&record.benchmark_id);

        if let Err(e) = processor.process(&mut record, &log, result.as_deref(), reference) {
            tracing::warn!("Cannot verify {}: {}", path.display(), e);
            continue;
        }

        record
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        processed += 1;
    }

    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{MockCommandRunner, ScriptedCommand};
    use crate::verify::{CorrectnessVerifier, VerificationPolicy};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn invocation(tool: &str, config: &str, benchmark: &str, run_id: u32, command: &str) -> Invocation {
        let mut invocation =
            Invocation::new(tool, config, benchmark, run_id).with_time_limit(Some(10.0));
        invocation.add_command(command);
        invocation
    }

    fn mock_executor() -> InvocationExecutor<MockCommandRunner> {
        let runner = MockCommandRunner::new([
            ("fast".to_string(), ScriptedCommand::exits(1.0, 0).with_output("Result: 0.5")),
            ("slow".to_string(), ScriptedCommand::exits(60.0, 0)),
        ]);
        InvocationExecutor::new(Arc::new(runner))
    }

    #[test]
    fn test_check_reports_duplicates_and_invalid_names() {
        let invocations = vec![
            invocation("storm", "sparse", "brp", 1, "fast"),
            invocation("storm", "sparse", "brp", 1, "fast"),
            invocation("storm", "sparse", "dir/brp", 1, "fast"),
            invocation("storm.x", "sparse", "brp", 1, "fast"),
            Invocation::new("storm", "sparse", "empty", 1),
        ];

        let problems = check_invocations(&invocations);

        assert_eq!(problems.len(), 4);
        assert!(problems[0].contains("already exists"));
        assert!(problems[1].contains("not a valid file name"));
        assert!(check_invocations(&invocations[..1]).is_empty());
    }

    #[test]
    fn test_select_invocation_range() {
        let invocations = vec![
            invocation("storm", "sparse", "a", 1, "fast"),
            invocation("storm", "sparse", "b", 1, "fast"),
        ];

        let selected = select_invocation(invocations.clone(), 1).unwrap();
        assert_eq!(selected[0].benchmark_id, "b");
        assert!(select_invocation(invocations, 2).is_err());
    }

    #[test]
    fn test_expand_repetitions() {
        let invocations = vec![
            invocation("storm", "sparse", "a", 1, "fast"),
            invocation("storm", "sparse", "b", 1, "fast"),
        ];

        let expanded = expand_repetitions(&invocations, 3);

        assert_eq!(expanded.len(), 6);
        assert_eq!(expanded.iter().map(|i| i.run_id).collect::<Vec<_>>(), vec![1, 2, 3, 1, 2, 3]);
        assert!(check_invocations(&expanded).is_empty());
    }

    #[test]
    fn test_apply_time_limits() {
        let mut invocations = vec![
            invocation("storm", "sparse", "a", 1, "fast"),
            invocation("storm", "sparse", "b", 1, "fast").with_time_limit(None),
        ];

        apply_time_limits(&mut invocations, None, Some(2700.0));
        assert_eq!(invocations[0].time_limit, Some(10.0));
        assert_eq!(invocations[1].time_limit, Some(2700.0));

        apply_time_limits(&mut invocations, Some(0.0), Some(2700.0));
        assert!(invocations.iter().all(|i| i.time_limit.is_none()));
    }

    #[test]
    fn test_merge_invocation_files() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("a.json");
        let second = temp.path().join("b.json");

        save_invocations(&[invocation("storm", "sparse", "a", 1, "fast")], &first).unwrap();
        save_invocations(
            &[
                invocation("mcsta", "default", "b", 1, "fast"),
                invocation("mcsta", "default", "b", 2, "fast"),
            ],
            &second,
        )
        .unwrap();

        let merged = merge_invocation_files(&[first, second]).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].tool, "storm");
        assert_eq!(merged[2].run_id, 2);
    }

    #[tokio::test]
    async fn test_run_writes_log_and_record() {
        let temp = TempDir::new().unwrap();
        let logs = temp.path().join("logs");
        let invocations = vec![
            invocation("storm", "sparse", "brp.p1", 1, "fast"),
            invocation("storm", "sparse", "csma", 1, "slow"),
        ];

        let stats = run_invocations(&mock_executor(), &invocations, &logs).await.unwrap();

        assert_eq!(stats.executed, 2);
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.failed, 0);

        let log = std::fs::read_to_string(logs.join("storm.sparse.brp.p1.run1.log")).unwrap();
        assert!(log.contains("Result: 0.5"));

        let record = read_record(&logs.join("storm.sparse.csma.run1.json")).unwrap();
        assert_eq!(record.timeout, Some(true));
        assert_eq!(record.return_codes, Some(vec![-9]));
        assert_eq!(record.log.as_deref(), Some("storm.sparse.csma.run1.log"));
    }

    #[tokio::test]
    async fn test_interrupted_run_is_an_error() {
        let temp = TempDir::new().unwrap();
        let invocations = vec![invocation("storm", "sparse", "brp", 1, "fast")];

        let interrupted =
            run_interruptible(&mock_executor(), &invocations, temp.path(), std::future::ready(())).await;
        assert!(interrupted.is_err());

        let stats = run_interruptible(
            &mock_executor(),
            &invocations,
            temp.path(),
            std::future::pending::<()>(),
        )
        .await
        .unwrap();
        assert_eq!(stats.executed, 1);
    }

    #[tokio::test]
    async fn test_gather_groups_repetitions() {
        let temp = TempDir::new().unwrap();
        let invocations = vec![
            invocation("storm", "sparse", "brp.p1", 2, "fast"),
            invocation("storm", "sparse", "brp.p1", 1, "fast"),
            invocation("storm", "hybrid", "brp.p1", 1, "fast"),
        ];

        run_invocations(&mock_executor(), &invocations, temp.path()).await.unwrap();
        std::fs::write(temp.path().join("notes.json"), "{\"unrelated\": true}").unwrap();

        let groups = gather_records(temp.path()).unwrap();

        assert_eq!(groups.len(), 2);
        let sparse = &groups["storm.sparse.brp.p1"];
        assert_eq!(sparse.iter().map(|r| r.run_id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_postprocess_logs_applies_parsed_results() {
        let temp = TempDir::new().unwrap();
        let invocations = vec![
            invocation("storm", "sparse", "brp", 1, "fast"),
            invocation("storm", "sparse", "csma", 1, "fast"),
        ];
        run_invocations(&mock_executor(), &invocations, temp.path()).await.unwrap();

        let parsed_path = temp.path().join("parsed");
        std::fs::create_dir(&parsed_path).unwrap();
        let parsed_file = parsed_path.join("results.json");
        std::fs::write(&parsed_file, r#"{"storm.sparse.brp.run1": "0.5"}"#).unwrap();
        let parsed = load_parsed_results(&parsed_file).unwrap();

        let references = HashMap::from([("brp".to_string(), ReferenceResult::parse("1/2").unwrap())]);
        let processor = PostProcessor::new(CorrectnessVerifier::new(VerificationPolicy::default()));

        assert_eq!(postprocess_logs(temp.path(), &parsed, &references, &processor).unwrap(), 1);
        assert_eq!(postprocess_logs(temp.path(), &parsed, &references, &processor).unwrap(), 1);

        let verified = read_record(&temp.path().join("storm.sparse.brp.run1.json")).unwrap();
        assert_eq!(verified.result_correct, Some(true));
        assert_eq!(verified.memout, Some(false));
        assert_eq!(verified.execution_error, Some(false));
        assert!(verified.notes.is_empty());

        let unparsed = read_record(&temp.path().join("storm.sparse.csma.run1.json")).unwrap();
        assert_eq!(unparsed.memout, None);
        assert_eq!(unparsed.execution_error, Some(false));
    }

    #[tokio::test]
    async fn test_gather_skips_misnamed_records() {
        let temp = TempDir::new().unwrap();
        let invocations = vec![invocation("storm", "sparse", "brp", 1, "fast")];
        run_invocations(&mock_executor(), &invocations, temp.path()).await.unwrap();

        std::fs::copy(
            temp.path().join("storm.sparse.brp.run1.json"),
            temp.path().join("storm.sparse.csma.run1.json"),
        )
        .unwrap();

        let groups = gather_records(temp.path()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["storm.sparse.brp"].len(), 1);
    }

    #[test]
    fn test_load_references() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("references.json");
        std::fs::write(
            &path,
            r#"{"brp": "1/3", "csma": {"lower": 0.1, "upper": 0.2}, "zeroconf": true}"#,
        )
        .unwrap();

        let references = load_references(&path).unwrap();
        assert_eq!(references.len(), 3);
        assert!(matches!(references["csma"], ReferenceResult::Interval { .. }));
        assert_eq!(references["zeroconf"], ReferenceResult::Bool(true));
    }
}
