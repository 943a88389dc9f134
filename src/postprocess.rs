//! @ai:module:intent Fold parsed tool results and verdicts back into persisted run records
//! @ai:module:layer application
//! @ai:module:public_api apply_verdict, MemoutRule, MemoutEvidence, PostProcessor
//! @ai:module:stateless true

use crate::error::Result;
use crate::execution::RunRecord;
use crate::numeric::{ReferenceResult, ToolResult};
use crate::verify::{CorrectnessVerifier, CorrectnessVerifierTrait};

pub const NO_REFERENCE_NOTE: &str =
    "Correctness of result is not checked because no reference result is available.";

pub const NO_RESULT_NOTE: &str = "Unable to obtain tool result.";

pub const INFERRED_MEMOUT_NOTE: &str =
    "Memory-out inferred: the log contains neither a result nor an error message.";

/// @ai:intent Store a parsed result and its verdict in the record
/// @ai:pre the record went through execution (timeout and execution-error are set)
/// @ai:post a malformed result string is returned as a parse error and leaves the record unchanged
/// @ai:effects pure
pub fn apply_verdict(
    record: &mut RunRecord,
    result: Option<&str>,
    reference: Option<&ReferenceResult>,
    verifier: &CorrectnessVerifier,
) -> Result<()> {
    let Some(text) = result else {
        let has_timeout = record.timeout.unwrap_or(false);
        let has_error = record.execution_error.unwrap_or(false);

        if !has_timeout && !has_error {
            record.notes.push(NO_RESULT_NOTE.to_string());
            record.execution_error = Some(true);
        }
        return Ok(());
    };

    let parsed = ToolResult::parse(text)?;
    record.result = Some(text.trim().to_string());

    let Some(reference) = reference else {
        record.notes.push(NO_REFERENCE_NOTE.to_string());
        return Ok(());
    };

    let verdict = verifier.verify(reference, &parsed);
    record.result_correct = Some(verdict.correct);

    if let (Some(absolute), Some(relative)) = (&verdict.absolute_error, &verdict.relative_error) {
        record.absolute_error = Some(absolute.to_f64());
        record.relative_error = Some(relative.to_f64());
    }

    if !verdict.correct {
        let note = verifier.incorrect_note(reference, &parsed, &verdict);
        tracing::debug!("{}", note);
        record.notes.push(note);
    }

    Ok(())
}

/// @ai:intent How certain a memory-out classification is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoutEvidence {
    /// A known out-of-memory message is in the log
    Confirmed,
    /// No known message and no error marker; assumed out of memory
    Inferred,
    Absent,
}

impl MemoutEvidence {
    /// @ai:effects pure
    pub fn is_memout(&self) -> bool {
        !matches!(self, MemoutEvidence::Absent)
    }
}

/// @ai:intent Memory-out detection for logs that produced no result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoutRule {
    pub markers: Vec<String>,
    /// When set, a log without this marker and without known messages counts as an inferred memout
    pub error_marker: Option<String>,
}

impl MemoutRule {
    /// @ai:effects pure
    pub fn new(markers: &[&str], error_marker: Option<&str>) -> Self {
        Self {
            markers: markers.iter().map(|m| m.to_string()).collect(),
            error_marker: error_marker.map(str::to_string),
        }
    }

    /// @ai:intent Messages printed by Storm when memory runs out
    /// @ai:effects pure
    pub fn storm() -> Self {
        Self::new(
            &[
                "Maximum memory exceeded.",
                "BDD Unique table full",
                "ERROR: The program received signal 11",
                "Unable to optimize Gurobi model (Out of memory, error code 10001).",
            ],
            Some("ERROR"),
        )
    }

    /// @ai:intent Messages printed by mcsta when memory runs out
    /// @ai:effects pure
    pub fn mcsta() -> Self {
        Self::new(
            &["The linear programming solver ran out of memory.", "Out of memory"],
            None,
        )
    }

    /// @ai:intent Preset for a tool name, if one is known
    /// @ai:effects pure
    pub fn for_tool(tool: &str) -> Option<Self> {
        match tool {
            "storm" => Some(Self::storm()),
            "mcsta" => Some(Self::mcsta()),
            _ => None,
        }
    }

    /// @ai:intent Classify a log that yielded no result
    /// @ai:effects pure
    pub fn classify(&self, log: &str) -> MemoutEvidence {
        if self.markers.iter().any(|m| log.contains(m.as_str())) {
            return MemoutEvidence::Confirmed;
        }

        match &self.error_marker {
            Some(marker) if !log.contains(marker.as_str()) => MemoutEvidence::Inferred,
            _ => MemoutEvidence::Absent,
        }
    }
}

/// @ai:intent Post-processing stage: memout detection plus result verification for one record
pub struct PostProcessor {
    verifier: CorrectnessVerifier,
}

impl PostProcessor {
    /// @ai:effects pure
    pub fn new(verifier: CorrectnessVerifier) -> Self {
        Self { verifier }
    }

    /// @ai:intent Enrich a record with the result a log parser extracted from its log
    /// @ai:pre the log parser ran; `result` is `None` only when it found no result
    /// @ai:post memout and expected-error are false whenever a result is present or the run timed out
    /// @ai:post running it again on its own output yields the same record
    /// @ai:effects pure
    pub fn process(
        &self,
        record: &mut RunRecord,
        log: &str,
        result: Option<&str>,
        reference: Option<&ReferenceResult>,
    ) -> Result<()> {
        let timed_out = record.timeout.unwrap_or(false);

        record.notes.clear();
        record.result = None;
        record.result_correct = None;
        record.absolute_error = None;
        record.relative_error = None;

        if let Some(codes) = &record.return_codes {
            record.execution_error = Some(!timed_out && codes.iter().any(|&code| code != 0));
        }

        if result.is_some() || timed_out {
            record.memout = Some(false);
            record.expected_error = Some(false);
        } else {
            let evidence = MemoutRule::for_tool(&record.tool)
                .map(|rule| rule.classify(log))
                .unwrap_or(MemoutEvidence::Absent);

            if evidence == MemoutEvidence::Inferred {
                record.notes.push(INFERRED_MEMOUT_NOTE.to_string());
            }
            record.memout = Some(evidence.is_memout());
        }

        if record.supported.is_none() {
            record.supported = Some(true);
        }

        apply_verdict(record, result, reference, &self.verifier)
    }
}
