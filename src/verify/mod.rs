//! @ai:module:intent Certify tool results against reference values with exact arithmetic
//! @ai:module:layer domain
//! @ai:module:public_api CorrectnessVerifier, CorrectnessVerifierTrait, VerificationPolicy, Verdict, error_magnitude
//! @ai:module:stateless true

use crate::numeric::{ExactValue, ReferenceResult, ToolResult};
use num::traits::Signed;

/// Results and references both below 10^-8 count as equal once a precision is configured
const NEAR_ZERO_EXPONENT: u32 = 8;

/// @ai:intent Immutable precision policy applied to every comparison
/// @ai:effects pure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPolicy {
    pub relative_error_mode: bool,
    /// `None` means results must match the reference exactly
    pub precision_threshold: Option<ExactValue>,
}

impl VerificationPolicy {
    /// @ai:intent Policy with relative error mode and the given goal precision
    /// @ai:effects pure
    pub fn relative(threshold: ExactValue) -> Self {
        Self {
            relative_error_mode: true,
            precision_threshold: Some(threshold),
        }
    }

    /// @ai:intent Policy with absolute error mode and the given goal precision
    /// @ai:effects pure
    pub fn absolute(threshold: ExactValue) -> Self {
        Self {
            relative_error_mode: false,
            precision_threshold: Some(threshold),
        }
    }

    /// @ai:intent Policy requiring exact agreement
    /// @ai:effects pure
    pub fn exact() -> Self {
        Self {
            relative_error_mode: false,
            precision_threshold: None,
        }
    }
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self::relative(ExactValue::power_of_ten_inverse(3))
    }
}

/// @ai:intent Outcome of comparing one result with its reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Error under the policy's mode; `None` for boolean or mismatched kinds
    pub error: Option<ExactValue>,
    pub absolute_error: Option<ExactValue>,
    pub relative_error: Option<ExactValue>,
    pub correct: bool,
}

impl Verdict {
    fn mismatch() -> Self {
        Self {
            error: None,
            absolute_error: None,
            relative_error: None,
            correct: false,
        }
    }
}

/// @ai:intent Trait for result verification
pub trait CorrectnessVerifierTrait: Send + Sync {
    /// @ai:intent Compare a tool result with a reference result
    fn verify(&self, reference: &ReferenceResult, result: &ToolResult) -> Verdict;
}

/// @ai:intent Compares tool results to reference results under a fixed policy
pub struct CorrectnessVerifier {
    policy: VerificationPolicy,
}

impl CorrectnessVerifier {
    /// @ai:intent Create a verifier for the given policy
    /// @ai:effects pure
    pub fn new(policy: VerificationPolicy) -> Self {
        Self { policy }
    }

    /// @ai:effects pure
    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    /// @ai:intent Explain why a verdict is incorrect, in the wording stored with run notes
    /// @ai:pre verdict.correct is false
    /// @ai:effects pure
    pub fn incorrect_note(
        &self,
        reference: &ReferenceResult,
        result: &ToolResult,
        verdict: &Verdict,
    ) -> String {
        match &verdict.error {
            Some(error) => {
                let error_kind = if self.policy.relative_error_mode {
                    "a relative"
                } else {
                    "an absolute"
                };
                let goal = self
                    .policy
                    .precision_threshold
                    .as_ref()
                    .map(|t| t.to_f64().to_string())
                    .unwrap_or_else(|| "exact".to_string());

                format!(
                    "The tool result {} is tagged as incorrect. The reference result is {} which means {} error of '{}' which is larger than the goal precision '{}'.",
                    result.describe(),
                    reference.describe(),
                    error_kind,
                    error.to_f64(),
                    goal
                )
            }
            None => format!(
                "Result '{}' is tagged as incorrect because it is different from the reference result '{}'.",
                result, reference
            ),
        }
    }

    /// @ai:intent Both values are below the near-zero epsilon
    /// @ai:effects pure
    fn absorbed_near_zero(reference: &ReferenceResult, result: &ExactValue) -> bool {
        let epsilon = ExactValue::power_of_ten_inverse(NEAR_ZERO_EXPONENT);

        match reference.upper_bound() {
            Some(upper) => *result < epsilon && *upper < epsilon,
            None => false,
        }
    }
}

impl CorrectnessVerifierTrait for CorrectnessVerifier {
    /// @ai:intent Compare a tool result with a reference result
    /// @ai:post mismatched kinds are never correct
    /// @ai:effects pure
    fn verify(&self, reference: &ReferenceResult, result: &ToolResult) -> Verdict {
        match (reference, result) {
            (ReferenceResult::Bool(expected), ToolResult::Bool(actual)) => Verdict {
                error: None,
                absolute_error: None,
                relative_error: None,
                correct: expected == actual,
            },
            (ReferenceResult::Bool(_), ToolResult::Number(_))
            | (ReferenceResult::Number(_), ToolResult::Bool(_))
            | (ReferenceResult::Interval { .. }, ToolResult::Bool(_)) => Verdict::mismatch(),
            (_, ToolResult::Number(value)) => {
                let absolute_error = error_magnitude(false, reference, value);
                let relative_error = error_magnitude(true, reference, value);
                let error = if self.policy.relative_error_mode {
                    relative_error.clone()
                } else {
                    absolute_error.clone()
                };

                let correct = match &self.policy.precision_threshold {
                    Some(_) if Self::absorbed_near_zero(reference, value) => true,
                    Some(threshold) => error <= *threshold,
                    None => error.is_zero(),
                };

                Verdict {
                    error: Some(error),
                    absolute_error: Some(absolute_error),
                    relative_error: Some(relative_error),
                    correct,
                }
            }
        }
    }
}

/// @ai:intent Error of a numeric result with respect to a numeric or interval reference
/// @ai:pre reference is numeric; a boolean reference yields infinite error
/// @ai:effects pure
pub fn error_magnitude(relative: bool, reference: &ReferenceResult, result: &ExactValue) -> ExactValue {
    match reference {
        ReferenceResult::Bool(_) => ExactValue::Infinity,
        ReferenceResult::Number(expected) => scalar_error(relative, expected, result),
        ReferenceResult::Interval { lower, upper } => {
            if result.is_infinite() && !upper.is_infinite() {
                ExactValue::Infinity
            } else if result < lower {
                scalar_error(relative, lower, result)
            } else if result > upper {
                scalar_error(relative, upper, result)
            } else {
                ExactValue::zero()
            }
        }
    }
}

/// @ai:intent Absolute or relative distance between a scalar reference and a result
/// @ai:effects pure
fn scalar_error(relative: bool, expected: &ExactValue, result: &ExactValue) -> ExactValue {
    if relative && expected.is_zero() {
        return if result.is_zero() {
            ExactValue::zero()
        } else {
            ExactValue::Infinity
        };
    }

    match (expected, result) {
        (ExactValue::Infinity, ExactValue::Infinity) => ExactValue::zero(),
        (ExactValue::Finite(e), ExactValue::Finite(r)) => {
            let diff = (e - r).abs();

            if relative {
                ExactValue::Finite(diff / e.abs())
            } else {
                ExactValue::Finite(diff)
            }
        }
        _ => ExactValue::Infinity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(s: &str) -> ExactValue {
        ExactValue::parse(s).unwrap()
    }

    fn result(s: &str) -> ToolResult {
        ToolResult::parse(s).unwrap()
    }

    fn reference(s: &str) -> ReferenceResult {
        ReferenceResult::parse(s).unwrap()
    }

    #[test]
    fn test_interval_contains_result() {
        let verifier = CorrectnessVerifier::new(VerificationPolicy::relative(num("1e-6")));
        let verdict = verifier.verify(&reference("[1/3, 1/2]"), &result("0.4"));

        assert_eq!(verdict.error, Some(ExactValue::zero()));
        assert!(verdict.correct);
    }

    #[test]
    fn test_interval_error_is_zero_iff_inside() {
        let interval = reference("[1/3, 1/2]");

        for (value, inside) in [("1/3", true), ("0.5", true), ("0.3", false), ("0.51", false), ("inf", false)] {
            let error = error_magnitude(false, &interval, &num(value));
            assert_eq!(error.is_zero(), inside, "value {value}");
        }
    }

    #[test]
    fn test_interval_uses_nearest_bound() {
        let interval = reference("[0.2, 0.4]");

        assert_eq!(error_magnitude(false, &interval, &num("0.5")), num("0.1"));
        assert_eq!(error_magnitude(true, &interval, &num("0.1")), num("0.5"));
    }

    #[test]
    fn test_unbounded_interval_accepts_infinity() {
        let interval = ReferenceResult::interval(num("1"), ExactValue::Infinity).unwrap();
        assert!(error_magnitude(false, &interval, &ExactValue::Infinity).is_zero());
    }

    #[test]
    fn test_relative_error_with_zero_reference() {
        let zero = reference("0");

        assert!(error_magnitude(true, &zero, &num("0.5")).is_infinite());
        assert!(error_magnitude(true, &zero, &num("0")).is_zero());
    }

    #[test]
    fn test_infinite_values() {
        let inf = reference("inf");

        assert!(error_magnitude(false, &inf, &ExactValue::Infinity).is_zero());
        assert!(error_magnitude(false, &inf, &num("10")).is_infinite());
        assert!(error_magnitude(true, &reference("10"), &ExactValue::Infinity).is_infinite());
    }

    #[test]
    fn test_relative_error_divides_by_magnitude() {
        assert_eq!(error_magnitude(true, &reference("-2"), &num("-1")), num("0.5"));
        assert_eq!(error_magnitude(false, &reference("-2"), &num("-1")), num("1"));
    }

    #[test]
    fn test_near_zero_absorption() {
        let verifier = CorrectnessVerifier::new(VerificationPolicy::relative(num("1e-3")));
        let verdict = verifier.verify(&reference("0"), &result("1e-9"));

        assert!(verdict.error.as_ref().unwrap().is_infinite());
        assert!(verdict.correct);
    }

    #[test]
    fn test_near_zero_requires_threshold() {
        let verifier = CorrectnessVerifier::new(VerificationPolicy::exact());
        assert!(!verifier.verify(&reference("0"), &result("1e-9")).correct);
    }

    #[test]
    fn test_threshold_boundaries() {
        let verifier = CorrectnessVerifier::new(VerificationPolicy::absolute(num("1e-3")));

        assert!(verifier.verify(&reference("1/3"), &result("0.3343333")).correct);
        assert!(!verifier.verify(&reference("1/3"), &result("0.335")).correct);
    }

    #[test]
    fn test_exact_policy_requires_equality() {
        let verifier = CorrectnessVerifier::new(VerificationPolicy::exact());

        assert!(verifier.verify(&reference("1/4"), &result("0.25")).correct);
        assert!(!verifier.verify(&reference("1/3"), &result("0.3333333333")).correct);
    }

    #[test]
    fn test_kind_mismatch_is_incorrect() {
        let verifier = CorrectnessVerifier::new(VerificationPolicy::default());

        assert!(!verifier.verify(&reference("true"), &result("1")).correct);
        assert!(!verifier.verify(&reference("1"), &result("true")).correct);
        assert!(!verifier.verify(&reference("[0,1]"), &result("false")).correct);
        assert!(verifier.verify(&reference("true"), &result("TRUE")).correct);
    }

    #[test]
    fn test_incorrect_note_mentions_errors() {
        let verifier = CorrectnessVerifier::new(VerificationPolicy::relative(num("1e-3")));
        let reference = reference("0.5");
        let result = result("0.25");
        let verdict = verifier.verify(&reference, &result);

        let note = verifier.incorrect_note(&reference, &result, &verdict);
        assert!(note.contains("a relative error of '0.5'"));
        assert!(note.contains("goal precision '0.001'"));
    }
}
