//! @ai:module:intent Typed reference values and parsed tool results
//! @ai:module:layer domain
//! @ai:module:public_api ReferenceResult, ToolResult
//! @ai:module:stateless true

use crate::error::{BenchError, Result};
use crate::numeric::ExactValue;
use std::fmt;

/// @ai:intent Trusted expected value a tool result is checked against
/// @ai:effects pure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceResult {
    Bool(bool),
    Number(ExactValue),
    /// Callers guarantee lower <= upper
    Interval { lower: ExactValue, upper: ExactValue },
}

/// @ai:intent Result reported by a tool after log parsing
/// @ai:effects pure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    Bool(bool),
    Number(ExactValue),
}

/// @ai:intent Recognise the literals `true` and `false` regardless of case
/// @ai:effects pure
fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();

    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl ReferenceResult {
    /// @ai:intent Build an interval, rejecting inverted bounds
    /// @ai:effects pure
    pub fn interval(lower: ExactValue, upper: ExactValue) -> Result<Self> {
        if lower > upper {
            return Err(BenchError::parse(
                format!("[{lower},{upper}]"),
                "lower bound exceeds upper bound",
            ));
        }

        Ok(ReferenceResult::Interval { lower, upper })
    }

    /// @ai:intent Parse textual reference data: a boolean, `[lower, upper]`, or a number
    /// @ai:effects pure
    pub fn parse(input: &str) -> Result<Self> {
        if let Some(b) = parse_bool(input) {
            return Ok(ReferenceResult::Bool(b));
        }

        let text = input.trim();

        if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            let (lower, upper) = inner
                .split_once(',')
                .ok_or_else(|| BenchError::parse(input, "interval needs two bounds"))?;
            return Self::interval(ExactValue::parse(lower)?, ExactValue::parse(upper)?);
        }

        Ok(ReferenceResult::Number(ExactValue::parse(text)?))
    }

    /// @ai:intent Interpret stored reference data (bool, number, `{num, den}`, `{lower, upper}`)
    /// @ai:effects pure
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Bool(b) => Ok(ReferenceResult::Bool(*b)),
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Object(map) if map.contains_key("lower") || map.contains_key("upper") => {
                let (Some(lower), Some(upper)) = (map.get("lower"), map.get("upper")) else {
                    return Err(BenchError::parse(value.to_string(), "interval needs two bounds"));
                };

                Self::interval(ExactValue::from_json(lower)?, ExactValue::from_json(upper)?)
            }
            other => Ok(ReferenceResult::Number(ExactValue::from_json(other)?)),
        }
    }

    /// @ai:intent Largest value admitted by the reference, if numeric
    /// @ai:effects pure
    pub fn upper_bound(&self) -> Option<&ExactValue> {
        match self {
            ReferenceResult::Bool(_) => None,
            ReferenceResult::Number(v) => Some(v),
            ReferenceResult::Interval { upper, .. } => Some(upper),
        }
    }

    /// @ai:intent Human readable form with float approximations, used in result notes
    /// @ai:effects pure
    pub fn describe(&self) -> String {
        match self {
            ReferenceResult::Bool(b) => format!("'{b}'"),
            ReferenceResult::Number(v) => describe_number(v),
            ReferenceResult::Interval { lower, upper } => {
                format!("[{},{}]", lower.to_f64(), upper.to_f64())
            }
        }
    }
}

impl ToolResult {
    /// @ai:intent Parse the result string extracted from a tool log
    /// @ai:effects pure
    pub fn parse(input: &str) -> Result<Self> {
        match parse_bool(input) {
            Some(b) => Ok(ToolResult::Bool(b)),
            None => Ok(ToolResult::Number(ExactValue::parse(input)?)),
        }
    }

    /// @ai:intent Human readable form with float approximation, used in result notes
    /// @ai:effects pure
    pub fn describe(&self) -> String {
        match self {
            ToolResult::Bool(b) => format!("'{b}'"),
            ToolResult::Number(v) => describe_number(v),
        }
    }
}

fn describe_number(value: &ExactValue) -> String {
    match value {
        ExactValue::Finite(v) if !v.is_integer() => {
            format!("'{}' (approx. {})", value, value.to_f64())
        }
        _ => format!("'{value}'"),
    }
}

impl fmt::Display for ReferenceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceResult::Bool(b) => write!(f, "{b}"),
            ReferenceResult::Number(v) => write!(f, "{v}"),
            ReferenceResult::Interval { lower, upper } => write!(f, "[{lower},{upper}]"),
        }
    }
}

impl fmt::Display for ToolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolResult::Bool(b) => write!(f, "{b}"),
            ToolResult::Number(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_reference_kinds() {
        assert_eq!(ReferenceResult::parse("TRUE").unwrap(), ReferenceResult::Bool(true));
        assert_eq!(
            ReferenceResult::parse("1/3").unwrap(),
            ReferenceResult::Number(ExactValue::from_ratio(1, 3).unwrap())
        );
        assert_eq!(
            ReferenceResult::parse("[1/3, 0.5]").unwrap(),
            ReferenceResult::Interval {
                lower: ExactValue::from_ratio(1, 3).unwrap(),
                upper: ExactValue::from_ratio(1, 2).unwrap(),
            }
        );
    }

    #[test]
    fn test_inverted_interval_rejected() {
        assert!(ReferenceResult::parse("[0.5, 0.4]").is_err());
    }

    #[test]
    fn test_reference_from_json() {
        let interval = serde_json::json!({"lower": "1/3", "upper": "1/2"});
        assert!(matches!(
            ReferenceResult::from_json(&interval).unwrap(),
            ReferenceResult::Interval { .. }
        ));

        let pair = serde_json::json!({"num": 2, "den": 4});
        assert_eq!(
            ReferenceResult::from_json(&pair).unwrap(),
            ReferenceResult::Number(ExactValue::from_ratio(1, 2).unwrap())
        );

        assert_eq!(
            ReferenceResult::from_json(&serde_json::json!(false)).unwrap(),
            ReferenceResult::Bool(false)
        );

        assert!(ReferenceResult::from_json(&serde_json::json!({"lower": 1})).is_err());
    }

    #[test]
    fn test_tool_result_parse() {
        assert_eq!(ToolResult::parse("false").unwrap(), ToolResult::Bool(false));
        assert_eq!(
            ToolResult::parse("0.25").unwrap(),
            ToolResult::Number(ExactValue::from_ratio(1, 4).unwrap())
        );
        assert!(ToolResult::parse("n/a").is_err());
    }

    #[test]
    fn test_describe_uses_approximation_for_fractions() {
        let reference = ReferenceResult::parse("1/4").unwrap();
        assert_eq!(reference.describe(), "'1/4' (approx. 0.25)");
        assert_eq!(ReferenceResult::parse("3").unwrap().describe(), "'3'");
    }
}
