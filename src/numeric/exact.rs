//! @ai:module:intent Exact numeric values for result verification
//! @ai:module:layer domain
//! @ai:module:public_api ExactValue
//! @ai:module:stateless true

use crate::error::{BenchError, Result};
use num::bigint::BigInt;
use num::rational::BigRational;
use num::traits::{One, Signed, ToPrimitive, Zero};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Exponents beyond this bound are rejected instead of materialising huge powers of ten
const MAX_DECIMAL_EXPONENT: u64 = 100_000;

static DECIMAL_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?)(\d*)(?:\.(\d*))?(?:[eE]([+-]?\d+))?$").expect("decimal literal regex")
});

static FRACTION_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?\d+)\s*/\s*([+-]?\d+)$").expect("fraction literal regex")
});

static INFINITY_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\+?inf(inity)?$").expect("infinity literal regex"));

/// @ai:intent A number without precision loss: an exact rational or positive infinity
/// @ai:effects pure
///
/// Variant order matters: the derived ordering places every finite value below `Infinity`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExactValue {
    Finite(BigRational),
    Infinity,
}

impl ExactValue {
    /// @ai:intent The value zero
    /// @ai:effects pure
    pub fn zero() -> Self {
        ExactValue::Finite(BigRational::zero())
    }

    /// @ai:intent The distinguished positive infinity
    /// @ai:effects pure
    pub fn infinity() -> Self {
        ExactValue::Infinity
    }

    /// @ai:intent Build the exact fraction num/den
    /// @ai:pre den != 0
    /// @ai:effects pure
    pub fn from_ratio(num: impl Into<BigInt>, den: impl Into<BigInt>) -> Result<Self> {
        let num = num.into();
        let den = den.into();

        if den.is_zero() {
            return Err(BenchError::parse(
                format!("{num}/{den}"),
                "denominator is zero",
            ));
        }

        Ok(ExactValue::Finite(BigRational::new(num, den)))
    }

    /// @ai:intent Build 10^(-exponent), e.g. `power_of_ten_inverse(8)` is 1e-8
    /// @ai:effects pure
    pub fn power_of_ten_inverse(exponent: u32) -> Self {
        let den = num::pow(BigInt::from(10), exponent as usize);
        ExactValue::Finite(BigRational::new(BigInt::one(), den))
    }

    /// @ai:intent Parse an integer, decimal, fraction or infinity literal
    /// @ai:post booleans and anything non-numeric are rejected with a parse error
    /// @ai:effects pure
    pub fn parse(input: &str) -> Result<Self> {
        let text = input.trim();

        if text.is_empty() {
            return Err(BenchError::parse(input, "empty numeric literal"));
        }

        if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
            return Err(BenchError::parse(input, "a boolean is not a number"));
        }

        if INFINITY_LITERAL.is_match(text) {
            return Ok(ExactValue::Infinity);
        }

        if let Some(caps) = FRACTION_LITERAL.captures(text) {
            let num = parse_bigint(input, &caps[1])?;
            let den = parse_bigint(input, &caps[2])?;
            return Self::from_ratio(num, den);
        }

        if let Some(caps) = DECIMAL_LITERAL.captures(text) {
            let sign = caps.get(1).map_or("", |m| m.as_str());
            let int_part = caps.get(2).map_or("", |m| m.as_str());
            let frac_part = caps.get(3).map_or("", |m| m.as_str());

            if int_part.is_empty() && frac_part.is_empty() {
                return Err(BenchError::parse(input, "no digits"));
            }

            let exponent: i64 = match caps.get(4) {
                Some(m) => m
                    .as_str()
                    .parse()
                    .map_err(|_| BenchError::parse(input, "exponent out of range"))?,
                None => 0,
            };

            let scale = i64::try_from(frac_part.len())
                .ok()
                .and_then(|frac_len| exponent.checked_sub(frac_len))
                .filter(|scale| scale.unsigned_abs() <= MAX_DECIMAL_EXPONENT)
                .ok_or_else(|| BenchError::parse(input, "exponent out of range"))?;

            let mantissa = parse_bigint(input, &format!("{sign}{int_part}{frac_part}"))?;
            let power = num::pow(BigInt::from(10), scale.unsigned_abs() as usize);

            let value = if scale >= 0 {
                BigRational::from_integer(mantissa * power)
            } else {
                BigRational::new(mantissa, power)
            };

            return Ok(ExactValue::Finite(value));
        }

        Err(BenchError::parse(input, "not a numeric literal"))
    }

    /// @ai:intent Interpret a stored JSON value: number, numeric string or `{num, den}` pair
    /// @ai:effects pure
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Number(n) => Self::parse(&n.to_string()),
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Object(map) => {
                let (Some(num), Some(den)) = (map.get("num"), map.get("den")) else {
                    return Err(BenchError::parse(value.to_string(), "expected a {num, den} pair"));
                };

                Self::from_json(num)?.checked_div(&Self::from_json(den)?)
            }
            other => Err(BenchError::parse(other.to_string(), "not a numeric value")),
        }
    }

    /// @ai:effects pure
    pub fn is_zero(&self) -> bool {
        matches!(self, ExactValue::Finite(v) if v.is_zero())
    }

    /// @ai:effects pure
    pub fn is_infinite(&self) -> bool {
        matches!(self, ExactValue::Infinity)
    }

    /// @ai:intent Absolute value
    /// @ai:effects pure
    pub fn abs(&self) -> Self {
        match self {
            ExactValue::Finite(v) => ExactValue::Finite(v.abs()),
            ExactValue::Infinity => ExactValue::Infinity,
        }
    }

    /// @ai:intent |self - other|; infinite unless both sides are finite, zero when both are infinite
    /// @ai:effects pure
    pub fn abs_diff(&self, other: &Self) -> Self {
        match (self, other) {
            (ExactValue::Finite(a), ExactValue::Finite(b)) => ExactValue::Finite((a - b).abs()),
            (ExactValue::Infinity, ExactValue::Infinity) => Self::zero(),
            _ => ExactValue::Infinity,
        }
    }

    /// @ai:intent Exact division
    /// @ai:pre divisor is non-zero; an infinite dividend needs a positive finite divisor
    /// @ai:effects pure
    pub fn checked_div(&self, divisor: &Self) -> Result<Self> {
        match (self, divisor) {
            (_, d) if d.is_zero() => Err(BenchError::parse(
                format!("{self}/{divisor}"),
                "division by zero",
            )),
            (ExactValue::Finite(a), ExactValue::Finite(b)) => Ok(ExactValue::Finite(a / b)),
            (ExactValue::Finite(_), ExactValue::Infinity) => Ok(Self::zero()),
            (ExactValue::Infinity, ExactValue::Finite(b)) if b.is_positive() => {
                Ok(ExactValue::Infinity)
            }
            _ => Err(BenchError::parse(
                format!("{self}/{divisor}"),
                "undefined quotient",
            )),
        }
    }

    /// @ai:intent Floating-point approximation for display and persisted error fields
    /// @ai:effects pure
    pub fn to_f64(&self) -> f64 {
        match self {
            ExactValue::Finite(v) => v.to_f64().unwrap_or_else(|| {
                if v.is_negative() {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                }
            }),
            ExactValue::Infinity => f64::INFINITY,
        }
    }
}

fn parse_bigint(input: &str, digits: &str) -> Result<BigInt> {
    digits
        .trim_start_matches('+')
        .parse::<BigInt>()
        .map_err(|e| BenchError::parse(input, e.to_string()))
}

impl fmt::Display for ExactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExactValue::Finite(v) if v.is_integer() => write!(f, "{}", v.numer()),
            ExactValue::Finite(v) => write!(f, "{}/{}", v.numer(), v.denom()),
            ExactValue::Infinity => write!(f, "inf"),
        }
    }
}

impl std::str::FromStr for ExactValue {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<i64> for ExactValue {
    fn from(value: i64) -> Self {
        ExactValue::Finite(BigRational::from_integer(BigInt::from(value)))
    }
}
