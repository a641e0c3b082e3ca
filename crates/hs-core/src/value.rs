use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Host-side model of every value that crosses the sandbox boundary.
///
/// Follows JavaScript value semantics where scripts observe them
/// (`typeof`, `String(v)`, strict and deep equality, UTF-16 length) so
/// assertion messages keep their established wording.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum SandboxValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<SandboxValue>),
    Object(BTreeMap<String, SandboxValue>),
}

impl SandboxValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[SandboxValue]> {
        match self {
            Self::Array(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, SandboxValue>> {
        match self {
            Self::Object(values) => Some(values),
            _ => None,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Result of JavaScript `typeof`.
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Null | Self::Array(_) | Self::Object(_) => "object",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::String(value) => !value.is_empty(),
            Self::Array(_) | Self::Object(_) => true,
        }
    }

    /// Rendering of JavaScript `String(v)`.
    pub fn to_js_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => format_number(*value),
            Self::String(value) => value.clone(),
            Self::Array(values) => values
                .iter()
                .map(|value| {
                    if value.is_nullish() {
                        String::new()
                    } else {
                        value.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Self::Object(_) => "[object Object]".to_string(),
        }
    }

    /// Rendering of `JSON.stringify(v)`; `undefined` stays `undefined`.
    pub fn to_json_text(&self) -> String {
        if matches!(self, Self::Undefined) {
            return "undefined".to_string();
        }
        serde_json::to_string(&Value::from(self.clone())).unwrap_or_else(|_| "null".to_string())
    }

    /// Length in UTF-16 code units for strings, element count for arrays.
    pub fn js_length(&self) -> Option<usize> {
        match self {
            Self::String(value) => Some(value.encode_utf16().count()),
            Self::Array(values) => Some(values.len()),
            _ => None,
        }
    }

    /// JavaScript `===`. Arrays and objects arrive as separate copies, so two
    /// of them are never the same reference and never strictly equal.
    pub fn strict_equals(&self, other: &SandboxValue) -> bool {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => left == right,
            (Self::Array(_), _) | (Self::Object(_), _) => false,
            _ => self == other,
        }
    }

    /// SameValueZero, as used by `Array.prototype.includes`.
    pub fn same_value_zero(&self, other: &SandboxValue) -> bool {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) if left.is_nan() && right.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }

    /// Structural equality in the manner of `deep-eql` (`NaN` equals `NaN`).
    pub fn deep_equals(&self, other: &SandboxValue) -> bool {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => {
                left == right || (left.is_nan() && right.is_nan())
            }
            (Self::Array(left), Self::Array(right)) => {
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(right.iter())
                        .all(|(left, right)| left.deep_equals(right))
            }
            (Self::Object(left), Self::Object(right)) => {
                left.len() == right.len()
                    && left.iter().all(|(key, value)| {
                        right
                            .get(key)
                            .is_some_and(|other_value| value.deep_equals(other_value))
                    })
            }
            _ => self == other,
        }
    }

    /// JavaScript `parseInt(String(v))` in base 10.
    pub fn parse_int(&self) -> Option<i64> {
        let text = self.to_js_string();
        let trimmed = text.trim_start();
        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let end = digits
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(digits.len());
        if end == 0 {
            return None;
        }
        let parsed = digits[..end].parse::<i64>().ok()?;
        Some(if negative { -parsed } else { parsed })
    }
}

/// Formats a number the way JavaScript's `Number.prototype.toString` does.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{:e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        };
    }
    format!("{}", value)
}

impl From<Value> for SandboxValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(value) => Self::Bool(value),
            Value::Number(value) => Self::Number(value.as_f64().unwrap_or(f64::NAN)),
            Value::String(value) => Self::String(value),
            Value::Array(values) => Self::Array(values.into_iter().map(Self::from).collect()),
            Value::Object(values) => Self::Object(
                values
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<SandboxValue> for Value {
    fn from(value: SandboxValue) -> Self {
        match value {
            SandboxValue::Undefined | SandboxValue::Null => Value::Null,
            SandboxValue::Bool(value) => Value::Bool(value),
            SandboxValue::Number(value) => number_to_json(value),
            SandboxValue::String(value) => Value::String(value),
            SandboxValue::Array(values) => {
                Value::Array(values.into_iter().map(Value::from).collect())
            }
            SandboxValue::Object(values) => Value::Object(
                values
                    .into_iter()
                    .filter(|(_, value)| !matches!(value, SandboxValue::Undefined))
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

fn number_to_json(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        return Value::Number(Number::from(value as i64));
    }
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

impl From<&str> for SandboxValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for SandboxValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for SandboxValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for SandboxValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
