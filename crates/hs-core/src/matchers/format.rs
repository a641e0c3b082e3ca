use regex::{Regex, RegexBuilder};

use crate::value::{format_number, SandboxValue};

/// Renders a value for chai-style assertion messages: strings quoted,
/// arrays as `[a, b]`, objects as `{k: v}`.
pub fn format_value(value: &SandboxValue) -> String {
    match value {
        SandboxValue::Null => "null".to_string(),
        SandboxValue::Undefined => "undefined".to_string(),
        SandboxValue::Bool(value) => value.to_string(),
        SandboxValue::Number(number) => {
            if number.is_nan() {
                "NaN".to_string()
            } else if (number - std::f64::consts::PI).abs() < 1e-13 {
                "Math.PI".to_string()
            } else {
                format_number(*number)
            }
        }
        SandboxValue::String(text) => {
            if looks_like_function_source(text) {
                text.clone()
            } else {
                format!("'{}'", text)
            }
        }
        SandboxValue::Array(values) => format!(
            "[{}]",
            values.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        SandboxValue::Object(entries) => {
            if let Some(pattern) = regex_like_object(value) {
                return pattern;
            }
            format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, format_value(value)))
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        }
    }
}

fn looks_like_function_source(text: &str) -> bool {
    text.contains("=>") || text.starts_with("function")
}

/// `{source, flags}` objects render as `/source/flags`.
fn regex_like_object(value: &SandboxValue) -> Option<String> {
    let entries = value.as_object()?;
    let source = entries
        .get("source")
        .or_else(|| entries.get("pattern"))?
        .as_string()?;
    let flags = entries
        .get("flags")
        .and_then(SandboxValue::as_string)
        .unwrap_or_default();
    Some(format!("/{}/{}", source, flags))
}

/// Splits a `/pattern/flags` literal. Returns `None` for plain strings.
pub fn split_regex_literal(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('/')?;
    let last = rest.rfind('/')?;
    Some((&rest[..last], &rest[last + 1..]))
}

/// Compiles a JavaScript-style `/pattern/flags` literal.
pub fn compile_regex_literal(text: &str) -> Option<Regex> {
    let (pattern, flags) = split_regex_literal(text)?;
    compile_pattern(pattern, flags)
}

pub fn compile_pattern(pattern: &str, flags: &str) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .ok()
}
