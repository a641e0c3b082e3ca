//! Host/guest value conversion.
//!
//! Structured values always cross the boundary through a JSON
//! stringify/parse round trip, so the receiving side never shares storage
//! with the sender.

use hs_core::{MarshalError, SandboxValue};
use rhai::{Dynamic, EvalAltResult, FnPtr, Position, FLOAT, INT};
use serde_json::Value;

/// Largest magnitude that still converts to an exact integer.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn to_guest(value: &SandboxValue) -> Result<Dynamic, MarshalError> {
    match value {
        SandboxValue::Undefined | SandboxValue::Null => Ok(Dynamic::UNIT),
        SandboxValue::Bool(value) => Ok(Dynamic::from(*value)),
        SandboxValue::Number(value) => Ok(number_to_dynamic(*value)),
        SandboxValue::String(value) => Ok(Dynamic::from(value.clone())),
        SandboxValue::Array(_) | SandboxValue::Object(_) => {
            let text = serde_json::to_string(&Value::from(value.clone()))
                .map_err(|error| MarshalError::Stringify(error.to_string()))?;
            let parsed: Value = serde_json::from_str(&text)
                .map_err(|error| MarshalError::Parse(error.to_string()))?;
            rhai::serde::to_dynamic(parsed).map_err(|error| MarshalError::Parse(error.to_string()))
        }
    }
}

fn number_to_dynamic(value: f64) -> Dynamic {
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        Dynamic::from(value as INT)
    } else {
        Dynamic::from(value as FLOAT)
    }
}

/// Converts a guest value to its host model. Arrays and maps are first
/// checked against `max_depth`, which also stops self-referential shared
/// values, and then stringified and re-parsed.
pub fn to_host(value: &Dynamic, max_depth: usize) -> Result<SandboxValue, MarshalError> {
    let value = value.flatten_clone();
    if value.is_unit() {
        return Ok(SandboxValue::Undefined);
    }
    if let Ok(value) = value.as_bool() {
        return Ok(SandboxValue::Bool(value));
    }
    if let Ok(value) = value.as_int() {
        return Ok(SandboxValue::Number(value as f64));
    }
    if let Ok(value) = value.as_float() {
        return Ok(SandboxValue::Number(value));
    }
    if let Ok(value) = value.as_char() {
        return Ok(SandboxValue::String(value.to_string()));
    }
    if value.is_string() {
        let text = value
            .into_string()
            .map_err(|type_name| MarshalError::NotTransportable(type_name.to_string()))?;
        return Ok(SandboxValue::String(text));
    }
    if value.is_array() || value.is_map() {
        check_transportable(&value, 0, max_depth)?;
        let text = serde_json::to_string(&value)
            .map_err(|error| MarshalError::Stringify(error.to_string()))?;
        let parsed: Value =
            serde_json::from_str(&text).map_err(|error| MarshalError::Parse(error.to_string()))?;
        return Ok(SandboxValue::from(parsed));
    }
    Err(MarshalError::NotTransportable(type_label(&value)))
}

fn is_scalar(value: &Dynamic) -> bool {
    value.is_unit()
        || value.is_bool()
        || value.is_int()
        || value.is_float()
        || value.is_char()
        || value.is_string()
}

/// Fails on nesting past `max_depth` and on anything JSON cannot carry.
fn check_transportable(value: &Dynamic, depth: usize, max_depth: usize) -> Result<(), MarshalError> {
    let value = value.flatten_clone();
    if is_scalar(&value) {
        return Ok(());
    }
    if depth >= max_depth && (value.is_array() || value.is_map()) {
        return Err(MarshalError::TooDeep(max_depth));
    }
    if let Ok(items) = value.as_array_ref() {
        return items
            .iter()
            .try_for_each(|item| check_transportable(item, depth + 1, max_depth));
    }
    if let Ok(entries) = value.as_map_ref() {
        return entries
            .values()
            .try_for_each(|item| check_transportable(item, depth + 1, max_depth));
    }
    Err(MarshalError::NotTransportable(type_label(&value)))
}

fn type_label(value: &Dynamic) -> String {
    if value.is_fnptr() {
        "function".to_string()
    } else {
        value.type_name().to_string()
    }
}

/// Renders a callable the way assertion messages name it.
pub fn function_label(function: &FnPtr) -> String {
    if function.is_anonymous() {
        "[Function]".to_string()
    } else {
        format!("[Function: {}]", function.fn_name())
    }
}

/// Like [`to_host`], but callables become their label and other
/// untransportable values their type name. Used where output is only shown.
pub fn to_host_lossy(value: &Dynamic, max_depth: usize) -> SandboxValue {
    if let Some(function) = value.read_lock::<FnPtr>() {
        return SandboxValue::String(function_label(&function));
    }
    match to_host(value, max_depth) {
        Ok(value) => value,
        Err(MarshalError::NotTransportable(type_name)) => SandboxValue::String(type_name),
        Err(error) => SandboxValue::String(error.to_string()),
    }
}

/// Guest-visible runtime error, catchable with `try`/`catch`.
pub fn guest_error(message: impl Into<String>) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message.into()),
        Position::NONE,
    ))
}
