use hs_core::{ExecutionError, ResponseSnapshot, SandboxValue};
use rhai::{Dynamic, EvalAltResult, Map};
use serde_json::Value;

use super::insert_fn;
use crate::marshal::{guest_error, to_guest};
use crate::module::{CapabilityModule, InitContext, MountLocation};
use crate::session::{Handle, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseShape {
    /// `{ status, headers, body }` with the body as given.
    Plain,
    /// `{ statusCode, statusText, headers, responseTime, body }` where the
    /// body offers `asJSON()`, `asText()` and `bytes()`.
    Accessors,
}

/// Read-only view of the response under test.
pub struct ResponseModule {
    id: &'static str,
    shape: ResponseShape,
}

impl ResponseModule {
    /// `pw.response`.
    pub fn plain() -> Self {
        Self {
            id: "pw.response",
            shape: ResponseShape::Plain,
        }
    }

    /// `hopp.response`.
    pub fn with_accessors() -> Self {
        Self {
            id: "hopp.response",
            shape: ResponseShape::Accessors,
        }
    }
}

impl CapabilityModule for ResponseModule {
    fn id(&self) -> &'static str {
        self.id
    }

    fn mount(&self) -> MountLocation {
        MountLocation::Namespaced("response")
    }

    fn create(
        &mut self,
        session: &mut Session,
        ctx: &mut InitContext,
    ) -> Result<Handle, ExecutionError> {
        let Some(response) = &ctx.response else {
            return Err(ExecutionError::Initialization(
                "Test scripts need a response snapshot".to_string(),
            ));
        };
        match self.shape {
            ResponseShape::Plain => Ok(session.alloc_value(&response.to_value())?),
            ResponseShape::Accessors => {
                let object = accessor_object(response)?;
                Ok(session.alloc(Dynamic::from_map(object)))
            }
        }
    }
}

fn accessor_object(response: &ResponseSnapshot) -> Result<Map, ExecutionError> {
    let plain = response.to_value();
    let headers = plain
        .as_object()
        .and_then(|object| object.get("headers"))
        .cloned()
        .unwrap_or(SandboxValue::Array(Vec::new()));

    let mut body = Map::new();
    let source = response.body.clone();
    insert_fn(&mut body, "asJSON", move |_, _| body_json(&source))?;
    let source = response.body.clone();
    insert_fn(&mut body, "asText", move |_, _| {
        body_text(&source, "asText").map(Dynamic::from)
    })?;
    let source = response.body.clone();
    insert_fn(&mut body, "bytes", move |_, _| {
        let text = body_text(&source, "bytes")?;
        Ok(Dynamic::from_blob(text.into_bytes()))
    })?;

    let mut object = Map::new();
    object.insert("statusCode".into(), Dynamic::from(i64::from(response.status)));
    object.insert("statusText".into(), Dynamic::from(response.status_text.clone()));
    object.insert("headers".into(), to_guest(&headers)?);
    object.insert(
        "responseTime".into(),
        Dynamic::from(i64::try_from(response.response_time).unwrap_or(i64::MAX)),
    );
    object.insert("body".into(), Dynamic::from_map(body));
    Ok(object)
}

/// Strings are parsed as JSON, arrays and objects are returned as they are.
fn body_json(body: &SandboxValue) -> Result<Dynamic, Box<EvalAltResult>> {
    let value = match body {
        SandboxValue::Undefined | SandboxValue::Null => return Ok(Dynamic::UNIT),
        SandboxValue::String(text) => serde_json::from_str::<Value>(text)
            .map(SandboxValue::from)
            .map_err(|_| guest_error("Invalid JSON string"))?,
        SandboxValue::Array(_) | SandboxValue::Object(_) => body.clone(),
        SandboxValue::Bool(_) | SandboxValue::Number(_) => {
            return Err(guest_error(
                "Unsupported input type for hopp.response.asJSON(). Expected string or object.",
            ))
        }
    };
    to_guest(&value).map_err(|error| guest_error(error.to_string()))
}

/// Strings pass through, arrays and objects are stringified.
fn body_text(body: &SandboxValue, accessor: &str) -> Result<String, Box<EvalAltResult>> {
    match body {
        SandboxValue::Undefined | SandboxValue::Null => Ok(String::new()),
        SandboxValue::String(text) => Ok(text.clone()),
        SandboxValue::Array(_) | SandboxValue::Object(_) => Ok(body.to_json_text()),
        SandboxValue::Bool(_) | SandboxValue::Number(_) => Err(guest_error(format!(
            "Unsupported input type for hopp.response.{}()",
            accessor
        ))),
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;

    use crate::session::guest_error_message;

    #[test]
    fn json_accessor_parses_strings_and_keeps_structures() {
        let parsed = body_json(&SandboxValue::string(r#"{"id": 7}"#)).expect("valid json");
        let map = parsed.try_cast::<Map>().expect("object");
        assert_eq!(map.get("id").and_then(|value| value.as_int().ok()), Some(7));

        assert!(body_json(&SandboxValue::Null).expect("null body").is_unit());

        let error = body_json(&SandboxValue::string("{oops")).expect_err("invalid json");
        assert_eq!(guest_error_message(&error), "Invalid JSON string");

        let error = body_json(&SandboxValue::Number(1.0)).expect_err("number body");
        assert_eq!(
            guest_error_message(&error),
            "Unsupported input type for hopp.response.asJSON(). Expected string or object."
        );
    }

    #[test]
    fn text_accessor_stringifies_structures() {
        let body: SandboxValue = serde_json::from_str(r#"{"a": [1, 2]}"#).expect("json parses");
        assert_eq!(body_text(&body, "asText").expect("object body"), r#"{"a":[1,2]}"#);
        assert_eq!(body_text(&SandboxValue::Undefined, "asText").expect("empty"), "");
        let error = body_text(&SandboxValue::Bool(true), "bytes").expect_err("bool body");
        assert_eq!(
            guest_error_message(&error),
            "Unsupported input type for hopp.response.bytes()"
        );
    }
}
