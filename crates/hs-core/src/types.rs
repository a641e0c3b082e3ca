use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::request::RequestSnapshot;
use crate::value::SandboxValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariable {
    pub key: String,
    #[serde(alias = "value")]
    pub current_value: String,
    #[serde(default)]
    pub initial_value: String,
    #[serde(default)]
    pub secret: bool,
}

impl EnvironmentVariable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            key: key.into(),
            initial_value: value.clone(),
            current_value: value,
            secret: false,
        }
    }

    pub fn secret(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            secret: true,
            ..Self::new(key, value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvironmentSet {
    #[serde(default)]
    pub selected: Vec<EnvironmentVariable>,
    #[serde(default)]
    pub global: Vec<EnvironmentVariable>,
}

pub type Artifacts = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectStatus {
    Pass,
    Fail,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectResult {
    pub status: ExpectStatus,
    pub message: String,
}

impl ExpectResult {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            status: ExpectStatus::Pass,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: ExpectStatus::Fail,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ExpectStatus::Error,
            message: message.into(),
        }
    }

    pub fn from_assertion(passed: bool, message: impl Into<String>) -> Self {
        if passed {
            Self::pass(message)
        } else {
            Self::fail(message)
        }
    }
}

pub const ROOT_DESCRIPTOR: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDescriptor {
    pub descriptor: String,
    #[serde(default)]
    pub expect_results: Vec<ExpectResult>,
    #[serde(default)]
    pub children: Vec<TestDescriptor>,
}

impl TestDescriptor {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            expect_results: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(ROOT_DESCRIPTOR)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleEntry {
    pub line_number: usize,
    pub data: Vec<SandboxValue>,
    #[serde(rename = "type")]
    pub level: ConsoleLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSnapshot {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: Vec<ResponseHeader>,
    #[serde(default)]
    pub body: SandboxValue,
    /// Milliseconds between sending the request and the full response.
    #[serde(default)]
    pub response_time: u64,
}

impl ResponseSnapshot {
    /// Guest-facing `{ status, headers, body }` object.
    pub fn to_value(&self) -> SandboxValue {
        let headers = self
            .headers
            .iter()
            .map(|header| {
                SandboxValue::Object(BTreeMap::from([
                    ("key".to_string(), SandboxValue::string(&header.key)),
                    ("value".to_string(), SandboxValue::string(&header.value)),
                ]))
            })
            .collect();
        SandboxValue::Object(BTreeMap::from([
            ("status".to_string(), SandboxValue::Number(f64::from(self.status))),
            ("headers".to_string(), SandboxValue::Array(headers)),
            ("body".to_string(), self.body.clone()),
        ]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptMode {
    PreRequest,
    Test,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptExecutionRequest {
    pub script: String,
    pub mode: ScriptMode,
    #[serde(default)]
    pub env: EnvironmentSet,
    #[serde(default)]
    pub response: Option<ResponseSnapshot>,
    #[serde(default)]
    pub artifacts: Option<Artifacts>,
    #[serde(default)]
    pub request: Option<RequestSnapshot>,
}

impl ScriptExecutionRequest {
    pub fn pre_request(script: impl Into<String>, env: EnvironmentSet) -> Self {
        Self {
            script: script.into(),
            mode: ScriptMode::PreRequest,
            env,
            response: None,
            artifacts: None,
            request: None,
        }
    }

    pub fn test(script: impl Into<String>, env: EnvironmentSet, response: ResponseSnapshot) -> Self {
        Self {
            script: script.into(),
            mode: ScriptMode::Test,
            env,
            response: Some(response),
            artifacts: None,
            request: None,
        }
    }
}

/// Accumulated outcome of one run, folded together by module completion hooks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub env: EnvironmentSet,
    pub artifacts: Artifacts,
    pub tests: Option<TestDescriptor>,
    pub consoles: Vec<ConsoleEntry>,
    /// The request as a pre-request script left it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestSnapshot>,
}

impl Report {
    pub fn into_pre_request(self) -> PreRequestReport {
        PreRequestReport {
            env: self.env,
            artifacts: self.artifacts,
            consoles: self.consoles,
            updated_request: self.request,
        }
    }

    pub fn into_test(self) -> TestReport {
        TestReport {
            tests: self.tests.unwrap_or_else(TestDescriptor::root),
            env: self.env,
            consoles: self.consoles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreRequestReport {
    pub env: EnvironmentSet,
    pub artifacts: Artifacts,
    pub consoles: Vec<ConsoleEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_request: Option<RequestSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub tests: TestDescriptor,
    pub env: EnvironmentSet,
    pub consoles: Vec<ConsoleEntry>,
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn environment_variable_accepts_legacy_value_field() {
        let parsed: EnvironmentVariable =
            serde_json::from_str(r#"{"key":"bob","value":"oldbob"}"#).expect("variable parses");
        assert_eq!(parsed.current_value, "oldbob");
        assert_eq!(parsed.initial_value, "");
        assert!(!parsed.secret);
    }

    #[test]
    fn test_descriptor_serializes_camel_case() {
        let mut descriptor = TestDescriptor::new("A");
        descriptor.expect_results.push(ExpectResult::pass("ok"));
        let json = serde_json::to_value(&descriptor).expect("descriptor serializes");
        assert_eq!(
            json,
            serde_json::json!({
                "descriptor": "A",
                "expectResults": [{"status": "pass", "message": "ok"}],
                "children": []
            })
        );
    }

    #[test]
    fn console_entry_uses_type_field() {
        let entry = ConsoleEntry {
            line_number: 3,
            data: vec![SandboxValue::string("hi")],
            level: ConsoleLevel::Warn,
        };
        let json = serde_json::to_value(&entry).expect("entry serializes");
        assert_eq!(
            json,
            serde_json::json!({"lineNumber": 3, "data": ["hi"], "type": "warn"})
        );
    }

    #[test]
    fn script_mode_uses_kebab_case() {
        let mode: ScriptMode = serde_json::from_str(r#""pre-request""#).expect("mode parses");
        assert_eq!(mode, ScriptMode::PreRequest);
    }

    #[test]
    fn response_snapshot_defaults_status_text_and_timing() {
        let response: ResponseSnapshot =
            serde_json::from_str(r#"{"status": 204}"#).expect("response parses");
        assert_eq!(response.status_text, "");
        assert_eq!(response.response_time, 0);
        assert_eq!(response.body, SandboxValue::Undefined);
    }

    #[test]
    fn pre_request_projection_carries_the_edited_request() {
        let report = Report {
            request: Some(RequestSnapshot::default()),
            ..Report::default()
        };
        let json = serde_json::to_value(report.into_pre_request()).expect("report serializes");
        assert_eq!(json["updatedRequest"]["method"], "GET");
        let json = serde_json::to_value(Report::default().into_pre_request())
            .expect("report serializes");
        assert!(json.get("updatedRequest").is_none());
    }

    #[test]
    fn report_projection_defaults_missing_tree_to_root() {
        let report = Report::default().into_test();
        assert_eq!(report.tests, TestDescriptor::root());
    }

    #[test]
    fn response_snapshot_exposes_header_objects() {
        let response = ResponseSnapshot {
            status: 200,
            headers: vec![ResponseHeader {
                key: "content-type".to_string(),
                value: "application/json".to_string(),
            }],
            body: SandboxValue::string("{}"),
            status_text: "OK".to_string(),
            response_time: 12,
        };
        let value = response.to_value();
        let object = value.as_object().expect("object");
        assert_eq!(object.get("status"), Some(&SandboxValue::Number(200.0)));
        assert_eq!(
            object
                .get("headers")
                .and_then(SandboxValue::as_array)
                .map(|headers| headers.len()),
            Some(1)
        );
    }
}
