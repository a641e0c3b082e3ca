use hs_core::{
    Artifacts, ConsoleEntry, EnvironmentSet, RequestSnapshot, ResponseSnapshot, ScriptMode,
    TestDescriptor,
};
use serde::{Deserialize, Serialize};

pub const TESTCASE_SCHEMA_V1: &str = "hs-tool-case.v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub schema_version: String,
    pub mode: ScriptMode,
    pub script: ScriptSource,
    #[serde(default)]
    pub env: EnvironmentSet,
    #[serde(default)]
    pub response: Option<ResponseSnapshot>,
    #[serde(default)]
    pub artifacts: Option<Artifacts>,
    #[serde(default)]
    pub request: Option<RequestSnapshot>,
    #[serde(default)]
    pub expect: CaseExpectation,
}

/// Script text, either as one string or as lines joined with newlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptSource {
    Text(String),
    Lines(Vec<String>),
}

impl ScriptSource {
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Lines(lines) => lines.join("\n"),
        }
    }
}

/// Report fragments to compare. Absent fields are not checked.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseExpectation {
    #[serde(default)]
    pub env: Option<EnvironmentSet>,
    #[serde(default)]
    pub artifacts: Option<Artifacts>,
    #[serde(default)]
    pub tests: Option<TestDescriptor>,
    #[serde(default)]
    pub consoles: Option<Vec<ConsoleEntry>>,
    #[serde(default)]
    pub request: Option<RequestSnapshot>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod case_tests {
    use super::*;

    #[test]
    fn script_lines_join_with_newlines() {
        let source = ScriptSource::Lines(vec!["let a = 1;".to_string(), "a += 1;".to_string()]);
        assert_eq!(source.text(), "let a = 1;\na += 1;");
        assert_eq!(ScriptSource::Text("x".to_string()).text(), "x");
    }

    #[test]
    fn testcase_deserialize_applies_defaults() {
        let parsed: TestCase = serde_json::from_str(
            r#"{
  "schemaVersion": "hs-tool-case.v1",
  "mode": "pre-request",
  "script": ["pw.env.set(\"a\", \"b\");"]
}"#,
        )
        .expect("testcase should deserialize");

        assert_eq!(parsed.schema_version, TESTCASE_SCHEMA_V1);
        assert_eq!(parsed.mode, ScriptMode::PreRequest);
        assert!(matches!(parsed.script, ScriptSource::Lines(_)));
        assert_eq!(parsed.env, EnvironmentSet::default());
        assert!(parsed.response.is_none());
        assert_eq!(parsed.expect, CaseExpectation::default());
    }

    #[test]
    fn expectation_reads_test_tree_and_error() {
        let parsed: CaseExpectation = serde_json::from_str(
            r#"{
  "tests": {"descriptor": "root", "expectResults": [{"status": "pass", "message": "ok"}]},
  "error": "Script evaluation failed: boom"
}"#,
        )
        .expect("expectation should deserialize");
        let tests = parsed.tests.expect("tests");
        assert_eq!(tests.descriptor, "root");
        assert!(tests.children.is_empty());
        assert_eq!(parsed.error.as_deref(), Some("Script evaluation failed: boom"));
    }
}
