use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::SandboxValue;

/// One `{ key, value, active }` row of a header, param or request variable
/// list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEntry {
    pub key: String,
    pub value: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RequestEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            active: true,
        }
    }
}

/// The outgoing request a script sees as `hopp.request`. Pre-request
/// scripts may edit it and the edited copy is returned in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestSnapshot {
    pub url: String,
    pub method: String,
    pub headers: Vec<RequestEntry>,
    pub params: Vec<RequestEntry>,
    pub body: SandboxValue,
    pub auth: SandboxValue,
    pub variables: Vec<RequestEntry>,
}

impl Default for RequestSnapshot {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "GET".to_string(),
            headers: Vec::new(),
            params: Vec::new(),
            body: SandboxValue::Null,
            auth: SandboxValue::Null,
            variables: Vec::new(),
        }
    }
}

impl RequestSnapshot {
    /// Replaces the first header named `key`, compared case-insensitively,
    /// or appends a new active one.
    pub fn set_header(&mut self, key: &str, value: &str) {
        if !upsert(&mut self.headers, value, |entry| entry.key.eq_ignore_ascii_case(key)) {
            self.headers.push(RequestEntry::new(key, value));
        }
    }

    /// Drops every header named `key`, compared case-insensitively.
    pub fn remove_header(&mut self, key: &str) {
        self.headers.retain(|entry| !entry.key.eq_ignore_ascii_case(key));
    }

    pub fn set_param(&mut self, key: &str, value: &str) {
        if !upsert(&mut self.params, value, |entry| entry.key == key) {
            self.params.push(RequestEntry::new(key, value));
        }
    }

    pub fn remove_param(&mut self, key: &str) {
        self.params.retain(|entry| entry.key != key);
    }

    /// Value of the first active request variable named `key`.
    pub fn variable(&self, key: &str) -> Option<String> {
        self.variables
            .iter()
            .find(|entry| entry.active && entry.key == key)
            .map(|entry| entry.value.clone())
    }

    pub fn set_variable(&mut self, key: &str, value: &str) {
        if !upsert(&mut self.variables, value, |entry| entry.key == key) {
            self.variables.push(RequestEntry::new(key, value));
        }
    }

    /// Guest view of a header, param or variable list.
    pub fn entries_value(entries: &[RequestEntry]) -> SandboxValue {
        serde_json::to_value(entries)
            .map(SandboxValue::from)
            .unwrap_or(SandboxValue::Array(Vec::new()))
    }

    /// Reads a guest list of `{ key, value, active? }` objects.
    pub fn entries_from_value(value: &SandboxValue) -> Option<Vec<RequestEntry>> {
        if !matches!(value, SandboxValue::Array(_)) {
            return None;
        }
        serde_json::from_value(Value::from(value.clone())).ok()
    }
}

/// Sets the value of the first matching entry. `false` when none matched.
fn upsert<F>(entries: &mut [RequestEntry], value: &str, matches: F) -> bool
where
    F: Fn(&RequestEntry) -> bool,
{
    match entries.iter_mut().find(|entry| matches(entry)) {
        Some(entry) => {
            entry.value = value.to_string();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod request_tests {
    use super::*;

    fn keys(entries: &[RequestEntry]) -> Vec<(&str, &str)> {
        entries
            .iter()
            .map(|entry| (entry.key.as_str(), entry.value.as_str()))
            .collect()
    }

    #[test]
    fn headers_match_case_insensitively() {
        let mut request = RequestSnapshot {
            headers: vec![RequestEntry::new("Content-Type", "text/plain")],
            ..RequestSnapshot::default()
        };
        request.set_header("content-type", "application/json");
        request.set_header("X-Trace", "1");
        assert_eq!(
            keys(&request.headers),
            vec![("Content-Type", "application/json"), ("X-Trace", "1")]
        );

        request.remove_header("x-trace");
        assert_eq!(keys(&request.headers), vec![("Content-Type", "application/json")]);
    }

    #[test]
    fn params_match_exactly() {
        let mut request = RequestSnapshot::default();
        request.set_param("page", "1");
        request.set_param("Page", "2");
        request.set_param("page", "3");
        assert_eq!(keys(&request.params), vec![("page", "3"), ("Page", "2")]);
        request.remove_param("Page");
        assert_eq!(keys(&request.params), vec![("page", "3")]);
    }

    #[test]
    fn inactive_variables_are_not_visible() {
        let mut request = RequestSnapshot::default();
        request.variables.push(RequestEntry {
            key: "id".to_string(),
            value: "7".to_string(),
            active: false,
        });
        assert_eq!(request.variable("id"), None);
        request.set_variable("id", "8");
        request.variables[0].active = true;
        assert_eq!(request.variable("id").as_deref(), Some("8"));
    }

    #[test]
    fn snapshot_defaults_missing_fields() {
        let request: RequestSnapshot =
            serde_json::from_str(r#"{"url": "https://example.com", "headers": [{"key": "a", "value": "b"}]}"#)
                .expect("request parses");
        assert_eq!(request.method, "GET");
        assert!(request.headers[0].active);
        assert_eq!(request.body, SandboxValue::Null);
    }

    #[test]
    fn entry_lists_need_key_and_value() {
        let good: SandboxValue =
            serde_json::from_str(r#"[{"key": "a", "value": "1"}]"#).expect("json parses");
        assert_eq!(
            RequestSnapshot::entries_from_value(&good),
            Some(vec![RequestEntry::new("a", "1")])
        );
        let bad: SandboxValue = serde_json::from_str(r#"[{"key": "a"}]"#).expect("json parses");
        assert_eq!(RequestSnapshot::entries_from_value(&bad), None);
        assert_eq!(
            RequestSnapshot::entries_from_value(&SandboxValue::string("a")),
            None
        );
    }
}
