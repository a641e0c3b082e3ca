use std::collections::BTreeMap;

use crate::types::ExpectResult;
use crate::value::SandboxValue;

use super::format::{compile_regex_literal, format_value, split_regex_literal};
use super::{to_number, Expectation, Subject};

/// Result of invoking the callable under test, supplied by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThrowOutcome {
    Returned,
    Threw { message: String },
}

/// Result of invoking a `satisfy` predicate, supplied by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum SatisfyOutcome {
    NotAFunction,
    Threw { message: String },
    Returned { label: String, value: SandboxValue },
}

#[derive(Debug, Clone, PartialEq)]
enum PathKey {
    Name(String),
    Index(usize),
}

fn push_key(current: &mut String, bracket: bool, keys: &mut Vec<PathKey>) {
    if current.is_empty() {
        return;
    }
    let key = match current.parse::<usize>() {
        Ok(index) if bracket => PathKey::Index(index),
        _ => PathKey::Name(current.clone()),
    };
    keys.push(key);
    current.clear();
}

/// Splits `a.b[1].c` into keys.
fn parse_nested_path(path: &str) -> Vec<PathKey> {
    let mut keys = Vec::new();
    let mut current = String::new();
    let mut in_bracket = false;

    for ch in path.chars() {
        match ch {
            '.' if !in_bracket => push_key(&mut current, false, &mut keys),
            '[' => {
                push_key(&mut current, false, &mut keys);
                in_bracket = true;
            }
            ']' => {
                push_key(&mut current, true, &mut keys);
                in_bracket = false;
            }
            _ => current.push(ch),
        }
    }
    push_key(&mut current, false, &mut keys);
    keys
}

fn child(value: &SandboxValue, key: &PathKey) -> Option<SandboxValue> {
    match (value, key) {
        (SandboxValue::Object(entries), PathKey::Name(name)) => entries.get(name).cloned(),
        (SandboxValue::Object(entries), PathKey::Index(index)) => {
            entries.get(&index.to_string()).cloned()
        }
        (SandboxValue::Array(items), PathKey::Index(index)) => items.get(*index).cloned(),
        (SandboxValue::Array(items), PathKey::Name(name)) => {
            if name == "length" {
                Some(SandboxValue::Number(items.len() as f64))
            } else {
                name.parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index).cloned())
            }
        }
        _ => None,
    }
}

fn lookup_path(value: &SandboxValue, keys: &[PathKey]) -> Option<SandboxValue> {
    let mut current = value.clone();
    for key in keys {
        current = child(&current, key)?;
    }
    Some(current)
}

fn is_object_like(value: &SandboxValue) -> bool {
    matches!(value, SandboxValue::Array(_) | SandboxValue::Object(_))
}

fn object_keys(value: &SandboxValue) -> Vec<String> {
    match value {
        SandboxValue::Object(entries) => entries.keys().cloned().collect(),
        SandboxValue::Array(items) => (0..items.len()).map(|index| index.to_string()).collect(),
        _ => Vec::new(),
    }
}

fn includes_member(items: &[SandboxValue], needle: &SandboxValue, deep: bool) -> bool {
    items.iter().any(|item| {
        if deep {
            item.deep_equals(needle)
        } else {
            item.same_value_zero(needle)
        }
    })
}

fn includes_object(
    entries: &BTreeMap<String, SandboxValue>,
    needle: &SandboxValue,
    deep: bool,
) -> bool {
    let Some(needle) = needle.as_object() else {
        return false;
    };
    needle.iter().all(|(key, expected)| match entries.get(key) {
        Some(actual) if deep => actual.deep_equals(expected),
        Some(actual) => actual.strict_equals(expected),
        None => !deep && matches!(expected, SandboxValue::Undefined),
    })
}

fn article(type_name: &str) -> &'static str {
    match type_name.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

impl Expectation {
    fn subject_text(&self) -> String {
        self.subject.format()
    }

    pub fn equal(&self, expected: &SandboxValue) -> ExpectResult {
        let actual = self.subject.value();
        let is_value = matches!(self.subject, Subject::Value(_));
        let assertion = is_value
            && if self.flags.deep {
                actual.deep_equals(expected)
            } else {
                actual.strict_equals(expected)
            };
        let message = format!(
            "Expected {} to{} equal {}",
            self.subject_text(),
            if self.flags.deep { " deep" } else { "" },
            format_value(expected)
        );
        self.report(assertion, message)
    }

    pub fn eql(&self, expected: &SandboxValue) -> ExpectResult {
        let assertion =
            matches!(self.subject, Subject::Value(_)) && self.subject.value().deep_equals(expected);
        let message = format!(
            "Expected {} to eql {}",
            self.subject_text(),
            format_value(expected)
        );
        self.report(assertion, message)
    }

    /// `a(type)` / `an(type)`. `"array"` and `"null"` are recognised besides
    /// the `typeof` names.
    pub fn a(&self, type_name: &str) -> ExpectResult {
        let actual = self.subject.value();
        let assertion = match (type_name, &self.subject) {
            ("function", subject) => matches!(subject, Subject::Function { .. }),
            (_, Subject::Function { .. }) => false,
            ("null", _) => matches!(actual, SandboxValue::Null),
            ("undefined", _) => matches!(actual, SandboxValue::Undefined),
            ("array", _) => matches!(actual, SandboxValue::Array(_)),
            (name, _) => actual.type_of() == name,
        };
        let message = format!(
            "Expected {} to be {} {}",
            self.subject_text(),
            article(type_name),
            type_name
        );
        self.report(assertion, message)
    }

    pub fn ok(&self) -> ExpectResult {
        let assertion = match &self.subject {
            Subject::Value(value) => value.is_truthy(),
            Subject::Function { .. } => true,
        };
        self.report(assertion, format!("Expected {} to be ok", self.subject_text()))
    }

    pub fn exist(&self) -> ExpectResult {
        let assertion = match &self.subject {
            Subject::Value(value) => !value.is_nullish(),
            Subject::Function { .. } => true,
        };
        self.report(assertion, format!("Expected {} to exist", self.subject_text()))
    }

    pub fn undefined(&self) -> ExpectResult {
        let assertion = matches!(self.subject, Subject::Value(SandboxValue::Undefined));
        self.report(assertion, format!("Expected {} to be undefined", self.subject_text()))
    }

    pub fn nan(&self) -> ExpectResult {
        let assertion = self.subject.value().as_number().is_some_and(f64::is_nan);
        self.report(assertion, format!("Expected {} to be NaN", self.subject_text()))
    }

    pub fn finite(&self) -> ExpectResult {
        let assertion = self.subject.value().as_number().is_some_and(f64::is_finite);
        self.report(assertion, format!("Expected {} to be finite", self.subject_text()))
    }

    pub fn empty(&self) -> ExpectResult {
        let assertion = match self.subject.value() {
            SandboxValue::String(text) => text.is_empty(),
            SandboxValue::Array(items) => items.is_empty(),
            SandboxValue::Object(entries) => entries.is_empty(),
            _ => false,
        };
        self.report(assertion, format!("Expected {} to be empty", self.subject_text()))
    }

    fn compare(&self, verb: &str, bound: &SandboxValue, check: fn(f64, f64) -> bool) -> ExpectResult {
        let actual = to_number(self.subject.value());
        let assertion = check(actual, to_number(bound));
        let message = format!(
            "Expected {} to be {} {}",
            self.subject_text(),
            verb,
            bound.to_js_string()
        );
        self.report(assertion, message)
    }

    pub fn above(&self, bound: &SandboxValue) -> ExpectResult {
        self.compare("above", bound, |actual, bound| actual > bound)
    }

    pub fn below(&self, bound: &SandboxValue) -> ExpectResult {
        self.compare("below", bound, |actual, bound| actual < bound)
    }

    pub fn least(&self, bound: &SandboxValue) -> ExpectResult {
        self.compare("at least", bound, |actual, bound| actual >= bound)
    }

    pub fn most(&self, bound: &SandboxValue) -> ExpectResult {
        self.compare("at most", bound, |actual, bound| actual <= bound)
    }

    pub fn within(&self, start: &SandboxValue, finish: &SandboxValue) -> ExpectResult {
        let actual = to_number(self.subject.value());
        let assertion = actual >= to_number(start) && actual <= to_number(finish);
        let message = format!(
            "Expected {} to be within {}, {}",
            self.subject_text(),
            start.to_js_string(),
            finish.to_js_string()
        );
        self.report(assertion, message)
    }

    /// `closeTo` and `approximately`; `verb` is the name used in the message.
    pub fn close_to(&self, verb: &str, expected: &SandboxValue, delta: &SandboxValue) -> ExpectResult {
        let actual = to_number(self.subject.value());
        let assertion = (actual - to_number(expected)).abs() <= to_number(delta);
        let message = format!(
            "Expected {} to be {} {}, {}",
            self.subject_text(),
            verb,
            expected.to_js_string(),
            delta.to_js_string()
        );
        self.report(assertion, message)
    }

    /// `include` and `contain`; `verb` is the name used in the message.
    pub fn include(&self, verb: &str, needle: &SandboxValue) -> ExpectResult {
        let deep = self.flags.deep;
        let assertion = match self.subject.value() {
            SandboxValue::String(text) => text.contains(&needle.to_js_string()),
            SandboxValue::Array(items) => includes_member(items, needle, deep),
            SandboxValue::Object(entries) => includes_object(entries, needle, deep),
            _ => false,
        };
        let message = format!(
            "Expected {} to{} {} {}",
            self.subject_text(),
            if deep { " deep" } else { "" },
            verb,
            format_value(needle)
        );
        self.report(assertion, message)
    }

    pub fn property(&self, name: &str, expected: Option<&SandboxValue>) -> ExpectResult {
        let actual = self.subject.value();
        if !is_object_like(actual) {
            return self.report(false, format!("Expected {} to be an object", self.subject_text()));
        }

        let nested = self.flags.nested;
        let found = if nested {
            lookup_path(actual, &parse_nested_path(name))
        } else {
            child(actual, &PathKey::Name(name.to_string()))
        };
        let property_word = if nested { "nested property" } else { "property" };

        let Some(found) = found else {
            return self.report(
                false,
                format!(
                    "Expected {} to have {} '{}'",
                    self.subject_text(),
                    property_word,
                    name
                ),
            );
        };

        match expected.filter(|value| !matches!(value, SandboxValue::Undefined)) {
            Some(expected) => {
                let assertion = if self.flags.deep {
                    found.deep_equals(expected)
                } else {
                    found.strict_equals(expected)
                };
                let property_word = if nested {
                    "nested property"
                } else if self.flags.deep {
                    "deep property"
                } else {
                    "property"
                };
                let message = format!(
                    "Expected {} to have {} '{}', {}",
                    self.subject_text(),
                    property_word,
                    name,
                    format_value(expected)
                );
                self.report(assertion, message)
            }
            None => self.report(
                true,
                format!(
                    "Expected {} to have {} '{}'",
                    self.subject_text(),
                    property_word,
                    name
                ),
            ),
        }
    }

    pub fn own_property(&self, name: &str, expected: Option<&SandboxValue>) -> ExpectResult {
        let actual = self.subject.value();
        if !is_object_like(actual) {
            return self.report(false, format!("Expected {} to be an object", self.subject_text()));
        }
        let Some(found) = child(actual, &PathKey::Name(name.to_string())) else {
            return self.report(
                false,
                format!("Expected {} to have own property '{}'", self.subject_text(), name),
            );
        };
        match expected.filter(|value| !matches!(value, SandboxValue::Undefined)) {
            Some(expected) => {
                let assertion = if self.flags.deep {
                    found.deep_equals(expected)
                } else {
                    found.strict_equals(expected)
                };
                let message = format!(
                    "Expected {} to have {} '{}', {}",
                    self.subject_text(),
                    if self.flags.deep { "deep own property" } else { "own property" },
                    name,
                    format_value(expected)
                );
                self.report(assertion, message)
            }
            None => self.report(
                true,
                format!("Expected {} to have own property '{}'", self.subject_text(), name),
            ),
        }
    }

    /// `length(n)` and `lengthOf(n)`; `verb` is the name used in the message.
    pub fn length(&self, verb: &str, expected: &SandboxValue) -> ExpectResult {
        let actual = match self.subject.value() {
            value @ (SandboxValue::String(_) | SandboxValue::Array(_)) => value.js_length(),
            SandboxValue::Object(entries) => Some(entries.len()),
            _ => None,
        };
        let Some(actual) = actual else {
            return self.report(
                false,
                format!("Expected {} to have a length, but it does not", self.subject_text()),
            );
        };
        let assertion = expected
            .as_number()
            .is_some_and(|expected| actual as f64 == expected);
        let message = format!(
            "Expected {} to have {} {}",
            self.subject_text(),
            verb,
            expected.to_js_string()
        );
        self.report(assertion, message)
    }

    /// `match` against a `/pattern/flags` literal; plain strings fall back to
    /// substring search.
    pub fn matches(&self, pattern: &SandboxValue) -> ExpectResult {
        let Some(text) = self.subject.value().as_string() else {
            return self.report(false, format!("Expected {} to be a string", self.subject_text()));
        };
        let (assertion, pattern_text) = match pattern {
            SandboxValue::String(literal) => {
                let assertion = match compile_regex_literal(literal) {
                    Some(regex) => regex.is_match(text),
                    None => text.contains(literal.as_str()),
                };
                (assertion, literal.clone())
            }
            other => (text.contains(&other.to_js_string()), format_value(other)),
        };
        let message = format!(
            "Expected {} to match {}",
            self.subject_text(),
            pattern_text
        );
        self.report(assertion, message)
    }

    pub fn string(&self, needle: &SandboxValue) -> ExpectResult {
        let Some(text) = self.subject.value().as_string() else {
            return self.report(false, format!("Expected {} to be a string", self.subject_text()));
        };
        let assertion = text.contains(&needle.to_js_string());
        let message = format!(
            "Expected {} to have string {}",
            self.subject_text(),
            format_value(needle)
        );
        self.report(assertion, message)
    }

    /// `keys(...)`. Array arguments are flattened by the caller.
    pub fn keys(&self, expected: &[SandboxValue]) -> ExpectResult {
        let actual = self.subject.value();
        if !is_object_like(actual) {
            return self.report(false, format!("Expected {} to be an object", self.subject_text()));
        }
        let actual_keys = object_keys(actual);
        let expected_keys = expected
            .iter()
            .map(SandboxValue::to_js_string)
            .collect::<Vec<_>>();
        let listed = expected_keys
            .iter()
            .map(|key| format!("'{}'", key))
            .collect::<Vec<_>>()
            .join(", ");
        let has = |key: &String| actual_keys.contains(key);
        let exact = expected_keys.len() == actual_keys.len() && expected_keys.iter().all(has);

        let (assertion, phrase) = if self.flags.any {
            (expected_keys.iter().any(has), "have any keys")
        } else if self.flags.all && self.flags.include {
            (expected_keys.iter().all(has), "include all keys")
        } else if self.flags.all {
            (exact, "have all keys")
        } else {
            (exact, "have keys")
        };
        let message = format!("Expected {} to {} {}", self.subject_text(), phrase, listed);
        self.report(assertion, message)
    }

    /// `throws([errorLike[, message]])`. `outcome` is `None` when the subject
    /// is not callable.
    pub fn throws(
        &self,
        outcome: Option<&ThrowOutcome>,
        error_like: Option<&SandboxValue>,
        message_matcher: Option<&SandboxValue>,
    ) -> ExpectResult {
        let subject = self.subject_text();
        let Some(outcome) = outcome else {
            return self.report(false, format!("Expected {} to be a function", subject));
        };
        let ThrowOutcome::Threw { message: thrown } = outcome else {
            return self.report(false, format!("Expected {} to throw", subject));
        };

        let (mut assertion, message) = match error_like {
            None | Some(SandboxValue::Undefined) => (true, format!("Expected {} to throw", subject)),
            Some(SandboxValue::String(expected)) => match split_regex_literal(expected) {
                Some(_) => match compile_regex_literal(expected) {
                    Some(regex) => (
                        regex.is_match(thrown),
                        format!("Expected {} to throw {}", subject, expected),
                    ),
                    None => (
                        thrown == expected,
                        format!("Expected {} to throw '{}'", subject, expected),
                    ),
                },
                None => (
                    thrown == expected,
                    format!("Expected {} to throw '{}'", subject, expected),
                ),
            },
            Some(other) => (false, format!("Expected {} to throw {}", subject, format_value(other))),
        };

        if assertion {
            if let Some(SandboxValue::String(matcher)) = message_matcher {
                assertion = match compile_regex_literal(matcher) {
                    Some(regex) => regex.is_match(thrown),
                    None => thrown == matcher,
                };
            }
        }
        self.report(assertion, message)
    }

    pub fn satisfy(&self, outcome: &SatisfyOutcome) -> ExpectResult {
        match outcome {
            SatisfyOutcome::NotAFunction => {
                self.report(false, "Expected matcher to be a function".to_string())
            }
            SatisfyOutcome::Threw { message } => self.report(
                false,
                format!("Matcher function threw an error: {}", message),
            ),
            SatisfyOutcome::Returned { label, value } => self.report(
                value.is_truthy(),
                format!("Expected {} to satisfy {}", self.subject_text(), label),
            ),
        }
    }

    pub fn members(&self, list: &SandboxValue) -> ExpectResult {
        let Some(items) = self.subject.value().as_array() else {
            return self.report(false, format!("Expected {} to be an array", self.subject_text()));
        };
        let expected = list.as_array().unwrap_or_default();
        let deep = self.flags.deep;
        let same = |left: &SandboxValue, right: &SandboxValue| {
            if deep {
                left.deep_equals(right)
            } else {
                left.same_value_zero(right)
            }
        };

        let (assertion, phrase) = if self.flags.include {
            (
                expected.iter().all(|item| includes_member(items, item, deep)),
                "include members".to_string(),
            )
        } else if self.flags.ordered {
            (
                items.len() == expected.len()
                    && items.iter().zip(expected).all(|(left, right)| same(left, right)),
                "have ordered members".to_string(),
            )
        } else {
            (
                items.len() == expected.len()
                    && expected.iter().all(|item| includes_member(items, item, deep))
                    && items.iter().all(|item| includes_member(expected, item, deep)),
                format!("have {}members", if deep { "deep " } else { "" }),
            )
        };
        let message = format!(
            "Expected {} to {} {}",
            self.subject_text(),
            phrase,
            format_value(list)
        );
        self.report(assertion, message)
    }

    pub fn one_of(&self, list: &SandboxValue) -> ExpectResult {
        let candidates = list.as_array().unwrap_or_default();
        let actual = self.subject.value();
        let deep = self.flags.deep;

        let assertion = if self.flags.include {
            match actual {
                SandboxValue::String(text) => candidates
                    .iter()
                    .any(|item| item.as_string().is_some_and(|needle| text.contains(needle))),
                SandboxValue::Array(items) => candidates
                    .iter()
                    .any(|item| includes_member(items, item, deep)),
                _ => false,
            }
        } else {
            matches!(self.subject, Subject::Value(_)) && includes_member(candidates, actual, deep)
        };
        let message = format!(
            "Expected {} to {}oneOf {}",
            self.subject_text(),
            if self.flags.include { "include " } else { "be " },
            format_value(list)
        );
        self.report(assertion, message)
    }
}

#[cfg(test)]
mod chai_tests {
    use super::*;

    use crate::matchers::Flag;
    use crate::types::ExpectStatus;

    fn number(value: f64) -> SandboxValue {
        SandboxValue::Number(value)
    }

    fn object(entries: &[(&str, SandboxValue)]) -> SandboxValue {
        SandboxValue::Object(
            entries
                .iter()
                .map(|(key, value)| ((*key).to_string(), value.clone()))
                .collect(),
        )
    }

    fn list(values: &[SandboxValue]) -> SandboxValue {
        SandboxValue::Array(values.to_vec())
    }

    #[test]
    fn equal_and_eql_messages() {
        let result = Expectation::new(number(1.0)).equal(&number(1.0));
        assert_eq!(result, ExpectResult::pass("Expected 1 to equal 1"));

        let value = object(&[("a", number(1.0))]);
        let result = Expectation::new(value.clone()).equal(&value);
        assert_eq!(result, ExpectResult::fail("Expected {a: 1} to equal {a: 1}"));

        let result = Expectation::new(value.clone())
            .with_flag(Flag::Deep)
            .equal(&value);
        assert_eq!(result, ExpectResult::pass("Expected {a: 1} to deep equal {a: 1}"));

        let result = Expectation::new(value.clone()).negated().eql(&value);
        assert_eq!(result, ExpectResult::fail("Expected {a: 1} to not eql {a: 1}"));
    }

    #[test]
    fn type_assertions_pick_article() {
        let result = Expectation::new(list(&[])).a("array");
        assert_eq!(result, ExpectResult::pass("Expected [] to be an array"));
        let result = Expectation::new(SandboxValue::string("x")).a("number");
        assert_eq!(result, ExpectResult::fail("Expected 'x' to be a number"));
        let result = Expectation::function("[Function]").a("function");
        assert_eq!(result.status, ExpectStatus::Pass);
    }

    #[test]
    fn property_getters() {
        assert_eq!(
            Expectation::new(number(1.0)).ok(),
            ExpectResult::pass("Expected 1 to be ok")
        );
        assert_eq!(
            Expectation::new(SandboxValue::Null).negated().exist(),
            ExpectResult::pass("Expected null to not exist")
        );
        assert_eq!(
            Expectation::new(SandboxValue::string("")).empty(),
            ExpectResult::pass("Expected '' to be empty")
        );
        assert_eq!(
            Expectation::new(number(f64::NAN)).nan(),
            ExpectResult::pass("Expected NaN to be NaN")
        );
        assert_eq!(
            Expectation::new(number(f64::INFINITY)).finite().status,
            ExpectStatus::Fail
        );
        assert_eq!(
            Expectation::new(SandboxValue::Undefined).undefined(),
            ExpectResult::pass("Expected undefined to be undefined")
        );
    }

    #[test]
    fn numeric_comparisons() {
        let five = Expectation::new(number(5.0));
        assert_eq!(five.above(&number(3.0)), ExpectResult::pass("Expected 5 to be above 3"));
        assert_eq!(five.below(&number(3.0)), ExpectResult::fail("Expected 5 to be below 3"));
        assert_eq!(five.least(&number(5.0)), ExpectResult::pass("Expected 5 to be at least 5"));
        assert_eq!(five.most(&number(4.0)).status, ExpectStatus::Fail);
        assert_eq!(
            five.within(&number(1.0), &number(10.0)),
            ExpectResult::pass("Expected 5 to be within 1, 10")
        );
        assert_eq!(
            Expectation::new(number(1.5)).close_to("closeTo", &number(1.0), &number(0.5)),
            ExpectResult::pass("Expected 1.5 to be closeTo 1, 0.5")
        );
        assert_eq!(
            five.negated().close_to("approximately", &number(1.0), &number(0.5)),
            ExpectResult::pass("Expected 5 to not be approximately 1, 0.5")
        );
    }

    #[test]
    fn include_handles_strings_arrays_and_objects() {
        let result = Expectation::new(SandboxValue::string("foobar"))
            .include("include", &SandboxValue::string("foo"));
        assert_eq!(result, ExpectResult::pass("Expected 'foobar' to include 'foo'"));

        let nested = list(&[object(&[("a", number(1.0))])]);
        let shallow = Expectation::new(nested.clone()).include("include", &object(&[("a", number(1.0))]));
        assert_eq!(shallow, ExpectResult::fail("Expected [{a: 1}] to include {a: 1}"));
        let deep = Expectation::new(nested)
            .with_flag(Flag::Deep)
            .include("contain", &object(&[("a", number(1.0))]));
        assert_eq!(deep, ExpectResult::pass("Expected [{a: 1}] to deep contain {a: 1}"));

        let subset = Expectation::new(object(&[("a", number(1.0)), ("b", number(2.0))]))
            .include("include", &object(&[("b", number(2.0))]));
        assert_eq!(subset.status, ExpectStatus::Pass);
    }

    #[test]
    fn property_and_nested_property() {
        let value = object(&[(
            "a",
            object(&[("b", list(&[number(1.0), number(2.0)]))]),
        )]);
        let result = Expectation::new(value.clone()).property("a", None);
        assert_eq!(result, ExpectResult::pass("Expected {a: {b: [1, 2]}} to have property 'a'"));

        let result = Expectation::new(value.clone())
            .with_flag(Flag::Nested)
            .property("a.b[1]", Some(&number(2.0)));
        assert_eq!(
            result,
            ExpectResult::pass("Expected {a: {b: [1, 2]}} to have nested property 'a.b[1]', 2")
        );

        let result = Expectation::new(value.clone()).property("z", None);
        assert_eq!(result.status, ExpectStatus::Fail);

        let result = Expectation::new(number(1.0)).property("a", None);
        assert_eq!(result, ExpectResult::fail("Expected 1 to be an object"));

        let result = Expectation::new(value).own_property("a", Some(&number(1.0)));
        assert_eq!(result.status, ExpectStatus::Fail);
    }

    #[test]
    fn length_assertions() {
        let value = list(&[number(1.0), number(2.0)]);
        assert_eq!(
            Expectation::new(value.clone()).length("length", &number(2.0)),
            ExpectResult::pass("Expected [1, 2] to have length 2")
        );
        assert_eq!(
            Expectation::new(value).length("lengthOf", &number(3.0)),
            ExpectResult::fail("Expected [1, 2] to have lengthOf 3")
        );
        assert_eq!(
            Expectation::new(number(1.0)).length("length", &number(1.0)),
            ExpectResult::fail("Expected 1 to have a length, but it does not")
        );
    }

    #[test]
    fn string_and_regex_matching() {
        let subject = Expectation::new(SandboxValue::string("Hello World"));
        assert_eq!(
            subject.matches(&SandboxValue::string("/^hello/i")),
            ExpectResult::pass("Expected 'Hello World' to match /^hello/i")
        );
        assert_eq!(
            subject.string(&SandboxValue::string("World")),
            ExpectResult::pass("Expected 'Hello World' to have string 'World'")
        );
        assert_eq!(
            Expectation::new(number(1.0)).matches(&SandboxValue::string("/1/")),
            ExpectResult::fail("Expected 1 to be a string")
        );
    }

    #[test]
    fn keys_variants() {
        let value = object(&[("a", number(1.0)), ("b", number(2.0))]);
        let keys = [SandboxValue::string("a"), SandboxValue::string("b")];
        assert_eq!(
            Expectation::new(value.clone()).keys(&keys),
            ExpectResult::pass("Expected {a: 1, b: 2} to have keys 'a', 'b'")
        );
        assert_eq!(
            Expectation::new(value.clone())
                .with_flag(Flag::Any)
                .keys(&[SandboxValue::string("a"), SandboxValue::string("z")])
                .status,
            ExpectStatus::Pass
        );
        assert_eq!(
            Expectation::new(value.clone())
                .with_flag(Flag::Include)
                .with_flag(Flag::All)
                .keys(&[SandboxValue::string("a")]),
            ExpectResult::pass("Expected {a: 1, b: 2} to include all keys 'a'")
        );
        assert_eq!(
            Expectation::new(value)
                .with_flag(Flag::All)
                .keys(&[SandboxValue::string("a")])
                .status,
            ExpectStatus::Fail
        );
    }

    #[test]
    fn throws_inspects_outcome() {
        let callable = Expectation::function("[Function]");
        let threw = ThrowOutcome::Threw {
            message: "bad input".to_string(),
        };
        assert_eq!(
            callable.throws(Some(&threw), None, None),
            ExpectResult::pass("Expected [Function] to throw")
        );
        assert_eq!(
            callable.throws(Some(&threw), Some(&SandboxValue::string("/bad/")), None),
            ExpectResult::pass("Expected [Function] to throw /bad/")
        );
        assert_eq!(
            callable.throws(Some(&threw), Some(&SandboxValue::string("other")), None),
            ExpectResult::fail("Expected [Function] to throw 'other'")
        );
        assert_eq!(
            callable.negated().throws(Some(&ThrowOutcome::Returned), None, None),
            ExpectResult::pass("Expected [Function] to not throw")
        );
        assert_eq!(
            Expectation::new(number(1.0)).throws(None, None, None),
            ExpectResult::fail("Expected 1 to be a function")
        );
    }

    #[test]
    fn satisfy_uses_runtime_outcome() {
        let subject = Expectation::new(number(2.0));
        let returned = SatisfyOutcome::Returned {
            label: "[Function]".to_string(),
            value: SandboxValue::Bool(true),
        };
        assert_eq!(
            subject.satisfy(&returned),
            ExpectResult::pass("Expected 2 to satisfy [Function]")
        );
        assert_eq!(
            subject.satisfy(&SatisfyOutcome::NotAFunction),
            ExpectResult::fail("Expected matcher to be a function")
        );
        assert_eq!(
            subject
                .satisfy(&SatisfyOutcome::Threw {
                    message: "nope".to_string()
                })
                .message,
            "Matcher function threw an error: nope"
        );
    }

    #[test]
    fn members_and_one_of() {
        let value = list(&[number(1.0), number(2.0), number(3.0)]);
        let shuffled = list(&[number(3.0), number(1.0), number(2.0)]);
        assert_eq!(
            Expectation::new(value.clone()).members(&shuffled),
            ExpectResult::pass("Expected [1, 2, 3] to have members [3, 1, 2]")
        );
        assert_eq!(
            Expectation::new(value.clone())
                .with_flag(Flag::Ordered)
                .members(&shuffled)
                .status,
            ExpectStatus::Fail
        );
        assert_eq!(
            Expectation::new(value.clone())
                .with_flag(Flag::Include)
                .members(&list(&[number(2.0)])),
            ExpectResult::pass("Expected [1, 2, 3] to include members [2]")
        );
        assert_eq!(
            Expectation::new(number(2.0)).one_of(&value),
            ExpectResult::pass("Expected 2 to be oneOf [1, 2, 3]")
        );
        assert_eq!(
            Expectation::new(value)
                .with_flag(Flag::Include)
                .one_of(&list(&[number(9.0)])),
            ExpectResult::fail("Expected [1, 2, 3] to include oneOf [9]")
        );
    }

    #[test]
    fn nested_paths_parse_brackets_and_dots() {
        assert_eq!(
            parse_nested_path("a.b[1].c"),
            vec![
                PathKey::Name("a".to_string()),
                PathKey::Name("b".to_string()),
                PathKey::Index(1),
                PathKey::Name("c".to_string()),
            ]
        );
    }
}
