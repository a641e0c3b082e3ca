use crate::types::ExpectResult;
use crate::value::SandboxValue;

use super::{Expectation, Subject};

const TYPE_NAMES: [&str; 8] = [
    "string",
    "boolean",
    "number",
    "object",
    "undefined",
    "bigint",
    "symbol",
    "function",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Success,
    Redirect,
    ClientError,
    ServerError,
}

impl StatusLevel {
    fn label(self) -> &'static str {
        match self {
            Self::Success => "200",
            Self::Redirect => "300",
            Self::ClientError => "400",
            Self::ServerError => "500",
        }
    }

    fn range(self) -> (i64, i64) {
        match self {
            Self::Success => (200, 299),
            Self::Redirect => (300, 399),
            Self::ClientError => (400, 499),
            Self::ServerError => (500, 599),
        }
    }
}

impl Expectation {
    pub fn to_be(&self, expected: &SandboxValue) -> ExpectResult {
        let assertion = match &self.subject {
            Subject::Value(value) => value.strict_equals(expected),
            Subject::Function { .. } => false,
        };
        let message = format!(
            "Expected '{}' to{} be '{}'",
            self.subject.to_js_string(),
            self.not_word(),
            expected.to_js_string()
        );
        self.decide(assertion, message)
    }

    pub fn to_be_level(&self, level: StatusLevel) -> ExpectResult {
        let parsed = match &self.subject {
            Subject::Value(value) => value.parse_int(),
            Subject::Function { .. } => None,
        };
        let Some(status) = parsed else {
            return ExpectResult::error(format!(
                "Expected {}-level status but could not parse value '{}'",
                level.label(),
                self.subject.to_js_string()
            ));
        };
        let (start, end) = level.range();
        let message = format!(
            "Expected '{}' to{} be {}-level status",
            status,
            self.not_word(),
            level.label()
        );
        self.decide((start..=end).contains(&status), message)
    }

    pub fn to_be_type(&self, expected: &SandboxValue) -> ExpectResult {
        let Some(type_name) = expected
            .as_string()
            .filter(|name| TYPE_NAMES.contains(name))
        else {
            return ExpectResult::error(
                "Argument for toBeType should be \"string\", \"boolean\", \"number\", \"object\", \"undefined\", \"bigint\", \"symbol\" or \"function\"",
            );
        };
        let message = format!(
            "Expected '{}' to{} be type '{}'",
            self.subject.to_js_string(),
            self.not_word(),
            type_name
        );
        self.decide(self.subject.type_of() == type_name, message)
    }

    pub fn to_have_length(&self, expected: &SandboxValue) -> ExpectResult {
        let Some(length) = self.subject.value().js_length() else {
            return ExpectResult::error("Expected toHaveLength to be called for an array or string");
        };
        let Some(expected_length) = expected.as_number().filter(|number| !number.is_nan()) else {
            return ExpectResult::error("Argument for toHaveLength should be a number");
        };
        let message = format!(
            "Expected the array to{} be of length '{}'",
            self.not_word(),
            expected.to_js_string()
        );
        self.decide(length as f64 == expected_length, message)
    }

    pub fn to_include(&self, needle: &SandboxValue) -> ExpectResult {
        let haystack = self.subject.value();
        if haystack.js_length().is_none() {
            return ExpectResult::error("Expected toInclude to be called for an array or string");
        }
        match needle {
            SandboxValue::Null => {
                return ExpectResult::error("Argument for toInclude should not be null");
            }
            SandboxValue::Undefined => {
                return ExpectResult::error("Argument for toInclude should not be undefined");
            }
            _ => {}
        }
        let assertion = match haystack {
            SandboxValue::String(text) => text.contains(&needle.to_js_string()),
            SandboxValue::Array(items) => items.iter().any(|item| item.same_value_zero(needle)),
            _ => false,
        };
        let message = format!(
            "Expected {} to{} include {}",
            haystack.to_json_text(),
            self.not_word(),
            needle.to_json_text()
        );
        self.decide(assertion, message)
    }
}

#[cfg(test)]
mod legacy_tests {
    use super::*;

    use crate::types::ExpectStatus;

    fn number(value: f64) -> SandboxValue {
        SandboxValue::Number(value)
    }

    fn numbers(values: &[f64]) -> SandboxValue {
        SandboxValue::Array(values.iter().copied().map(SandboxValue::Number).collect())
    }

    #[test]
    fn to_be_passes_and_fails_with_exact_messages() {
        let result = Expectation::new(number(2.0)).to_be(&number(2.0));
        assert_eq!(result, ExpectResult::pass("Expected '2' to be '2'"));

        let result = Expectation::new(number(2.0)).negated().to_be(&number(2.0));
        assert_eq!(result, ExpectResult::fail("Expected '2' to not be '2'"));
    }

    #[test]
    fn to_be_is_symmetric_under_negation() {
        let cases = [
            (number(1.0), number(1.0)),
            (number(1.0), SandboxValue::string("1")),
            (SandboxValue::Null, SandboxValue::Undefined),
            (numbers(&[1.0]), numbers(&[1.0])),
        ];
        for (left, right) in cases {
            let positive = Expectation::new(left.clone()).to_be(&right);
            let negative = Expectation::new(left).negated().to_be(&right);
            assert_ne!(positive.status, negative.status);
        }
    }

    #[test]
    fn to_be_never_matches_separate_arrays() {
        let result = Expectation::new(numbers(&[1.0])).to_be(&numbers(&[1.0]));
        assert_eq!(result, ExpectResult::fail("Expected '1' to be '1'"));

        let result = Expectation::new(numbers(&[1.0]))
            .negated()
            .to_be(&numbers(&[1.0]));
        assert_eq!(result, ExpectResult::pass("Expected '1' to not be '1'"));
    }

    #[test]
    fn status_levels_parse_leading_integers() {
        let result = Expectation::new(number(204.0)).to_be_level(StatusLevel::Success);
        assert_eq!(result, ExpectResult::pass("Expected '204' to be 200-level status"));

        let result = Expectation::new(SandboxValue::string("404 Not Found"))
            .negated()
            .to_be_level(StatusLevel::ClientError);
        assert_eq!(result, ExpectResult::fail("Expected '404' to not be 400-level status"));

        let result = Expectation::new(SandboxValue::string("oops")).to_be_level(StatusLevel::ServerError);
        assert_eq!(
            result,
            ExpectResult::error("Expected 500-level status but could not parse value 'oops'")
        );
    }

    #[test]
    fn status_level_errors_ignore_negation() {
        let result = Expectation::new(SandboxValue::Undefined)
            .negated()
            .to_be_level(StatusLevel::Redirect);
        assert_eq!(result.status, ExpectStatus::Error);
    }

    #[test]
    fn to_be_type_checks_whitelist_first() {
        let result = Expectation::new(SandboxValue::string("x")).to_be_type(&SandboxValue::string("str"));
        assert_eq!(result.status, ExpectStatus::Error);
        assert!(result.message.starts_with("Argument for toBeType should be"));

        let result = Expectation::new(SandboxValue::string("x")).to_be_type(&SandboxValue::string("string"));
        assert_eq!(result, ExpectResult::pass("Expected 'x' to be type 'string'"));

        let result = Expectation::function("[Function]")
            .negated()
            .to_be_type(&SandboxValue::string("function"));
        assert_eq!(result, ExpectResult::fail("Expected '[Function]' to not be type 'function'"));
    }

    #[test]
    fn to_have_length_validates_receiver_and_argument() {
        let list = numbers(&[1.0, 2.0, 3.0]);
        let result = Expectation::new(list.clone()).to_have_length(&SandboxValue::string("a"));
        assert_eq!(result, ExpectResult::error("Argument for toHaveLength should be a number"));

        let result = Expectation::new(number(1.0)).to_have_length(&number(1.0));
        assert_eq!(
            result,
            ExpectResult::error("Expected toHaveLength to be called for an array or string")
        );

        let result = Expectation::new(list).to_have_length(&number(3.0));
        assert_eq!(result, ExpectResult::pass("Expected the array to be of length '3'"));

        let result = Expectation::new(SandboxValue::string("abc"))
            .negated()
            .to_have_length(&number(3.0));
        assert_eq!(result, ExpectResult::fail("Expected the array to not be of length '3'"));
    }

    #[test]
    fn to_include_reports_json_rendering() {
        let list = numbers(&[1.0, 2.0, 3.0]);
        let result = Expectation::new(list.clone()).to_include(&number(4.0));
        assert_eq!(result, ExpectResult::fail("Expected [1,2,3] to include 4"));

        let result = Expectation::new(SandboxValue::string("hoppscotch"))
            .to_include(&SandboxValue::string("hop"));
        assert_eq!(result, ExpectResult::pass("Expected \"hoppscotch\" to include \"hop\""));

        let result = Expectation::new(list.clone()).to_include(&SandboxValue::Null);
        assert_eq!(result, ExpectResult::error("Argument for toInclude should not be null"));

        let result = Expectation::new(list).negated().to_include(&SandboxValue::Undefined);
        assert_eq!(result, ExpectResult::error("Argument for toInclude should not be undefined"));
    }
}
