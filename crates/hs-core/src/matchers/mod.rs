//! Assertion library behind `pw.expect` / `hopp.expect`.
//!
//! An [`Expectation`] is immutable: modifiers return a new expectation and
//! every terminal matcher returns exactly one [`ExpectResult`], which the
//! caller appends to the active test frame.

mod chai;
mod format;
mod legacy;

pub use chai::{SatisfyOutcome, ThrowOutcome};
pub use format::{compile_pattern, compile_regex_literal, format_value, split_regex_literal};
pub use legacy::StatusLevel;

use crate::types::ExpectResult;
use crate::value::SandboxValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    Value(SandboxValue),
    /// A guest callable, kept opaque on the host side.
    Function { label: String },
}

impl Subject {
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Value(value) => value.type_of(),
            Self::Function { .. } => "function",
        }
    }

    /// Value view used by value matchers; callables read as `undefined`.
    pub fn value(&self) -> &SandboxValue {
        static UNDEFINED: SandboxValue = SandboxValue::Undefined;
        match self {
            Self::Value(value) => value,
            Self::Function { .. } => &UNDEFINED,
        }
    }

    fn to_js_string(&self) -> String {
        match self {
            Self::Value(value) => value.to_js_string(),
            Self::Function { label } => label.clone(),
        }
    }

    fn format(&self) -> String {
        match self {
            Self::Value(value) => format_value(value),
            Self::Function { label } => label.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Not,
    Deep,
    Nested,
    Own,
    Ordered,
    Any,
    All,
    Include,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChaiFlags {
    pub not: bool,
    pub deep: bool,
    pub nested: bool,
    pub own: bool,
    pub ordered: bool,
    pub any: bool,
    pub all: bool,
    pub include: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    subject: Subject,
    flags: ChaiFlags,
}

impl Expectation {
    pub fn new(value: SandboxValue) -> Self {
        Self {
            subject: Subject::Value(value),
            flags: ChaiFlags::default(),
        }
    }

    pub fn function(label: impl Into<String>) -> Self {
        Self {
            subject: Subject::Function {
                label: label.into(),
            },
            flags: ChaiFlags::default(),
        }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn flags(&self) -> ChaiFlags {
        self.flags
    }

    pub fn is_negated(&self) -> bool {
        self.flags.not
    }

    /// New expectation with the negation flipped.
    pub fn negated(&self) -> Self {
        let mut next = self.clone();
        next.flags.not = !next.flags.not;
        next
    }

    /// New expectation with `flag` set. `Flag::Not` toggles instead.
    pub fn with_flag(&self, flag: Flag) -> Self {
        let mut next = self.clone();
        match flag {
            Flag::Not => next.flags.not = !next.flags.not,
            Flag::Deep => next.flags.deep = true,
            Flag::Nested => next.flags.nested = true,
            Flag::Own => next.flags.own = true,
            Flag::Ordered => next.flags.ordered = true,
            Flag::Any => next.flags.any = true,
            Flag::All => next.flags.all = true,
            Flag::Include => next.flags.include = true,
        }
        next
    }

    fn not_word(&self) -> &'static str {
        if self.flags.not {
            " not"
        } else {
            ""
        }
    }

    /// Pass/fail for legacy matchers whose message already carries the
    /// negation.
    fn decide(&self, assertion: bool, message: String) -> ExpectResult {
        ExpectResult::from_assertion(assertion != self.flags.not, message)
    }

    /// Pass/fail for chai matchers: negation flips the outcome and rewrites
    /// the first ` to ` of the message.
    fn report(&self, assertion: bool, message: String) -> ExpectResult {
        if self.flags.not {
            ExpectResult::from_assertion(!assertion, message.replacen(" to ", " to not ", 1))
        } else {
            ExpectResult::from_assertion(assertion, message)
        }
    }
}

/// JavaScript `Number(v)` coercion.
pub(crate) fn to_number(value: &SandboxValue) -> f64 {
    match value {
        SandboxValue::Undefined => f64::NAN,
        SandboxValue::Null => 0.0,
        SandboxValue::Bool(value) => f64::from(u8::from(*value)),
        SandboxValue::Number(value) => *value,
        SandboxValue::String(text) => parse_number_text(text),
        SandboxValue::Array(_) => parse_number_text(&value.to_js_string()),
        SandboxValue::Object(_) => f64::NAN,
    }
}

fn parse_number_text(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if trimmed.chars().any(|ch| ch.is_ascii_alphabetic() && ch != 'e' && ch != 'E') => {
            f64::NAN
        }
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}
