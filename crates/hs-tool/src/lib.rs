mod case;
mod runner;
mod source;

pub use case::{CaseExpectation, ScriptSource, TestCase, TESTCASE_SCHEMA_V1};
pub use runner::{assert_case, check_case, run_case};
pub use source::{collect_case_files, read_test_case};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HsToolError {
    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse testcase {path}: {source}")]
    ParseCase {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid testcase schema version \"{found}\", expected \"{expected}\".")]
    InvalidSchemaVersion { expected: String, found: String },
    #[error("No .case.json files under {path}.")]
    CasesEmpty { path: PathBuf },
    #[error("Test mode case has no response snapshot.")]
    MissingResponse,
    #[error("Script failed unexpectedly: {0}")]
    UnexpectedFailure(hs_core::ExecutionError),
    #[error("Expected script to fail with \"{expected}\", but it succeeded.")]
    MissingFailure { expected: String },
    #[error("Expected failure \"{expected}\", actual \"{actual}\".")]
    FailureMismatch { expected: String, actual: String },
    #[error("Report field {field} mismatch. expected={expected} actual={actual}")]
    ReportMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },
    #[error("Failed to serialize report field for diff: {0}")]
    ReportSerialize(serde_json::Error),
}
