use std::path::Path;

use hs_api::Sandbox;
use hs_core::{ExecutionError, Report, ScriptExecutionRequest, ScriptMode, TestDescriptor};
use serde::Serialize;

use crate::source::read_test_case;
use crate::{HsToolError, TestCase};

/// Runs the case's script inline with default limits.
pub fn run_case(case: &TestCase) -> Result<Report, ExecutionError> {
    let request = ScriptExecutionRequest {
        script: case.script.text(),
        mode: case.mode,
        env: case.env.clone(),
        response: case.response.clone(),
        artifacts: case.artifacts.clone(),
        request: case.request.clone(),
    };
    Sandbox::default().execute(request)
}

/// Runs `case` and compares the report with its expected fragments.
pub fn check_case(case: &TestCase) -> Result<(), HsToolError> {
    if case.mode == ScriptMode::Test && case.response.is_none() {
        return Err(HsToolError::MissingResponse);
    }

    let report = match (run_case(case), &case.expect.error) {
        (Ok(report), None) => report,
        (Ok(_), Some(expected)) => {
            return Err(HsToolError::MissingFailure {
                expected: expected.clone(),
            })
        }
        (Err(error), None) => return Err(HsToolError::UnexpectedFailure(error)),
        (Err(error), Some(expected)) => {
            let actual = error.to_string();
            if &actual != expected {
                return Err(HsToolError::FailureMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
            return Ok(());
        }
    };

    let expect = &case.expect;
    compare_field("env", expect.env.as_ref(), &report.env)?;
    compare_field("artifacts", expect.artifacts.as_ref(), &report.artifacts)?;
    let tests = report.tests.clone().unwrap_or_else(TestDescriptor::root);
    compare_field("tests", expect.tests.as_ref(), &tests)?;
    compare_field("consoles", expect.consoles.as_ref(), &report.consoles)?;
    let request = report.request.clone().unwrap_or_default();
    compare_field("request", expect.request.as_ref(), &request)?;
    Ok(())
}

pub fn assert_case(case_path: &Path) -> Result<(), HsToolError> {
    let case = read_test_case(case_path)?;
    check_case(&case)
}

fn compare_field<T>(field: &'static str, expected: Option<&T>, actual: &T) -> Result<(), HsToolError>
where
    T: Serialize + PartialEq,
{
    let Some(expected) = expected else {
        return Ok(());
    };
    if expected == actual {
        return Ok(());
    }
    let expected = serde_json::to_string(expected).map_err(HsToolError::ReportSerialize)?;
    let actual = serde_json::to_string(actual).map_err(HsToolError::ReportSerialize)?;
    Err(HsToolError::ReportMismatch {
        field,
        expected,
        actual,
    })
}
