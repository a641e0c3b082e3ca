use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{HsToolError, TestCase, TESTCASE_SCHEMA_V1};

const CASE_SUFFIX: &str = ".case.json";

/// Every `*.case.json` under `cases_dir`, sorted by path.
pub fn collect_case_files(cases_dir: &Path) -> Result<Vec<PathBuf>, HsToolError> {
    let mut cases: Vec<PathBuf> = WalkDir::new(cases_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().to_string_lossy().ends_with(CASE_SUFFIX))
        .map(|entry| entry.path().to_path_buf())
        .collect();

    if cases.is_empty() {
        return Err(HsToolError::CasesEmpty {
            path: cases_dir.to_path_buf(),
        });
    }

    cases.sort();
    Ok(cases)
}

pub fn read_test_case(case_path: &Path) -> Result<TestCase, HsToolError> {
    let raw = fs::read_to_string(case_path).map_err(|source| HsToolError::ReadFile {
        path: case_path.to_path_buf(),
        source,
    })?;
    let parsed: TestCase = serde_json::from_str(&raw).map_err(|source| HsToolError::ParseCase {
        path: case_path.to_path_buf(),
        source,
    })?;

    if parsed.schema_version != TESTCASE_SCHEMA_V1 {
        return Err(HsToolError::InvalidSchemaVersion {
            expected: TESTCASE_SCHEMA_V1.to_string(),
            found: parsed.schema_version,
        });
    }

    Ok(parsed)
}
