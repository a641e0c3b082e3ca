use std::path::Path;

use hs_tool::{assert_case, collect_case_files};

#[test]
fn repository_cases_pass() {
    let cases_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("cases");
    let cases = collect_case_files(&cases_dir).expect("cases directory must hold cases");

    for case_path in cases {
        if let Err(error) = assert_case(&case_path) {
            panic!("case {} failed: {}", case_path.display(), error);
        }
    }
}
