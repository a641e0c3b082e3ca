use hs_core::SandboxError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> SandboxError {
    SandboxError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: SandboxError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).expect("string json")
    );
    1
}

pub(crate) fn map_cli_input_read(error: std::io::Error) -> SandboxError {
    map_error("CLI_INPUT_READ", error)
}

pub(crate) fn map_cli_input_invalid(error: serde_json::Error) -> SandboxError {
    map_error("CLI_INPUT_INVALID", error)
}

pub(crate) fn map_cli_config_invalid(error: serde_json::Error) -> SandboxError {
    map_error("CLI_CONFIG_INVALID", error)
}

pub(crate) fn map_cli_report(error: serde_json::Error) -> SandboxError {
    map_error("CLI_REPORT", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(SandboxError::new("ERR", "failed"));
        assert_eq!(code, 1);
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        assert_eq!(
            map_cli_input_read(std::io::Error::other("read")).code,
            "CLI_INPUT_READ"
        );

        let invalid = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        assert_eq!(map_cli_input_invalid(invalid).code, "CLI_INPUT_INVALID");

        let invalid = serde_json::from_str::<serde_json::Value>("[").expect_err("invalid json");
        assert_eq!(map_cli_config_invalid(invalid).code, "CLI_CONFIG_INVALID");

        let invalid = serde_json::from_str::<serde_json::Value>("}").expect_err("invalid json");
        assert_eq!(map_cli_report(invalid).code, "CLI_REPORT");
    }
}
