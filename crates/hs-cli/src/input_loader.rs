use std::fs;
use std::path::Path;

use hs_core::{Artifacts, EnvironmentSet, RequestSnapshot, ResponseSnapshot, SandboxError};
use hs_runtime::SandboxOptions;
use serde::de::DeserializeOwned;

use crate::{map_cli_config_invalid, map_cli_input_invalid, map_cli_input_read};

pub(crate) fn read_script(path: &str) -> Result<String, SandboxError> {
    fs::read_to_string(Path::new(path)).map_err(map_cli_input_read)
}

fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, SandboxError> {
    let text = fs::read_to_string(Path::new(path)).map_err(map_cli_input_read)?;
    serde_json::from_str(&text).map_err(map_cli_input_invalid)
}

pub(crate) fn load_env(path: Option<&str>) -> Result<EnvironmentSet, SandboxError> {
    match path {
        Some(path) => read_json(path),
        None => Ok(EnvironmentSet::default()),
    }
}

pub(crate) fn load_artifacts(path: Option<&str>) -> Result<Option<Artifacts>, SandboxError> {
    path.map(read_json).transpose()
}

pub(crate) fn load_request(path: Option<&str>) -> Result<Option<RequestSnapshot>, SandboxError> {
    path.map(read_json).transpose()
}

pub(crate) fn load_response(path: Option<&str>) -> Result<ResponseSnapshot, SandboxError> {
    let Some(path) = path else {
        return Err(SandboxError::new(
            "CLI_RESPONSE_REQUIRED",
            "test mode needs --response <file.json>",
        ));
    };
    read_json(path)
}

/// Sandbox limits from `--config`; defaults when no file is given.
pub(crate) fn load_options(path: Option<&str>) -> Result<SandboxOptions, SandboxError> {
    let Some(path) = path else {
        return Ok(SandboxOptions::default());
    };
    let text = fs::read_to_string(Path::new(path)).map_err(map_cli_input_read)?;
    serde_json::from_str(&text).map_err(map_cli_config_invalid)
}
