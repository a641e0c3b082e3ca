use std::ffi::OsString;

use clap::Parser;
use hs_api::{InlineBackend, Sandbox, ThreadBackend};
use hs_core::{environment, SandboxError, ScriptExecutionRequest, ScriptMode};

mod cli_args;
mod error_map;
mod input_loader;
mod logging;

pub(crate) use cli_args::{BackendKind, Cli, Mode, ResolveArgs, RunArgs, ScriptKind};
pub(crate) use error_map::{
    emit_error, map_cli_config_invalid, map_cli_input_invalid, map_cli_input_read, map_cli_report,
};
pub(crate) use input_loader::{
    load_artifacts, load_env, load_options, load_request, load_response, read_script,
};
pub use logging::init_logging;

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, SandboxError> {
    match cli.command {
        Mode::Run(args) => run_script(args),
        Mode::Resolve(args) => run_resolve(args),
    }
}

fn build_sandbox(args: &RunArgs) -> Result<Sandbox, SandboxError> {
    let options = load_options(args.config.as_deref())?;
    Ok(match args.backend {
        BackendKind::Inline => Sandbox::new(InlineBackend::new(options)),
        BackendKind::Thread => Sandbox::new(ThreadBackend::new(options, args.timeout_ms)),
    })
}

fn run_script(args: RunArgs) -> Result<i32, SandboxError> {
    let script = read_script(&args.script)?;
    let env = load_env(args.env.as_deref())?;
    let sandbox = build_sandbox(&args)?;
    let mode = match args.mode {
        ScriptKind::PreRequest => ScriptMode::PreRequest,
        ScriptKind::Test => ScriptMode::Test,
    };

    let mut request = match mode {
        ScriptMode::PreRequest => {
            let mut request = ScriptExecutionRequest::pre_request(script, env);
            request.artifacts = load_artifacts(args.artifacts.as_deref())?;
            request
        }
        ScriptMode::Test => {
            let response = load_response(args.response.as_deref())?;
            ScriptExecutionRequest::test(script, env, response)
        }
    };
    request.request = load_request(args.request.as_deref())?;

    let report = sandbox.execute(request)?;
    let report_json = match mode {
        ScriptMode::PreRequest => serde_json::to_string(&report.into_pre_request()),
        ScriptMode::Test => serde_json::to_string(&report.into_test()),
    }
    .map_err(map_cli_report)?;

    println!("RESULT:OK");
    println!("REPORT_JSON:{}", report_json);
    Ok(0)
}

fn run_resolve(args: ResolveArgs) -> Result<i32, SandboxError> {
    let env = load_env(args.env.as_deref())?;
    let resolved = if args.mask_secrets {
        environment::resolve_masked(&args.template, &env)
    } else {
        environment::resolve(&args.template, &env)
    };
    println!("RESULT:OK");
    println!(
        "RESOLVED_JSON:{}",
        serde_json::to_string(&resolved).map_err(map_cli_report)?
    );
    Ok(0)
}
