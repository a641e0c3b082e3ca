use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "hs-cli")]
#[command(about = "Sandboxed pre-request and test script runner")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Run(RunArgs),
    Resolve(ResolveArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ScriptKind {
    PreRequest,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum BackendKind {
    Inline,
    Thread,
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(long = "mode", value_enum)]
    pub(crate) mode: ScriptKind,
    #[arg(long = "script")]
    pub(crate) script: String,
    #[arg(long = "env")]
    pub(crate) env: Option<String>,
    #[arg(long = "response")]
    pub(crate) response: Option<String>,
    #[arg(long = "request")]
    pub(crate) request: Option<String>,
    #[arg(long = "artifacts")]
    pub(crate) artifacts: Option<String>,
    #[arg(long = "config")]
    pub(crate) config: Option<String>,
    #[arg(long = "backend", value_enum, default_value = "inline")]
    pub(crate) backend: BackendKind,
    #[arg(long = "timeout-ms")]
    pub(crate) timeout_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub(crate) struct ResolveArgs {
    #[arg(long = "template")]
    pub(crate) template: String,
    #[arg(long = "env")]
    pub(crate) env: Option<String>,
    #[arg(long = "mask-secrets")]
    pub(crate) mask_secrets: bool,
}
