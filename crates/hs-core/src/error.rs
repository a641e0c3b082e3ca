use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct SandboxError {
    pub code: String,
    pub message: String,
}

impl SandboxError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarshalError {
    #[error("Stringification failed: {0}")]
    Stringify(String),
    #[error("Parsing failed: {0}")]
    Parse(String),
    #[error("Value of type {0} cannot cross the sandbox boundary")]
    NotTransportable(String),
    #[error("Value nesting exceeds {0} levels")]
    TooDeep(usize),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Sandbox initialization failed: {0}")]
    Initialization(String),
    #[error("Script evaluation failed: {0}")]
    ScriptFailed(String),
    #[error(transparent)]
    Marshal(#[from] MarshalError),
    #[error("Script execution was cancelled")]
    Cancelled,
    #[error("Backend failure: {0}")]
    Backend(String),
}

impl ExecutionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Initialization(_) => "EXEC_INIT",
            Self::ScriptFailed(_) => "EXEC_SCRIPT",
            Self::Marshal(_) => "EXEC_MARSHAL",
            Self::Cancelled => "EXEC_CANCELLED",
            Self::Backend(_) => "EXEC_BACKEND",
        }
    }
}

impl From<ExecutionError> for SandboxError {
    fn from(error: ExecutionError) -> Self {
        SandboxError::new(error.code(), error.to_string())
    }
}
