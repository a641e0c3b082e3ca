use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hs_core::{
    Artifacts, EnvironmentSet, ExecutionError, PreRequestReport, Report, ResponseSnapshot,
    ScriptExecutionRequest, TestReport,
};
use hs_runtime::{orchestrator, SandboxOptions};
use tracing::{debug, warn};

/// Something that can run one script request to a report.
pub trait ScriptBackend {
    fn name(&self) -> &'static str;

    fn execute(&self, request: ScriptExecutionRequest) -> Result<Report, ExecutionError>;
}

/// Runs scripts on the caller's thread.
#[derive(Debug, Clone, Default)]
pub struct InlineBackend {
    options: SandboxOptions,
}

impl InlineBackend {
    pub fn new(options: SandboxOptions) -> Self {
        Self { options }
    }
}

impl ScriptBackend for InlineBackend {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn execute(&self, request: ScriptExecutionRequest) -> Result<Report, ExecutionError> {
        orchestrator::run(&request, &self.options)
    }
}

/// Runs each script on a dedicated worker thread. With a timeout, a script
/// still running when it elapses is cancelled.
#[derive(Debug, Clone, Default)]
pub struct ThreadBackend {
    options: SandboxOptions,
    timeout: Option<Duration>,
}

impl ThreadBackend {
    pub fn new(options: SandboxOptions, timeout_ms: Option<u64>) -> Self {
        Self {
            options,
            timeout: timeout_ms.map(Duration::from_millis),
        }
    }
}

impl ScriptBackend for ThreadBackend {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn execute(&self, request: ScriptExecutionRequest) -> Result<Report, ExecutionError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let options = self.options.clone().with_cancel_flag(Arc::clone(&cancel));
        let (sender, receiver) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("hs-script".to_string())
            .spawn(move || {
                let _ = sender.send(orchestrator::run(&request, &options));
            })
            .map_err(|error| {
                ExecutionError::Backend(format!("failed to spawn script worker: {}", error))
            })?;

        let outcome = match self.timeout {
            Some(timeout) => match receiver.recv_timeout(timeout) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => {
                    cancel.store(true, Ordering::Relaxed);
                    warn!(timeout_ms = timeout.as_millis() as u64, "script timed out");
                    let _ = receiver.recv();
                    Err(ExecutionError::Cancelled)
                }
                Err(RecvTimeoutError::Disconnected) => Err(worker_lost()),
            },
            None => receiver.recv().unwrap_or_else(|_| Err(worker_lost())),
        };

        worker
            .join()
            .map_err(|_| ExecutionError::Backend("script worker panicked".to_string()))?;
        outcome
    }
}

fn worker_lost() -> ExecutionError {
    ExecutionError::Backend("script worker exited without a result".to_string())
}

/// The two script contract operations over any backend.
pub struct Sandbox {
    backend: Box<dyn ScriptBackend>,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(InlineBackend::default())
    }
}

impl Sandbox {
    pub fn new(backend: impl ScriptBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn execute(&self, request: ScriptExecutionRequest) -> Result<Report, ExecutionError> {
        debug!(backend = self.backend.name(), mode = ?request.mode, "executing script");
        self.backend.execute(request)
    }

    pub fn execute_pre_request_script(
        &self,
        script: &str,
        env: EnvironmentSet,
        artifacts: Option<Artifacts>,
    ) -> Result<PreRequestReport, ExecutionError> {
        let mut request = ScriptExecutionRequest::pre_request(script, env);
        request.artifacts = artifacts;
        Ok(self.execute(request)?.into_pre_request())
    }

    pub fn execute_test_script(
        &self,
        script: &str,
        env: EnvironmentSet,
        response: ResponseSnapshot,
    ) -> Result<TestReport, ExecutionError> {
        let request = ScriptExecutionRequest::test(script, env, response);
        Ok(self.execute(request)?.into_test())
    }
}

/// Runs a pre-request script inline with default limits.
pub fn execute_pre_request_script(
    script: &str,
    env: EnvironmentSet,
    artifacts: Option<Artifacts>,
) -> Result<PreRequestReport, ExecutionError> {
    Sandbox::default().execute_pre_request_script(script, env, artifacts)
}

/// Runs a test script inline with default limits.
pub fn execute_test_script(
    script: &str,
    env: EnvironmentSet,
    response: ResponseSnapshot,
) -> Result<TestReport, ExecutionError> {
    Sandbox::default().execute_test_script(script, env, response)
}
