use hs_core::{ExecutionError, Report, ScriptExecutionRequest};
use tracing::{debug, warn};

use crate::injector::inject;
use crate::module::InitContext;
use crate::options::SandboxOptions;
use crate::registry::modules_for;
use crate::session::Session;

/// Runs one script in a fresh session and folds the module hooks into a
/// report. A guest error aborts the run and no partial report is returned.
pub fn run(
    request: &ScriptExecutionRequest,
    options: &SandboxOptions,
) -> Result<Report, ExecutionError> {
    let mut session = Session::open(options)?;
    let mut ctx = InitContext::from_request(request);
    let mut installed = inject(&mut session, &mut ctx, modules_for(request.mode))?;

    if let Err(error) = session.eval(&request.script) {
        let released = installed.release(&mut session);
        session.close();
        warn!(code = error.code(), released, "script aborted: {}", error);
        return Err(error);
    }

    let report = installed.complete(request.mode, Report::default());
    let released = installed.release(&mut session);
    session.close();
    debug!(mode = ?request.mode, released, "script completed");
    Ok(report)
}
