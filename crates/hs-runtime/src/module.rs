use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use hs_core::{
    Artifacts, EnvironmentSet, ExecutionError, Report, RequestSnapshot, ResponseSnapshot,
    ScriptExecutionRequest, TestTracker,
};

use crate::session::{Handle, Session};

/// Where a module's object is attached relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountLocation {
    /// Every property of the module object is copied onto the parent.
    MergeIntoRoot,
    /// The module object is attached under the given name.
    Namespaced(&'static str),
}

/// State a module makes available to modules installed after it.
#[derive(Debug, Clone)]
pub enum ExposedState {
    Env(Rc<RefCell<EnvironmentSet>>),
    Tracker(Rc<RefCell<TestTracker>>),
}

/// Per-invocation installation context: the request inputs plus whatever
/// earlier modules exposed.
#[derive(Debug, Default)]
pub struct InitContext {
    pub env: EnvironmentSet,
    pub artifacts: Artifacts,
    pub response: Option<ResponseSnapshot>,
    pub request: Option<RequestSnapshot>,
    exposed: BTreeMap<String, ExposedState>,
}

impl InitContext {
    pub fn from_request(request: &ScriptExecutionRequest) -> Self {
        Self {
            env: request.env.clone(),
            artifacts: request.artifacts.clone().unwrap_or_default(),
            response: request.response.clone(),
            request: request.request.clone(),
            exposed: BTreeMap::new(),
        }
    }

    pub fn expose(&mut self, id: &str, state: ExposedState) {
        self.exposed.insert(id.to_string(), state);
    }

    pub fn use_exposed(&self, id: &str) -> Result<ExposedState, ExecutionError> {
        self.exposed.get(id).cloned().ok_or_else(|| {
            ExecutionError::Initialization(format!(
                "Could not find API with ID {}. Make sure the API is above in the initialization order",
                id
            ))
        })
    }

    pub fn use_env(&self, id: &str) -> Result<Rc<RefCell<EnvironmentSet>>, ExecutionError> {
        match self.use_exposed(id)? {
            ExposedState::Env(state) => Ok(state),
            ExposedState::Tracker(_) => Err(ExecutionError::Initialization(format!(
                "API with ID {} does not expose environment state",
                id
            ))),
        }
    }

    pub fn use_tracker(&self, id: &str) -> Result<Rc<RefCell<TestTracker>>, ExecutionError> {
        match self.use_exposed(id)? {
            ExposedState::Tracker(state) => Ok(state),
            ExposedState::Env(_) => Err(ExecutionError::Initialization(format!(
                "API with ID {} does not expose a test tracker",
                id
            ))),
        }
    }
}

/// A capability installed into a session's guest globals.
pub trait CapabilityModule {
    fn id(&self) -> &'static str;

    fn mount(&self) -> MountLocation;

    /// Builds the module's guest object and returns the handle that owns it.
    fn create(
        &mut self,
        session: &mut Session,
        ctx: &mut InitContext,
    ) -> Result<Handle, ExecutionError>;

    /// Modules installed into this module's own object.
    fn take_children(&mut self) -> Vec<Box<dyn CapabilityModule>> {
        Vec::new()
    }

    fn on_pre_request_complete(&mut self, report: Report) -> Report {
        report
    }

    fn on_test_complete(&mut self, report: Report) -> Report {
        report
    }
}

#[cfg(test)]
mod module_tests {
    use super::*;

    #[test]
    fn missing_exposed_state_names_the_api() {
        let ctx = InitContext::default();
        let error = ctx.use_exposed("pw.env").expect_err("nothing exposed yet");
        assert_eq!(
            error.to_string(),
            "Sandbox initialization failed: Could not find API with ID pw.env. Make sure the API is above in the initialization order"
        );
    }

    #[test]
    fn exposed_state_is_shared_not_copied() {
        let mut ctx = InitContext::default();
        let tracker = Rc::new(RefCell::new(TestTracker::new()));
        ctx.expose("pw.test", ExposedState::Tracker(Rc::clone(&tracker)));

        let shared = ctx.use_tracker("pw.test").expect("tracker should be exposed");
        shared.borrow_mut().push("from module");
        assert_eq!(tracker.borrow().depth(), 1);
        assert!(ctx.use_env("pw.test").is_err());
    }

    #[test]
    fn context_takes_request_inputs() {
        let request = ScriptExecutionRequest::pre_request("", EnvironmentSet::default());
        let ctx = InitContext::from_request(&request);
        assert!(ctx.artifacts.is_empty());
        assert!(ctx.response.is_none());
    }
}
