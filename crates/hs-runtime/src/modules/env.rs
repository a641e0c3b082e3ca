use std::cell::RefCell;
use std::rc::Rc;

use hs_core::{environment, EnvironmentSet, ExecutionError, Report};
use rhai::{Dynamic, Map};
use tracing::debug;

use super::{insert_fn, optional_string, string_arg};
use crate::module::{CapabilityModule, ExposedState, InitContext, MountLocation};
use crate::session::{Handle, Session};

pub const ENV_API_ID: &str = "pw.env";

/// `pw.env`: owns the environment state every other env surface shares.
#[derive(Default)]
pub struct EnvModule {
    state: Option<Rc<RefCell<EnvironmentSet>>>,
}

impl EnvModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn fold(&self, mut report: Report) -> Report {
        if let Some(state) = &self.state {
            report.env = state.borrow().clone();
        }
        report
    }
}

impl CapabilityModule for EnvModule {
    fn id(&self) -> &'static str {
        ENV_API_ID
    }

    fn mount(&self) -> MountLocation {
        MountLocation::Namespaced("env")
    }

    fn create(
        &mut self,
        session: &mut Session,
        ctx: &mut InitContext,
    ) -> Result<Handle, ExecutionError> {
        let state = Rc::new(RefCell::new(ctx.env.clone()));
        ctx.expose(ENV_API_ID, ExposedState::Env(Rc::clone(&state)));
        self.state = Some(Rc::clone(&state));

        let mut object = Map::new();

        let env = Rc::clone(&state);
        insert_fn(&mut object, "get", move |_, args| {
            let key = string_arg(args, 0, "key")?;
            Ok(optional_string(environment::get(&key, &env.borrow())))
        })?;

        let env = Rc::clone(&state);
        insert_fn(&mut object, "getResolve", move |_, args| {
            let key = string_arg(args, 0, "key")?;
            Ok(optional_string(environment::get_resolve(&key, &env.borrow())))
        })?;

        let env = Rc::clone(&state);
        insert_fn(&mut object, "set", move |_, args| {
            let key = string_arg(args, 0, "key")?;
            let value = string_arg(args, 1, "value")?;
            let next = environment::set(&key, &value, &env.borrow());
            *env.borrow_mut() = next;
            Ok(Dynamic::UNIT)
        })?;

        let env = Rc::clone(&state);
        insert_fn(&mut object, "unset", move |_, args| {
            let key = string_arg(args, 0, "key")?;
            let next = environment::unset(&key, &env.borrow());
            *env.borrow_mut() = next;
            Ok(Dynamic::UNIT)
        })?;

        let env = state;
        insert_fn(&mut object, "resolve", move |_, args| {
            let template = string_arg(args, 0, "value")?;
            Ok(Dynamic::from(environment::resolve(&template, &env.borrow())))
        })?;

        debug!(id = ENV_API_ID, "environment api created");
        Ok(session.alloc(Dynamic::from_map(object)))
    }

    fn on_pre_request_complete(&mut self, report: Report) -> Report {
        self.fold(report)
    }

    fn on_test_complete(&mut self, report: Report) -> Report {
        self.fold(report)
    }
}
