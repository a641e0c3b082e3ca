use std::cell::RefCell;
use std::rc::Rc;

use hs_core::{environment, EnvScope, EnvironmentSet, ExecutionError};
use rhai::{Dynamic, Map};

use super::env::ENV_API_ID;
use super::{insert_fn, optional_string, string_arg};
use crate::module::{CapabilityModule, InitContext, MountLocation};
use crate::session::{Handle, Session};

/// `hopp.env`, with `hopp.env.active` and `hopp.env.global` restricted to a
/// single list. Shares state with `pw.env`.
#[derive(Default)]
pub struct HoppEnvModule;

impl HoppEnvModule {
    pub fn new() -> Self {
        Self
    }
}

fn update(env: &Rc<RefCell<EnvironmentSet>>, apply: impl FnOnce(&EnvironmentSet) -> EnvironmentSet) {
    let next = apply(&env.borrow());
    *env.borrow_mut() = next;
}

fn scoped_methods(
    state: &Rc<RefCell<EnvironmentSet>>,
    scope: EnvScope,
) -> Result<Map, ExecutionError> {
    let mut object = Map::new();

    let env = Rc::clone(state);
    insert_fn(&mut object, "get", move |_, args| {
        let key = string_arg(args, 0, "key")?;
        Ok(optional_string(environment::get_resolve_in(
            &key,
            &env.borrow(),
            scope,
        )))
    })?;

    let env = Rc::clone(state);
    insert_fn(&mut object, "getRaw", move |_, args| {
        let key = string_arg(args, 0, "key")?;
        Ok(optional_string(environment::get_in(&key, &env.borrow(), scope)))
    })?;

    let env = Rc::clone(state);
    insert_fn(&mut object, "set", move |_, args| {
        let key = string_arg(args, 0, "key")?;
        let value = string_arg(args, 1, "value")?;
        update(&env, |current| environment::set_in(&key, &value, current, scope));
        Ok(Dynamic::UNIT)
    })?;

    let env = Rc::clone(state);
    insert_fn(&mut object, "delete", move |_, args| {
        let key = string_arg(args, 0, "key")?;
        update(&env, |current| environment::unset_in(&key, current, scope));
        Ok(Dynamic::UNIT)
    })?;

    let env = Rc::clone(state);
    insert_fn(&mut object, "reset", move |_, args| {
        let key = string_arg(args, 0, "key")?;
        update(&env, |current| environment::reset_in(&key, current, scope));
        Ok(Dynamic::UNIT)
    })?;

    let env = Rc::clone(state);
    insert_fn(&mut object, "getInitialRaw", move |_, args| {
        let key = string_arg(args, 0, "key")?;
        Ok(optional_string(environment::get_initial_raw_in(
            &key,
            &env.borrow(),
            scope,
        )))
    })?;

    let env = Rc::clone(state);
    insert_fn(&mut object, "setInitial", move |_, args| {
        let key = string_arg(args, 0, "key")?;
        let value = string_arg(args, 1, "value")?;
        update(&env, |current| {
            environment::set_initial_in(&key, &value, current, scope)
        });
        Ok(Dynamic::UNIT)
    })?;

    Ok(object)
}

impl CapabilityModule for HoppEnvModule {
    fn id(&self) -> &'static str {
        "hopp.env"
    }

    fn mount(&self) -> MountLocation {
        MountLocation::Namespaced("env")
    }

    fn create(
        &mut self,
        session: &mut Session,
        ctx: &mut InitContext,
    ) -> Result<Handle, ExecutionError> {
        let state = ctx.use_env(ENV_API_ID)?;

        let mut object = scoped_methods(&state, EnvScope::All)?;
        for scope in [EnvScope::Active, EnvScope::Global] {
            let scoped = scoped_methods(&state, scope)?;
            object.insert(scope.name().into(), Dynamic::from_map(scoped));
        }
        Ok(session.alloc(Dynamic::from_map(object)))
    }
}
