use std::cell::RefCell;
use std::rc::Rc;

use hs_core::{Artifacts, ExecutionError, Report};
use rhai::{Dynamic, Map};

use super::{insert_fn, optional_string, string_arg};
use crate::marshal::guest_error;
use crate::module::{CapabilityModule, InitContext, MountLocation};
use crate::session::{Handle, Session};

/// `hopp.artifact`: a string store that outlives the environment edits of a
/// single script.
#[derive(Default)]
pub struct ArtifactModule {
    state: Option<Rc<RefCell<Artifacts>>>,
}

impl ArtifactModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn fold(&self, mut report: Report) -> Report {
        if let Some(state) = &self.state {
            report.artifacts = state.borrow().clone();
        }
        report
    }
}

impl CapabilityModule for ArtifactModule {
    fn id(&self) -> &'static str {
        "hopp.artifact"
    }

    fn mount(&self) -> MountLocation {
        MountLocation::Namespaced("artifact")
    }

    fn create(
        &mut self,
        session: &mut Session,
        ctx: &mut InitContext,
    ) -> Result<Handle, ExecutionError> {
        let state = Rc::new(RefCell::new(ctx.artifacts.clone()));
        self.state = Some(Rc::clone(&state));

        let mut object = Map::new();

        let store = Rc::clone(&state);
        insert_fn(&mut object, "get", move |_, args| {
            let key = string_arg(args, 0, "key")?;
            Ok(optional_string(store.borrow().get(&key).cloned()))
        })?;

        let store = Rc::clone(&state);
        insert_fn(&mut object, "create", move |_, args| {
            let key = string_arg(args, 0, "key")?;
            let value = string_arg(args, 1, "value")?;
            let mut store = store.borrow_mut();
            if store.contains_key(&key) {
                return Err(guest_error(format!(
                    "Artifact with key \"{}\" already exists",
                    key
                )));
            }
            store.insert(key, value);
            Ok(Dynamic::UNIT)
        })?;

        let store = Rc::clone(&state);
        insert_fn(&mut object, "update", move |_, args| {
            let key = string_arg(args, 0, "key")?;
            let value = string_arg(args, 1, "value")?;
            let mut store = store.borrow_mut();
            let Some(slot) = store.get_mut(&key) else {
                return Err(guest_error(format!(
                    "Artifact with key \"{}\" does not exist",
                    key
                )));
            };
            *slot = value;
            Ok(Dynamic::UNIT)
        })?;

        let store = state;
        insert_fn(&mut object, "delete", move |_, args| {
            let key = string_arg(args, 0, "key")?;
            match store.borrow_mut().remove(&key) {
                Some(_) => Ok(Dynamic::UNIT),
                None => Err(guest_error(format!(
                    "Artifact with key \"{}\" does not exist",
                    key
                ))),
            }
        })?;

        Ok(session.alloc(Dynamic::from_map(object)))
    }

    fn on_pre_request_complete(&mut self, report: Report) -> Report {
        self.fold(report)
    }

    fn on_test_complete(&mut self, report: Report) -> Report {
        self.fold(report)
    }
}
