use hs_core::{ExecutionError, Report, ScriptMode};
use rhai::{Dynamic, Map};
use tracing::debug;

use crate::module::{CapabilityModule, InitContext, MountLocation};
use crate::session::{merge_maps, Handle, Session};

/// Modules in installation order, each with the handle owning its object.
#[derive(Default)]
pub struct InstalledModules {
    entries: Vec<(Box<dyn CapabilityModule>, Handle)>,
}

impl InstalledModules {
    pub fn ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(module, _)| module.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Folds every module's completion hook over `report`, in installation
    /// order.
    pub fn complete(&mut self, mode: ScriptMode, report: Report) -> Report {
        self.entries
            .iter_mut()
            .fold(report, |report, (module, _)| match mode {
                ScriptMode::PreRequest => module.on_pre_request_complete(report),
                ScriptMode::Test => module.on_test_complete(report),
            })
    }

    /// Releases each module handle exactly once.
    pub fn release(self, session: &mut Session) -> usize {
        let mut released = 0;
        for (_, handle) in self.entries {
            if session.release(handle) {
                released += 1;
            }
        }
        released
    }
}

/// Creates, nests and mounts `modules` into the session's guest globals.
///
/// Installation stops at the first failing module; handles created so far
/// are released before the error is returned.
pub fn inject(
    session: &mut Session,
    ctx: &mut InitContext,
    modules: Vec<Box<dyn CapabilityModule>>,
) -> Result<InstalledModules, ExecutionError> {
    let mut installed = InstalledModules::default();
    for module in modules {
        match install(session, ctx, module, &mut installed) {
            Ok((object, location)) => mount_global(session, location, object),
            Err(error) => {
                installed.release(session);
                return Err(error);
            }
        }
    }
    debug!(modules = installed.len(), "capability modules installed");
    Ok(installed)
}

fn install(
    session: &mut Session,
    ctx: &mut InitContext,
    mut module: Box<dyn CapabilityModule>,
    installed: &mut InstalledModules,
) -> Result<(Dynamic, MountLocation), ExecutionError> {
    let handle = module.create(session, ctx)?;
    let children = module.take_children();
    let location = module.mount();
    let id = module.id();
    debug!(id, children = children.len(), "module created");

    let index = installed.entries.len();
    installed.entries.push((module, handle));

    for child in children {
        let (child_object, child_location) = install(session, ctx, child, installed)?;
        let parent = session
            .object_mut(&installed.entries[index].1)
            .ok_or_else(|| released_handle(id))?;
        if !mount_into(parent, child_location, child_object) {
            return Err(ExecutionError::Initialization(format!(
                "API {} cannot host child APIs",
                id
            )));
        }
    }

    let object = session
        .object(&installed.entries[index].1)
        .cloned()
        .ok_or_else(|| released_handle(id))?;
    Ok((object, location))
}

fn released_handle(id: &str) -> ExecutionError {
    ExecutionError::Initialization(format!("API {} was released during installation", id))
}

/// Returns `false` when `parent` is not an object.
fn mount_into(parent: &mut Dynamic, location: MountLocation, object: Dynamic) -> bool {
    if !parent.is_map() {
        return false;
    }
    match location {
        MountLocation::MergeIntoRoot => merge_maps(parent, object),
        MountLocation::Namespaced(name) => {
            let mut wrapper = Map::new();
            wrapper.insert(name.into(), object);
            merge_maps(parent, Dynamic::from_map(wrapper));
        }
    }
    true
}

fn mount_global(session: &mut Session, location: MountLocation, object: Dynamic) {
    match location {
        MountLocation::MergeIntoRoot => {
            if let Some(properties) = object.try_cast::<Map>() {
                for (name, value) in properties {
                    session.set_global(&name, value);
                }
            }
        }
        MountLocation::Namespaced(name) => session.set_global(name, object),
    }
}

#[cfg(test)]
mod injector_tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::module::ExposedState;
    use crate::options::SandboxOptions;
    use hs_core::EnvironmentSet;

    struct RecordingModule {
        id: &'static str,
        mount: MountLocation,
        log: Rc<RefCell<Vec<String>>>,
        children: Vec<Box<dyn CapabilityModule>>,
        needs: Option<&'static str>,
    }

    impl RecordingModule {
        fn boxed(
            id: &'static str,
            mount: MountLocation,
            log: &Rc<RefCell<Vec<String>>>,
        ) -> Box<Self> {
            Box::new(Self {
                id,
                mount,
                log: Rc::clone(log),
                children: Vec::new(),
                needs: None,
            })
        }
    }

    impl CapabilityModule for RecordingModule {
        fn id(&self) -> &'static str {
            self.id
        }

        fn mount(&self) -> MountLocation {
            self.mount
        }

        fn create(
            &mut self,
            session: &mut Session,
            ctx: &mut InitContext,
        ) -> Result<Handle, ExecutionError> {
            if let Some(needed) = self.needs {
                ctx.use_exposed(needed)?;
            }
            ctx.expose(
                self.id,
                ExposedState::Env(Rc::new(RefCell::new(EnvironmentSet::default()))),
            );
            self.log.borrow_mut().push(format!("create {}", self.id));
            let mut object = Map::new();
            object.insert(format!("{}_value", self.id).into(), Dynamic::from(1_i64));
            Ok(session.alloc(Dynamic::from_map(object)))
        }

        fn take_children(&mut self) -> Vec<Box<dyn CapabilityModule>> {
            std::mem::take(&mut self.children)
        }

        fn on_test_complete(&mut self, report: Report) -> Report {
            self.log.borrow_mut().push(format!("complete {}", self.id));
            report
        }
    }

    #[test]
    fn children_mount_into_parent_before_parent_mounts() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut parent = RecordingModule::boxed("ns", MountLocation::Namespaced("ns"), &log);
        parent.children = vec![
            RecordingModule::boxed("inner", MountLocation::Namespaced("inner"), &log),
            RecordingModule::boxed("flat", MountLocation::MergeIntoRoot, &log),
        ];

        let mut session = Session::open(&SandboxOptions::default()).expect("session should open");
        let mut ctx = InitContext::default();
        let mut installed = inject(&mut session, &mut ctx, vec![parent]).expect("inject");
        assert_eq!(installed.ids(), vec!["ns", "inner", "flat"]);

        session
            .eval("if ns.inner.inner_value + ns.flat_value + ns.ns_value != 3 { throw \"bad\"; }")
            .expect("mounted objects should be reachable");

        installed.complete(ScriptMode::Test, Report::default());
        assert_eq!(
            log.borrow().clone(),
            vec![
                "create ns",
                "create inner",
                "create flat",
                "complete ns",
                "complete inner",
                "complete flat",
            ]
        );
        assert_eq!(installed.release(&mut session), 3);
        assert_eq!(session.live_handles(), 0);
    }

    #[test]
    fn missing_dependency_stops_installation_and_releases_handles() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = RecordingModule::boxed("first", MountLocation::MergeIntoRoot, &log);
        let mut second = RecordingModule::boxed("second", MountLocation::MergeIntoRoot, &log);
        second.needs = Some("later");

        let mut session = Session::open(&SandboxOptions::default()).expect("session should open");
        let mut ctx = InitContext::default();
        let error = inject(&mut session, &mut ctx, vec![first, second])
            .err()
            .expect("injection should fail");
        assert!(error
            .to_string()
            .contains("Could not find API with ID later"));
        assert_eq!(session.live_handles(), 0);
    }
}
