use std::mem;

use hs_core::ExecutionError;
use rhai::{Dynamic, Map};

use crate::module::{CapabilityModule, InitContext, MountLocation};
use crate::session::{Handle, Session};

/// Empty namespace object (`pw`, `hopp`) that hosts child modules.
pub struct NamespaceModule {
    name: &'static str,
    children: Vec<Box<dyn CapabilityModule>>,
}

impl NamespaceModule {
    pub fn new(name: &'static str, children: Vec<Box<dyn CapabilityModule>>) -> Self {
        Self { name, children }
    }
}

impl CapabilityModule for NamespaceModule {
    fn id(&self) -> &'static str {
        self.name
    }

    fn mount(&self) -> MountLocation {
        MountLocation::Namespaced(self.name)
    }

    fn create(
        &mut self,
        session: &mut Session,
        _ctx: &mut InitContext,
    ) -> Result<Handle, ExecutionError> {
        Ok(session.alloc(Dynamic::from_map(Map::new())))
    }

    fn take_children(&mut self) -> Vec<Box<dyn CapabilityModule>> {
        mem::take(&mut self.children)
    }
}
