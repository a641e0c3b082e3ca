pub mod injector;
pub mod marshal;
pub mod module;
pub mod modules;
pub mod options;
pub mod orchestrator;
pub mod registry;
pub mod session;

pub use injector::{inject, InstalledModules};
pub use marshal::{to_guest, to_host};
pub use module::{CapabilityModule, ExposedState, InitContext, MountLocation};
pub use options::SandboxOptions;
pub use orchestrator::run;
pub use registry::{modules_for, pre_request_modules, test_modules};
pub use session::{Handle, HandleArena, Session};
