use hs_core::ScriptMode;

use crate::module::CapabilityModule;
use crate::modules::{
    ArtifactModule, ConsoleModule, EnvModule, ExpectModule, HoppEnvModule, NamespaceModule,
    RequestModule, ResponseModule, TestModule,
};

const TEST_TRACKER_ID: &str = "pw.test";

/// Modules for a pre-request script, in installation order.
pub fn pre_request_modules() -> Vec<Box<dyn CapabilityModule>> {
    vec![
        Box::new(ConsoleModule::new()),
        Box::new(NamespaceModule::new(
            "pw",
            vec![Box::new(EnvModule::new())],
        )),
        Box::new(NamespaceModule::new(
            "hopp",
            vec![
                Box::new(HoppEnvModule::new()),
                Box::new(ArtifactModule::new()),
                Box::new(RequestModule::editable()),
            ],
        )),
    ]
}

/// Modules for a test script. `hopp.test` and `hopp.expect` record into the
/// tracker owned by `pw.test`, so both namespaces build one tree. The
/// request is visible but can no longer be edited.
pub fn test_modules() -> Vec<Box<dyn CapabilityModule>> {
    vec![
        Box::new(ConsoleModule::new()),
        Box::new(NamespaceModule::new(
            "pw",
            vec![
                Box::new(EnvModule::new()),
                Box::new(TestModule::owner(TEST_TRACKER_ID)),
                Box::new(ExpectModule::new("pw.expect", TEST_TRACKER_ID)),
                Box::new(ResponseModule::plain()),
            ],
        )),
        Box::new(NamespaceModule::new(
            "hopp",
            vec![
                Box::new(HoppEnvModule::new()),
                Box::new(ArtifactModule::new()),
                Box::new(RequestModule::read_only()),
                Box::new(TestModule::sharing("hopp.test", TEST_TRACKER_ID)),
                Box::new(ExpectModule::new("hopp.expect", TEST_TRACKER_ID)),
                Box::new(ResponseModule::with_accessors()),
            ],
        )),
    ]
}

pub fn modules_for(mode: ScriptMode) -> Vec<Box<dyn CapabilityModule>> {
    match mode {
        ScriptMode::PreRequest => pre_request_modules(),
        ScriptMode::Test => test_modules(),
    }
}
