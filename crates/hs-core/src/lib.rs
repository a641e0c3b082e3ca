pub mod environment;
pub mod error;
pub mod matchers;
pub mod request;
pub mod template;
pub mod tracker;
pub mod types;
pub mod value;

pub use environment::EnvScope;
pub use error::{ExecutionError, MarshalError, SandboxError};
pub use matchers::{Expectation, Flag, SatisfyOutcome, StatusLevel, Subject, ThrowOutcome};
pub use request::{RequestEntry, RequestSnapshot};
pub use tracker::{TestTracker, TrackerState};
pub use types::*;
pub use value::*;
