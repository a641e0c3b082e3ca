//! Capability modules installed into the guest globals.
//!
//! Every guest-callable function is a native function pointer stored as a
//! property of its namespace map, so `pw.env.get(key)` dispatches straight
//! to the closure with the namespace map as the first argument.

mod artifact;
mod console;
mod env;
mod expect;
mod hopp_env;
mod namespace;
mod request;
mod response;

pub use artifact::ArtifactModule;
pub use console::ConsoleModule;
pub use env::EnvModule;
pub use expect::{ExpectModule, GuestExpectation};
pub use hopp_env::HoppEnvModule;
pub use namespace::NamespaceModule;
pub use request::{GuestRequest, GuestRequestVariables, RequestModule};
pub use response::ResponseModule;
pub use test::TestModule;

use hs_core::ExecutionError;
use rhai::{Dynamic, EvalAltResult, FnPtr, Map, NativeCallContext};

use crate::marshal::guest_error;

/// Wraps `func` as a guest-callable function value named `name`.
pub(crate) fn guest_fn<F>(name: &str, func: F) -> Result<Dynamic, ExecutionError>
where
    F: Fn(NativeCallContext, &mut [&mut Dynamic]) -> Result<Dynamic, Box<EvalAltResult>>
        + 'static,
{
    #[allow(deprecated)]
    let function = FnPtr::from_fn(name, func).map_err(|error| {
        ExecutionError::Initialization(format!("Invalid guest function {}: {}", name, error))
    })?;
    Ok(Dynamic::from(function))
}

/// Inserts a guest function into `map` under its own name.
pub(crate) fn insert_fn<F>(map: &mut Map, name: &str, func: F) -> Result<(), ExecutionError>
where
    F: Fn(NativeCallContext, &mut [&mut Dynamic]) -> Result<Dynamic, Box<EvalAltResult>>
        + 'static,
{
    map.insert(name.into(), guest_fn(name, func)?);
    Ok(())
}

/// Call argument `index`, not counting the receiver object. Missing
/// arguments read as unit.
pub(crate) fn arg(args: &[&mut Dynamic], index: usize) -> Dynamic {
    args.get(index + 1)
        .map(|value| value.flatten_clone())
        .unwrap_or(Dynamic::UNIT)
}

/// Every call argument after the receiver object.
pub(crate) fn rest_args(args: &[&mut Dynamic]) -> Vec<Dynamic> {
    args.iter()
        .skip(1)
        .map(|value| value.flatten_clone())
        .collect()
}

pub(crate) fn string_arg(
    args: &[&mut Dynamic],
    index: usize,
    what: &str,
) -> Result<String, Box<EvalAltResult>> {
    arg(args, index)
        .into_string()
        .map_err(|_| guest_error(format!("Expected {} to be a string", what)))
}

pub(crate) fn fn_arg(args: &[&mut Dynamic], index: usize) -> Option<FnPtr> {
    arg(args, index).try_cast::<FnPtr>()
}

pub(crate) fn optional_string(value: Option<String>) -> Dynamic {
    value.map_or(Dynamic::UNIT, Dynamic::from)
}

#[cfg(test)]
mod modules_tests {
    use super::*;

    #[test]
    fn args_skip_the_receiver() {
        let mut receiver = Dynamic::from_map(Map::new());
        let mut first = Dynamic::from("key");
        let mut second = Dynamic::from(3_i64);
        let args = [&mut receiver, &mut first, &mut second];

        assert_eq!(arg(&args, 0).into_string().ok().as_deref(), Some("key"));
        assert!(arg(&args, 5).is_unit());
        assert_eq!(rest_args(&args).len(), 2);
        assert_eq!(
            string_arg(&args, 1, "value")
                .err()
                .map(|error| crate::session::guest_error_message(&error)),
            Some("Expected value to be a string".to_string())
        );
    }

    #[test]
    fn guest_functions_need_valid_names() {
        assert!(guest_fn("getResolve", |_, _| Ok(Dynamic::UNIT)).is_ok());
        assert!(guest_fn("not a name", |_, _| Ok(Dynamic::UNIT)).is_err());
    }
}
