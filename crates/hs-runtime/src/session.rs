use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hs_core::{ConsoleEntry, ConsoleLevel, ExecutionError, MarshalError, SandboxValue};
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, EvalAltResult, Map, Scope};
use tracing::debug;

use crate::marshal::to_guest;
use crate::options::SandboxOptions;

/// Opaque reference to a guest object owned by a session's arena.
///
/// Handles cannot be copied; giving one back to [`Session::release`] consumes
/// it, so each is released at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct Handle(usize);

impl Handle {
    pub fn id(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct HandleArena {
    slots: Vec<Option<Dynamic>>,
    live: usize,
}

impl HandleArena {
    pub fn alloc(&mut self, value: Dynamic) -> Handle {
        self.slots.push(Some(value));
        self.live += 1;
        Handle(self.slots.len() - 1)
    }

    pub fn get(&self, handle: &Handle) -> Option<&Dynamic> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, handle: &Handle) -> Option<&mut Dynamic> {
        self.slots.get_mut(handle.0).and_then(Option::as_mut)
    }

    pub fn release(&mut self, handle: Handle) -> bool {
        match self.slots.get_mut(handle.0).and_then(Option::take) {
            Some(_) => {
                self.live -= 1;
                true
            }
            None => false,
        }
    }

    /// Drops every remaining value and returns how many were still live.
    pub fn release_all(&mut self) -> usize {
        let released = self.live;
        self.slots.clear();
        self.live = 0;
        released
    }

    pub fn live(&self) -> usize {
        self.live
    }
}

/// One isolated interpreter instance: engine, scope, handle arena and the
/// table of guest globals.
pub struct Session {
    engine: Engine,
    scope: Scope<'static>,
    arena: HandleArena,
    globals: Rc<RefCell<Map>>,
    console: Rc<RefCell<Vec<ConsoleEntry>>>,
    cancel: Arc<AtomicBool>,
    max_marshal_depth: usize,
}

impl Session {
    pub fn open(options: &SandboxOptions) -> Result<Self, ExecutionError> {
        if options.max_marshal_depth == 0 {
            return Err(ExecutionError::Initialization(
                "maxMarshalDepth must be at least 1".to_string(),
            ));
        }

        let mut engine = Engine::new();
        engine
            .set_max_operations(options.max_operations)
            .set_max_call_levels(options.max_call_levels)
            .set_max_expr_depths(options.max_expr_depth, options.max_function_expr_depth)
            .set_max_string_size(options.max_string_size)
            .set_max_array_size(options.max_array_size)
            .set_max_map_size(options.max_map_size)
            .set_module_resolver(DummyModuleResolver::new())
            .disable_symbol("eval");

        let cancel = options.cancel_flag();
        let cancel_for_progress = Arc::clone(&cancel);
        engine.on_progress(move |_| {
            if cancel_for_progress.load(Ordering::Relaxed) {
                Some(Dynamic::UNIT)
            } else {
                None
            }
        });

        let globals = Rc::new(RefCell::new(Map::new()));
        let globals_for_var = Rc::clone(&globals);
        #[allow(deprecated)]
        engine.on_var(move |name, _, _| Ok(globals_for_var.borrow().get(name).cloned()));

        let console = Rc::new(RefCell::new(Vec::new()));
        let console_for_print = Rc::clone(&console);
        engine.on_print(move |text| {
            console_for_print.borrow_mut().push(ConsoleEntry {
                line_number: 0,
                data: vec![SandboxValue::string(text)],
                level: ConsoleLevel::Log,
            });
        });
        let console_for_debug = Rc::clone(&console);
        engine.on_debug(move |text, _, position| {
            console_for_debug.borrow_mut().push(ConsoleEntry {
                line_number: position.line().unwrap_or_default(),
                data: vec![SandboxValue::string(text)],
                level: ConsoleLevel::Debug,
            });
        });

        debug!(max_operations = options.max_operations, "session opened");
        Ok(Self {
            engine,
            scope: Scope::new(),
            arena: HandleArena::default(),
            globals,
            console,
            cancel,
            max_marshal_depth: options.max_marshal_depth,
        })
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn max_marshal_depth(&self) -> usize {
        self.max_marshal_depth
    }

    /// Buffer shared by `print`/`debug` and the console module.
    pub fn console_buffer(&self) -> Rc<RefCell<Vec<ConsoleEntry>>> {
        Rc::clone(&self.console)
    }

    pub fn alloc(&mut self, value: Dynamic) -> Handle {
        self.arena.alloc(value)
    }

    /// Marshals `value` into the guest and returns a fresh handle to it.
    pub fn alloc_value(&mut self, value: &SandboxValue) -> Result<Handle, MarshalError> {
        let guest = to_guest(value)?;
        Ok(self.arena.alloc(guest))
    }

    pub fn object(&self, handle: &Handle) -> Option<&Dynamic> {
        self.arena.get(handle)
    }

    pub fn object_mut(&mut self, handle: &Handle) -> Option<&mut Dynamic> {
        self.arena.get_mut(handle)
    }

    pub fn release(&mut self, handle: Handle) -> bool {
        self.arena.release(handle)
    }

    pub fn live_handles(&self) -> usize {
        self.arena.live()
    }

    /// Installs `value` as the read-only guest global `name`. An existing map
    /// under the same name absorbs the new map's properties.
    pub fn set_global(&mut self, name: &str, value: Dynamic) {
        let mut globals = self.globals.borrow_mut();
        let mergeable = value.is_map() && globals.get(name).is_some_and(Dynamic::is_map);
        if mergeable {
            if let Some(existing) = globals.get_mut(name) {
                merge_maps(existing, value);
            }
        } else {
            globals.insert(name.into(), value);
        }
    }

    pub fn global(&self, name: &str) -> Option<Dynamic> {
        self.globals.borrow().get(name).cloned()
    }

    pub fn global_names(&self) -> Vec<String> {
        self.globals
            .borrow()
            .keys()
            .map(|key| key.to_string())
            .collect()
    }

    pub fn eval(&mut self, script: &str) -> Result<(), ExecutionError> {
        let ast = self
            .engine
            .compile(script)
            .map_err(|error| ExecutionError::ScriptFailed(error.to_string()))?;
        self.engine
            .run_ast_with_scope(&mut self.scope, &ast)
            .map_err(|error| self.script_error(*error))
    }

    fn script_error(&self, error: EvalAltResult) -> ExecutionError {
        match error {
            EvalAltResult::ErrorTerminated(..) => ExecutionError::Cancelled,
            _ if self.cancel.load(Ordering::Relaxed) => ExecutionError::Cancelled,
            other => ExecutionError::ScriptFailed(guest_error_message(&other)),
        }
    }

    /// Releases the arena and every handle still in it.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let leaked = self.arena.release_all();
        self.globals.borrow_mut().clear();
        self.scope.clear();
        debug!(released = leaked, "session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.arena.live() > 0 {
            self.shutdown();
        }
    }
}

/// Copies every property of `source` onto `target`, merging nested maps.
pub fn merge_maps(target: &mut Dynamic, source: Dynamic) {
    let Some(mut target_map) = target.write_lock::<Map>() else {
        return;
    };
    let Some(source_map) = source.try_cast::<Map>() else {
        return;
    };
    for (key, value) in source_map {
        let mergeable = value.is_map() && target_map.get(&key).is_some_and(Dynamic::is_map);
        if mergeable {
            if let Some(existing) = target_map.get_mut(&key) {
                merge_maps(existing, value);
            }
        } else {
            target_map.insert(key, value);
        }
    }
}

/// Message of the innermost error, with thrown values rendered as text.
pub fn guest_error_message(error: &EvalAltResult) -> String {
    match error {
        EvalAltResult::ErrorRuntime(value, _) => value.to_string(),
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => guest_error_message(inner),
        EvalAltResult::ErrorInModule(_, inner, _) => guest_error_message(inner),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn arena_releases_each_handle_once() {
        let mut arena = HandleArena::default();
        let first = arena.alloc(Dynamic::from(1_i64));
        let second = arena.alloc(Dynamic::from(2_i64));
        assert_eq!(arena.live(), 2);
        assert_eq!(
            arena.get(&second).and_then(|value| value.as_int().ok()),
            Some(2)
        );
        assert!(arena.release(first));
        assert_eq!(arena.live(), 1);
        assert_eq!(arena.release_all(), 1);
        assert_eq!(arena.live(), 0);
        assert!(arena.get(&second).is_none());
    }

    #[test]
    fn close_releases_remaining_handles() {
        let mut session = Session::open(&SandboxOptions::default()).expect("session should open");
        let handle = session
            .alloc_value(&SandboxValue::string("kept"))
            .expect("value should marshal");
        let _other = session
            .alloc_value(&SandboxValue::Number(1.0))
            .expect("value should marshal");
        assert_eq!(session.live_handles(), 2);
        assert!(session.release(handle));
        assert_eq!(session.live_handles(), 1);
        session.close();
    }

    #[test]
    fn scripts_run_and_errors_carry_thrown_text() {
        let mut session = Session::open(&SandboxOptions::default()).expect("session should open");
        session.eval("let x = 40 + 2;").expect("script should run");
        let error = session
            .eval(r#"throw "boom";"#)
            .expect_err("throw should fail the script");
        assert_eq!(error, ExecutionError::ScriptFailed("boom".to_string()));
    }

    #[test]
    fn eval_is_disabled_and_limits_apply() {
        let mut session = Session::open(&SandboxOptions::default()).expect("session should open");
        assert!(session.eval(r#"eval("1 + 1")"#).is_err());

        let mut options = SandboxOptions::default();
        options.max_operations = 1_000;
        let mut limited = Session::open(&options).expect("session should open");
        let error = limited
            .eval("loop { }")
            .expect_err("endless loop should hit the operation limit");
        assert_eq!(error.code(), "EXEC_SCRIPT");
    }

    #[test]
    fn cancel_flag_terminates_evaluation() {
        let options = SandboxOptions::default();
        options.cancel_flag().store(true, Ordering::Relaxed);
        let mut session = Session::open(&options).expect("session should open");
        let error = session.eval("loop { }").expect_err("cancelled run should fail");
        assert_eq!(error, ExecutionError::Cancelled);
    }

    #[test]
    fn globals_are_read_only_and_merge() {
        let mut session = Session::open(&SandboxOptions::default()).expect("session should open");
        let mut first = Map::new();
        first.insert("a".into(), Dynamic::from(1_i64));
        session.set_global("pw", Dynamic::from_map(first));
        let mut second = Map::new();
        second.insert("b".into(), Dynamic::from(2_i64));
        session.set_global("pw", Dynamic::from_map(second));

        session
            .eval("if pw.a + pw.b != 3 { throw \"bad sum\"; }")
            .expect("merged globals should be visible");
        assert!(session.eval("pw = 5;").is_err());
        assert_eq!(session.global_names(), vec!["pw".to_string()]);
    }

    #[test]
    fn print_and_debug_reach_the_console_buffer() {
        let mut session = Session::open(&SandboxOptions::default()).expect("session should open");
        session
            .eval("print(\"hello\");\ndebug(\"trace\");")
            .expect("script should run");
        let entries = session.console_buffer().borrow().clone();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, ConsoleLevel::Log);
        assert_eq!(entries[0].data, vec![SandboxValue::string("hello")]);
        assert_eq!(entries[1].level, ConsoleLevel::Debug);
        assert_eq!(entries[1].line_number, 2);
    }

    #[test]
    fn zero_marshal_depth_fails_initialization() {
        let mut options = SandboxOptions::default();
        options.max_marshal_depth = 0;
        let error = Session::open(&options).err().expect("open should fail");
        assert_eq!(error.code(), "EXEC_INIT");
    }
}
