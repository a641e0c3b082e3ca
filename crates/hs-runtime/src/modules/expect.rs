use std::cell::RefCell;
use std::rc::Rc;

use hs_core::{
    ExecutionError, ExpectResult, Expectation, Flag, SandboxValue, SatisfyOutcome, StatusLevel,
    TestTracker, ThrowOutcome,
};
use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, Map, NativeCallContext};

use super::{arg, insert_fn};
use crate::marshal::{function_label, guest_error, to_guest, to_host, to_host_lossy};
use crate::module::{CapabilityModule, InitContext, MountLocation};
use crate::session::{guest_error_message, Handle, Session};

type GuestResult<T> = Result<T, Box<EvalAltResult>>;

const CHAIN_WORDS: [&str; 14] = [
    "to", "be", "been", "that", "which", "and", "has", "have", "at", "of", "same", "but", "does",
    "itself",
];

const FLAG_WORDS: [(&str, Flag); 9] = [
    ("not", Flag::Not),
    ("deep", Flag::Deep),
    ("nested", Flag::Nested),
    ("own", Flag::Own),
    ("ordered", Flag::Ordered),
    ("any", Flag::Any),
    ("all", Flag::All),
    ("include", Flag::Include),
    ("contain", Flag::Include),
];

/// Guest-side expectation: the immutable matcher state plus the tracker its
/// results are recorded into.
#[derive(Clone)]
pub struct GuestExpectation {
    inner: Expectation,
    callable: Option<FnPtr>,
    sink: Rc<RefCell<TestTracker>>,
    max_depth: usize,
}

impl GuestExpectation {
    fn new(subject: Dynamic, sink: Rc<RefCell<TestTracker>>, max_depth: usize) -> GuestResult<Self> {
        if let Some(callable) = subject.clone().try_cast::<FnPtr>() {
            return Ok(Self {
                inner: Expectation::function(function_label(&callable)),
                callable: Some(callable),
                sink,
                max_depth,
            });
        }
        let value = to_host(&subject, max_depth).map_err(|error| guest_error(error.to_string()))?;
        Ok(Self {
            inner: Expectation::new(value),
            callable: None,
            sink,
            max_depth,
        })
    }

    fn with_flag(&self, flag: Flag) -> Self {
        Self {
            inner: self.inner.with_flag(flag),
            ..self.clone()
        }
    }

    /// Matcher argument in host form. Callables stand in as their label.
    fn host(&self, value: &Dynamic) -> GuestResult<SandboxValue> {
        if let Some(callable) = value.read_lock::<FnPtr>() {
            return Ok(SandboxValue::String(function_label(&callable)));
        }
        to_host(value, self.max_depth).map_err(|error| guest_error(error.to_string()))
    }

    fn record(&self, check: impl FnOnce(&Expectation) -> ExpectResult) -> Self {
        let result = check(&self.inner);
        self.sink.borrow_mut().record(result);
        self.clone()
    }

    /// The subject as the guest sees it, for callbacks.
    fn guest_subject(&self) -> GuestResult<Dynamic> {
        match &self.callable {
            Some(callable) => Ok(Dynamic::from(callable.clone())),
            None => to_guest(self.inner.subject().value())
                .map_err(|error| guest_error(error.to_string())),
        }
    }

    fn throw_outcome(&self, ctx: &NativeCallContext) -> GuestResult<Option<ThrowOutcome>> {
        let Some(callable) = &self.callable else {
            return Ok(None);
        };
        match callable.call_within_context::<Dynamic>(ctx, ()) {
            Ok(_) => Ok(Some(ThrowOutcome::Returned)),
            Err(error) if is_fatal(&error) => Err(error),
            Err(error) => Ok(Some(ThrowOutcome::Threw {
                message: guest_error_message(&error),
            })),
        }
    }

    fn satisfy_outcome(&self, ctx: &NativeCallContext, matcher: &Dynamic) -> GuestResult<SatisfyOutcome> {
        let Some(matcher) = matcher.clone().try_cast::<FnPtr>() else {
            return Ok(SatisfyOutcome::NotAFunction);
        };
        let subject = self.guest_subject()?;
        match matcher.call_within_context::<Dynamic>(ctx, (subject,)) {
            Ok(value) => Ok(SatisfyOutcome::Returned {
                label: function_label(&matcher),
                value: to_host_lossy(&value, self.max_depth),
            }),
            Err(error) if is_fatal(&error) => Err(error),
            Err(error) => Ok(SatisfyOutcome::Threw {
                message: guest_error_message(&error),
            }),
        }
    }
}

/// Errors that must end the script even inside `throws`/`satisfy`.
fn is_fatal(error: &EvalAltResult) -> bool {
    match error {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => is_fatal(inner),
        EvalAltResult::ErrorTerminated(..)
        | EvalAltResult::ErrorTooManyOperations(..)
        | EvalAltResult::ErrorStackOverflow(..)
        | EvalAltResult::ErrorDataTooLarge(..) => true,
        _ => false,
    }
}

/// Array arguments are spread, everything else is taken as one key.
fn key_list(expectation: &GuestExpectation, values: &[Dynamic]) -> GuestResult<Vec<SandboxValue>> {
    let mut keys = Vec::new();
    for value in values {
        match expectation.host(value)? {
            SandboxValue::Array(items) if values.len() == 1 => keys.extend(items),
            SandboxValue::Object(entries) if values.len() == 1 => {
                keys.extend(entries.into_keys().map(SandboxValue::String));
            }
            other => keys.push(other),
        }
    }
    Ok(keys)
}

fn register_unary(
    engine: &mut Engine,
    names: &[&str],
    matcher: fn(&Expectation, &SandboxValue) -> ExpectResult,
) {
    for name in names {
        engine.register_fn(
            *name,
            move |this: &mut GuestExpectation, value: Dynamic| -> GuestResult<GuestExpectation> {
                let value = this.host(&value)?;
                Ok(this.record(|inner| matcher(inner, &value)))
            },
        );
    }
}

fn register_binary(
    engine: &mut Engine,
    names: &[&str],
    matcher: fn(&Expectation, &str, &SandboxValue, &SandboxValue) -> ExpectResult,
) {
    for name in names {
        let verb = name.to_string();
        engine.register_fn(
            *name,
            move |this: &mut GuestExpectation,
                  first: Dynamic,
                  second: Dynamic|
                  -> GuestResult<GuestExpectation> {
                let first = this.host(&first)?;
                let second = this.host(&second)?;
                Ok(this.record(|inner| matcher(inner, &verb, &first, &second)))
            },
        );
    }
}

fn register_legacy(engine: &mut Engine) {
    engine.register_fn(
        "toBe",
        |this: &mut GuestExpectation, value: Dynamic| -> GuestResult<()> {
            let value = this.host(&value)?;
            this.record(|inner| inner.to_be(&value));
            Ok(())
        },
    );
    for (name, level) in [
        ("toBeLevel2xx", StatusLevel::Success),
        ("toBeLevel3xx", StatusLevel::Redirect),
        ("toBeLevel4xx", StatusLevel::ClientError),
        ("toBeLevel5xx", StatusLevel::ServerError),
    ] {
        engine.register_fn(name, move |this: &mut GuestExpectation| {
            this.record(|inner| inner.to_be_level(level));
        });
    }
    engine.register_fn(
        "toBeType",
        |this: &mut GuestExpectation, value: Dynamic| -> GuestResult<()> {
            let value = this.host(&value)?;
            this.record(|inner| inner.to_be_type(&value));
            Ok(())
        },
    );
    engine.register_fn(
        "toHaveLength",
        |this: &mut GuestExpectation, value: Dynamic| -> GuestResult<()> {
            let value = this.host(&value)?;
            this.record(|inner| inner.to_have_length(&value));
            Ok(())
        },
    );
    engine.register_fn(
        "toInclude",
        |this: &mut GuestExpectation, value: Dynamic| -> GuestResult<()> {
            let value = this.host(&value)?;
            this.record(|inner| inner.to_include(&value));
            Ok(())
        },
    );
}

fn register_chains(engine: &mut Engine) {
    for name in CHAIN_WORDS {
        engine.register_get(name, |this: &mut GuestExpectation| this.clone());
    }
    for (name, flag) in FLAG_WORDS {
        engine.register_get(name, move |this: &mut GuestExpectation| this.with_flag(flag));
    }

    let terminal_getters: [(&str, fn(&Expectation) -> ExpectResult); 6] = [
        ("ok", Expectation::ok),
        ("empty", Expectation::empty),
        ("exist", Expectation::exist),
        ("finite", Expectation::finite),
        ("NaN", Expectation::nan),
        ("undefined", Expectation::undefined),
    ];
    for (name, matcher) in terminal_getters {
        engine.register_get(name, move |this: &mut GuestExpectation| {
            this.record(|inner| matcher(inner))
        });
    }
}

fn register_chai_methods(engine: &mut Engine) {
    register_unary(engine, &["equal", "equals", "eq"], Expectation::equal);
    register_unary(engine, &["eql"], Expectation::eql);
    register_unary(engine, &["above", "gt"], Expectation::above);
    register_unary(engine, &["below", "lt"], Expectation::below);
    register_unary(engine, &["least", "gte"], Expectation::least);
    register_unary(engine, &["most", "lte"], Expectation::most);
    register_unary(engine, &["matches"], Expectation::matches);
    register_unary(engine, &["string"], Expectation::string);
    register_unary(engine, &["members"], Expectation::members);
    register_unary(engine, &["oneOf"], Expectation::one_of);
    register_binary(engine, &["closeTo", "approximately"], Expectation::close_to);

    for name in ["a", "an"] {
        engine.register_fn(
            name,
            |this: &mut GuestExpectation, type_name: Dynamic| -> GuestResult<GuestExpectation> {
                let type_name = this.host(&type_name)?.to_js_string().to_lowercase();
                Ok(this.record(|inner| inner.a(&type_name)))
            },
        );
    }

    engine.register_fn(
        "within",
        |this: &mut GuestExpectation, start: Dynamic, finish: Dynamic| -> GuestResult<GuestExpectation> {
            let start = this.host(&start)?;
            let finish = this.host(&finish)?;
            Ok(this.record(|inner| inner.within(&start, &finish)))
        },
    );

    for name in ["include", "includes", "contain", "contains"] {
        let verb = name.to_string();
        engine.register_fn(
            name,
            move |this: &mut GuestExpectation, needle: Dynamic| -> GuestResult<GuestExpectation> {
                let needle = this.host(&needle)?;
                Ok(this.record(|inner| inner.include(&verb, &needle)))
            },
        );
    }

    for name in ["length", "lengthOf"] {
        let verb = name.to_string();
        engine.register_fn(
            name,
            move |this: &mut GuestExpectation, expected: Dynamic| -> GuestResult<GuestExpectation> {
                let expected = this.host(&expected)?;
                Ok(this.record(|inner| inner.length(&verb, &expected)))
            },
        );
    }

    engine.register_fn(
        "property",
        |this: &mut GuestExpectation, name: Dynamic| -> GuestResult<GuestExpectation> {
            let name = this.host(&name)?.to_js_string();
            Ok(this.record(|inner| inner.property(&name, None)))
        },
    );
    engine.register_fn(
        "property",
        |this: &mut GuestExpectation, name: Dynamic, value: Dynamic| -> GuestResult<GuestExpectation> {
            let name = this.host(&name)?.to_js_string();
            let value = this.host(&value)?;
            Ok(this.record(|inner| inner.property(&name, Some(&value))))
        },
    );
    engine.register_fn(
        "ownProperty",
        |this: &mut GuestExpectation, name: Dynamic| -> GuestResult<GuestExpectation> {
            let name = this.host(&name)?.to_js_string();
            Ok(this.record(|inner| inner.own_property(&name, None)))
        },
    );
    engine.register_fn(
        "ownProperty",
        |this: &mut GuestExpectation, name: Dynamic, value: Dynamic| -> GuestResult<GuestExpectation> {
            let name = this.host(&name)?.to_js_string();
            let value = this.host(&value)?;
            Ok(this.record(|inner| inner.own_property(&name, Some(&value))))
        },
    );

    for name in ["keys", "key"] {
        engine.register_fn(
            name,
            |this: &mut GuestExpectation, a: Dynamic| -> GuestResult<GuestExpectation> {
                let keys = key_list(this, &[a])?;
                Ok(this.record(|inner| inner.keys(&keys)))
            },
        );
        engine.register_fn(
            name,
            |this: &mut GuestExpectation, a: Dynamic, b: Dynamic| -> GuestResult<GuestExpectation> {
                let keys = key_list(this, &[a, b])?;
                Ok(this.record(|inner| inner.keys(&keys)))
            },
        );
        engine.register_fn(
            name,
            |this: &mut GuestExpectation,
             a: Dynamic,
             b: Dynamic,
             c: Dynamic|
             -> GuestResult<GuestExpectation> {
                let keys = key_list(this, &[a, b, c])?;
                Ok(this.record(|inner| inner.keys(&keys)))
            },
        );
        engine.register_fn(
            name,
            |this: &mut GuestExpectation,
             a: Dynamic,
             b: Dynamic,
             c: Dynamic,
             d: Dynamic|
             -> GuestResult<GuestExpectation> {
                let keys = key_list(this, &[a, b, c, d])?;
                Ok(this.record(|inner| inner.keys(&keys)))
            },
        );
    }

    for name in ["throws", "Throw"] {
        engine.register_fn(
            name,
            |ctx: NativeCallContext, this: &mut GuestExpectation| -> GuestResult<GuestExpectation> {
                let outcome = this.throw_outcome(&ctx)?;
                Ok(this.record(|inner| inner.throws(outcome.as_ref(), None, None)))
            },
        );
        engine.register_fn(
            name,
            |ctx: NativeCallContext,
             this: &mut GuestExpectation,
             error_like: Dynamic|
             -> GuestResult<GuestExpectation> {
                let error_like = this.host(&error_like)?;
                let outcome = this.throw_outcome(&ctx)?;
                Ok(this.record(|inner| inner.throws(outcome.as_ref(), Some(&error_like), None)))
            },
        );
        engine.register_fn(
            name,
            |ctx: NativeCallContext,
             this: &mut GuestExpectation,
             error_like: Dynamic,
             message: Dynamic|
             -> GuestResult<GuestExpectation> {
                let error_like = this.host(&error_like)?;
                let message = this.host(&message)?;
                let outcome = this.throw_outcome(&ctx)?;
                Ok(this.record(|inner| {
                    inner.throws(outcome.as_ref(), Some(&error_like), Some(&message))
                }))
            },
        );
    }

    engine.register_fn(
        "satisfy",
        |ctx: NativeCallContext,
         this: &mut GuestExpectation,
         matcher: Dynamic|
         -> GuestResult<GuestExpectation> {
            let outcome = this.satisfy_outcome(&ctx, &matcher)?;
            Ok(this.record(|inner| inner.satisfy(&outcome)))
        },
    );
}

/// Registers the `Expectation` type and every matcher on `engine`.
pub fn register_expectation_api(engine: &mut Engine) {
    engine.register_type_with_name::<GuestExpectation>("Expectation");
    register_legacy(engine);
    register_chains(engine);
    register_chai_methods(engine);
}

/// `expect(value)`, recording into the tracker exposed by `tracker_id`.
pub struct ExpectModule {
    id: &'static str,
    tracker_id: &'static str,
}

impl ExpectModule {
    pub fn new(id: &'static str, tracker_id: &'static str) -> Self {
        Self { id, tracker_id }
    }
}

impl CapabilityModule for ExpectModule {
    fn id(&self) -> &'static str {
        self.id
    }

    fn mount(&self) -> MountLocation {
        MountLocation::MergeIntoRoot
    }

    fn create(
        &mut self,
        session: &mut Session,
        ctx: &mut InitContext,
    ) -> Result<Handle, ExecutionError> {
        let tracker = ctx.use_tracker(self.tracker_id)?;
        let max_depth = session.max_marshal_depth();
        register_expectation_api(session.engine_mut());

        let mut object = Map::new();
        insert_fn(&mut object, "expect", move |_, args| {
            let expectation = GuestExpectation::new(arg(args, 0), Rc::clone(&tracker), max_depth)?;
            Ok(Dynamic::from(expectation))
        })?;
        Ok(session.alloc(Dynamic::from_map(object)))
    }
}
