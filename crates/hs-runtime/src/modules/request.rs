use std::cell::RefCell;
use std::rc::Rc;

use hs_core::{ExecutionError, Report, RequestEntry, RequestSnapshot, SandboxValue};
use rhai::{Dynamic, Engine, EvalAltResult};

use super::optional_string;
use crate::marshal::{guest_error, to_guest, to_host};
use crate::module::{CapabilityModule, InitContext, MountLocation};
use crate::session::{Handle, Session};

type GuestResult<T> = Result<T, Box<EvalAltResult>>;

/// `hopp.request`. Clones share one snapshot, so every read sees the latest
/// edit.
#[derive(Clone)]
pub struct GuestRequest {
    state: Rc<RefCell<RequestSnapshot>>,
    max_depth: usize,
}

/// `hopp.request.variables`.
#[derive(Clone)]
pub struct GuestRequestVariables {
    state: Rc<RefCell<RequestSnapshot>>,
}

impl GuestRequest {
    fn host(&self, value: &Dynamic) -> GuestResult<SandboxValue> {
        to_host(value, self.max_depth).map_err(|error| guest_error(error.to_string()))
    }

    fn edit(&self, change: impl FnOnce(&mut RequestSnapshot)) {
        change(&mut self.state.borrow_mut());
    }

    fn object_arg(&self, value: &Dynamic, what: &str) -> GuestResult<SandboxValue> {
        let value = self.host(value)?;
        if value.as_object().is_none() {
            return Err(guest_error(format!("Expected {} to be an object", what)));
        }
        Ok(value)
    }

    fn entries_arg(&self, value: &Dynamic, what: &str) -> GuestResult<Vec<RequestEntry>> {
        RequestSnapshot::entries_from_value(&self.host(value)?).ok_or_else(|| {
            guest_error(format!(
                "Expected {} to be an array of {{ key, value }} objects",
                what
            ))
        })
    }
}

fn text(value: Dynamic, what: &str) -> GuestResult<String> {
    value
        .into_string()
        .map_err(|_| guest_error(format!("Expected {} to be a string", what)))
}

fn guest(value: &SandboxValue) -> GuestResult<Dynamic> {
    to_guest(value).map_err(|error| guest_error(error.to_string()))
}

fn register_reads(engine: &mut Engine) {
    engine.register_type_with_name::<GuestRequest>("Request");
    engine.register_type_with_name::<GuestRequestVariables>("RequestVariables");

    engine.register_get("url", |this: &mut GuestRequest| this.state.borrow().url.clone());
    engine.register_get("method", |this: &mut GuestRequest| {
        this.state.borrow().method.clone()
    });
    engine.register_get("headers", |this: &mut GuestRequest| -> GuestResult<Dynamic> {
        guest(&RequestSnapshot::entries_value(&this.state.borrow().headers))
    });
    engine.register_get("params", |this: &mut GuestRequest| -> GuestResult<Dynamic> {
        guest(&RequestSnapshot::entries_value(&this.state.borrow().params))
    });
    engine.register_get("body", |this: &mut GuestRequest| -> GuestResult<Dynamic> {
        guest(&this.state.borrow().body)
    });
    engine.register_get("auth", |this: &mut GuestRequest| -> GuestResult<Dynamic> {
        guest(&this.state.borrow().auth)
    });
    engine.register_get("variables", |this: &mut GuestRequest| GuestRequestVariables {
        state: Rc::clone(&this.state),
    });
    engine.register_fn(
        "get",
        |this: &mut GuestRequestVariables, key: Dynamic| -> GuestResult<Dynamic> {
            let key = text(key, "key")?;
            Ok(optional_string(this.state.borrow().variable(&key)))
        },
    );
}

fn register_edits(engine: &mut Engine) {
    engine.register_fn("setUrl", |this: &mut GuestRequest, url: Dynamic| -> GuestResult<()> {
        let url = text(url, "url")?;
        this.edit(|request| request.url = url);
        Ok(())
    });
    engine.register_fn(
        "setMethod",
        |this: &mut GuestRequest, method: Dynamic| -> GuestResult<()> {
            let method = text(method, "method")?;
            this.edit(|request| request.method = method);
            Ok(())
        },
    );
    engine.register_fn(
        "setHeader",
        |this: &mut GuestRequest, key: Dynamic, value: Dynamic| -> GuestResult<()> {
            let key = text(key, "header name")?;
            let value = text(value, "header value")?;
            this.edit(|request| request.set_header(&key, &value));
            Ok(())
        },
    );
    engine.register_fn(
        "setHeaders",
        |this: &mut GuestRequest, headers: Dynamic| -> GuestResult<()> {
            let headers = this.entries_arg(&headers, "headers")?;
            this.edit(|request| request.headers = headers);
            Ok(())
        },
    );
    engine.register_fn(
        "removeHeader",
        |this: &mut GuestRequest, key: Dynamic| -> GuestResult<()> {
            let key = text(key, "header name")?;
            this.edit(|request| request.remove_header(&key));
            Ok(())
        },
    );
    engine.register_fn(
        "setParam",
        |this: &mut GuestRequest, key: Dynamic, value: Dynamic| -> GuestResult<()> {
            let key = text(key, "param name")?;
            let value = text(value, "param value")?;
            this.edit(|request| request.set_param(&key, &value));
            Ok(())
        },
    );
    engine.register_fn(
        "setParams",
        |this: &mut GuestRequest, params: Dynamic| -> GuestResult<()> {
            let params = this.entries_arg(&params, "params")?;
            this.edit(|request| request.params = params);
            Ok(())
        },
    );
    engine.register_fn(
        "removeParam",
        |this: &mut GuestRequest, key: Dynamic| -> GuestResult<()> {
            let key = text(key, "param name")?;
            this.edit(|request| request.remove_param(&key));
            Ok(())
        },
    );
    engine.register_fn("setBody", |this: &mut GuestRequest, body: Dynamic| -> GuestResult<()> {
        let body = this.object_arg(&body, "body")?;
        this.edit(|request| request.body = body);
        Ok(())
    });
    engine.register_fn("setAuth", |this: &mut GuestRequest, auth: Dynamic| -> GuestResult<()> {
        let auth = this.object_arg(&auth, "auth")?;
        this.edit(|request| request.auth = auth);
        Ok(())
    });
    engine.register_fn(
        "set",
        |this: &mut GuestRequestVariables, key: Dynamic, value: Dynamic| -> GuestResult<()> {
            let key = text(key, "key")?;
            let value = text(value, "value")?;
            this.state.borrow_mut().set_variable(&key, &value);
            Ok(())
        },
    );
}

/// `hopp.request`: read-only getters everywhere, setters only in
/// pre-request scripts.
pub struct RequestModule {
    editable: bool,
    state: Option<Rc<RefCell<RequestSnapshot>>>,
}

impl RequestModule {
    pub fn editable() -> Self {
        Self {
            editable: true,
            state: None,
        }
    }

    pub fn read_only() -> Self {
        Self {
            editable: false,
            state: None,
        }
    }
}

impl CapabilityModule for RequestModule {
    fn id(&self) -> &'static str {
        "hopp.request"
    }

    fn mount(&self) -> MountLocation {
        MountLocation::Namespaced("request")
    }

    fn create(
        &mut self,
        session: &mut Session,
        ctx: &mut InitContext,
    ) -> Result<Handle, ExecutionError> {
        let state = Rc::new(RefCell::new(ctx.request.clone().unwrap_or_default()));
        self.state = Some(Rc::clone(&state));

        let max_depth = session.max_marshal_depth();
        let engine = session.engine_mut();
        register_reads(engine);
        if self.editable {
            register_edits(engine);
        }
        Ok(session.alloc(Dynamic::from(GuestRequest { state, max_depth })))
    }

    fn on_pre_request_complete(&mut self, mut report: Report) -> Report {
        if let Some(state) = self.state.as_ref().filter(|_| self.editable) {
            report.request = Some(state.borrow().clone());
        }
        report
    }
}
