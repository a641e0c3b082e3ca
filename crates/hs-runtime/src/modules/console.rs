use std::cell::RefCell;
use std::rc::Rc;

use hs_core::{ConsoleEntry, ConsoleLevel, ExecutionError, Report};
use rhai::{Dynamic, Map};

use super::{insert_fn, rest_args};
use crate::marshal::to_host_lossy;
use crate::module::{CapabilityModule, InitContext, MountLocation};
use crate::session::{Handle, Session};

const LEVELS: [(&str, ConsoleLevel); 4] = [
    ("log", ConsoleLevel::Log),
    ("info", ConsoleLevel::Info),
    ("warn", ConsoleLevel::Warn),
    ("error", ConsoleLevel::Error),
];

/// Global `console`. Shares its buffer with `print` and `debug`.
#[derive(Default)]
pub struct ConsoleModule {
    buffer: Option<Rc<RefCell<Vec<ConsoleEntry>>>>,
}

impl ConsoleModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn fold(&self, mut report: Report) -> Report {
        if let Some(buffer) = &self.buffer {
            report.consoles = buffer.borrow_mut().drain(..).collect();
        }
        report
    }
}

impl CapabilityModule for ConsoleModule {
    fn id(&self) -> &'static str {
        "console"
    }

    fn mount(&self) -> MountLocation {
        MountLocation::MergeIntoRoot
    }

    fn create(
        &mut self,
        session: &mut Session,
        _ctx: &mut InitContext,
    ) -> Result<Handle, ExecutionError> {
        let buffer = session.console_buffer();
        self.buffer = Some(Rc::clone(&buffer));
        let max_depth = session.max_marshal_depth();

        let mut console = Map::new();
        for (name, level) in LEVELS {
            let buffer = Rc::clone(&buffer);
            insert_fn(&mut console, name, move |ctx, args| {
                let data = rest_args(args)
                    .iter()
                    .map(|value| to_host_lossy(value, max_depth))
                    .collect();
                buffer.borrow_mut().push(ConsoleEntry {
                    line_number: ctx.call_position().line().unwrap_or_default(),
                    data,
                    level,
                });
                Ok(Dynamic::UNIT)
            })?;
        }

        let mut object = Map::new();
        object.insert("console".into(), Dynamic::from_map(console));
        Ok(session.alloc(Dynamic::from_map(object)))
    }

    fn on_pre_request_complete(&mut self, report: Report) -> Report {
        self.fold(report)
    }

    fn on_test_complete(&mut self, report: Report) -> Report {
        self.fold(report)
    }
}
