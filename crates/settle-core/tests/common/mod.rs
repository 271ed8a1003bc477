// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use settle_core::{action, Action, Engine, Function, MicrotaskQueue, Object, UnhandledRejections, Value};

static INIT_LOGGING: Once = Once::new();

/// Trace-level logging into the test harness. First call wins.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_ansi(false)
            .try_init();
    });
}

pub struct Harness {
    pub queue: Rc<MicrotaskQueue>,
    pub tracker: Rc<UnhandledRejections>,
    pub engine: Engine,
}

pub fn harness() -> Harness {
    init_test_logging();
    let queue = Rc::new(MicrotaskQueue::new());
    let tracker = Rc::new(UnhandledRejections::new());
    let engine = Engine::builder(queue.clone()).tracker(tracker.clone()).build();
    Harness {
        queue,
        tracker,
        engine,
    }
}

/// Ordered record of delivered settlements.
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Records `tag:value` or `tag:!reason` and acknowledges rejections.
    pub fn action(&self, tag: &str) -> Box<dyn Action> {
        let (ok, err) = (self.clone(), self.clone());
        let (t1, t2) = (tag.to_string(), tag.to_string());
        action(
            move |v| ok.0.borrow_mut().push(format!("{}:{}", t1, v)),
            move |r| {
                err.0.borrow_mut().push(format!("{}:!{}", t2, r));
                true
            },
        )
    }
}

/// Object whose `then` runs `body(resolve, reject)`.
pub fn thenable<F>(body: F) -> Value
where
    F: Fn(&Function, &Function) -> Result<Value, Value> + 'static,
{
    Value::Object(Object::new().with(
        "then",
        Function::new("then", move |_, args| {
            let resolve = callback(args, 0)?;
            let reject = callback(args, 1)?;
            body(&resolve, &reject)
        }),
    ))
}

fn callback(args: &[Value], i: usize) -> Result<Function, Value> {
    args.get(i)
        .and_then(Value::as_function)
        .cloned()
        .ok_or_else(|| Value::type_error("missing callback"))
}

pub fn call(f: &Function, v: Value) -> Result<Value, Value> {
    f.call(&Value::Undefined, &[v])
}
