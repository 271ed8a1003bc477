// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Behavioral scenarios run by `settle demo`.
//!
//! Each scenario gets a fresh queue, tracker and engine, drives the engine
//! through one property and reports the first mismatch it sees.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use settle_core::{
    action, adapt, get_reason, get_value, is_pending, is_rejected, Action, Engine, ErrorKind,
    Function, FutureLike, MicrotaskQueue, Object, State, UnhandledRejections, Value,
};
use tracing::debug;

pub struct Env {
    pub queue: Rc<MicrotaskQueue>,
    pub tracker: Rc<UnhandledRejections>,
    pub engine: Engine,
}

impl Env {
    pub fn new() -> Self {
        let queue = Rc::new(MicrotaskQueue::new());
        let tracker = Rc::new(UnhandledRejections::new());
        let engine = Engine::builder(queue.clone()).tracker(tracker.clone()).build();
        Env {
            queue,
            tracker,
            engine,
        }
    }
}

pub type Outcome = Result<(), String>;

pub struct Scenario {
    pub name: &'static str,
    pub run: fn(&Env) -> Outcome,
}

pub fn all() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "settle-once",
            run: settle_once,
        },
        Scenario {
            name: "asynchronous registration",
            run: asynchronous_registration,
        },
        Scenario {
            name: "registration ordering",
            run: registration_ordering,
        },
        Scenario {
            name: "cycle resolution",
            run: cycle_resolution,
        },
        Scenario {
            name: "thenable assimilation",
            run: thenable_assimilation,
        },
        Scenario {
            name: "thenable fault",
            run: thenable_fault,
        },
        Scenario {
            name: "non-thenable passthrough",
            run: non_thenable_passthrough,
        },
        Scenario {
            name: "never",
            run: never,
        },
        Scenario {
            name: "callback adapter",
            run: callback_adapter,
        },
        Scenario {
            name: "unhandled rejection tracking",
            run: rejection_tracking,
        },
    ]
}

pub struct Report {
    pub name: &'static str,
    pub outcome: Outcome,
}

pub fn run_all() -> Vec<Report> {
    all()
        .into_iter()
        .map(|scenario| {
            let env = Env::new();
            let outcome = (scenario.run)(&env);
            debug!(scenario = scenario.name, ok = outcome.is_ok(), tasks = env.queue.total_run(), "scenario done");
            Report {
                name: scenario.name,
                outcome,
            }
        })
        .collect()
}

fn ensure(cond: bool, msg: impl FnOnce() -> String) -> Outcome {
    if cond {
        Ok(())
    } else {
        Err(msg())
    }
}

fn expect_eq<T: PartialEq + std::fmt::Debug>(what: &str, got: T, want: T) -> Outcome {
    ensure(got == want, || format!("{}: got {:?}, want {:?}", what, got, want))
}

/// Records deliveries as `tag:value` / `tag:!reason` and acknowledges
/// rejections.
fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> Box<dyn Action> {
    let (ok, err) = (log.clone(), log.clone());
    action(
        move |v| ok.borrow_mut().push(format!("{}:{}", tag, v)),
        move |r| {
            err.borrow_mut().push(format!("{}:!{}", tag, r));
            true
        },
    )
}

fn thenable<F>(body: F) -> Value
where
    F: Fn(&Function, &Function) -> Result<Value, Value> + 'static,
{
    Value::Object(Object::new().with(
        "then",
        Function::new("then", move |_, args| {
            let resolve = args.first().and_then(Value::as_function).cloned();
            let reject = args.get(1).and_then(Value::as_function).cloned();
            match (resolve, reject) {
                (Some(resolve), Some(reject)) => body(&resolve, &reject),
                _ => Err(Value::type_error("then called without callbacks")),
            }
        }),
    ))
}

fn settle_once(env: &Env) -> Outcome {
    let d = env.engine.deferred();
    d.fulfill(Value::Int(1));
    d.reject(Value::error("late"));
    d.resolve(Value::Int(3));
    env.queue.drain();
    expect_eq("state", d.state(), State::Fulfilled(Value::Int(1)))?;

    let d = env.engine.deferred();
    d.reject(Value::Int(0));
    d.fulfill(Value::Int(1));
    env.queue.drain();
    ensure(is_rejected(&d), || "first reject did not stick".to_string())
}

fn asynchronous_registration(env: &Env) -> Outcome {
    let log = Rc::new(RefCell::new(Vec::new()));
    let d = env.engine.deferred();
    d.fulfill(Value::Int(7));
    d.when(recorder(&log, "a"));
    ensure(log.borrow().is_empty(), || "continuation ran inline".to_string())?;
    env.queue.drain();
    let got = log.borrow().clone();
    expect_eq("log", got, vec!["a:7".to_string()])
}

fn registration_ordering(env: &Env) -> Outcome {
    let log = Rc::new(RefCell::new(Vec::new()));
    let d = env.engine.deferred();
    d.when(recorder(&log, "A"));
    d.when(recorder(&log, "B"));
    d.fulfill(Value::str("x"));
    env.queue.drain();
    let got = log.borrow().clone();
    expect_eq(
        "log",
        got,
        vec!["A:x".to_string(), "B:x".to_string()],
    )
}

fn cycle_resolution(env: &Env) -> Outcome {
    let d = env.engine.deferred();
    d.resolve(Value::Future(d.clone().into()));
    env.queue.drain();
    let reason = get_reason(&d).map_err(|e| e.to_string())?;
    let kind = reason.as_error().map(|e| e.kind);
    expect_eq("reason kind", kind, Some(ErrorKind::TypeError))?;
    let first = d.join();
    ensure(d.join().ptr_eq(&first), || {
        "repeated joins returned different rejections".to_string()
    })
}

fn thenable_assimilation(env: &Env) -> Outcome {
    let d = env.engine.deferred();
    d.resolve(thenable(|resolve, _| {
        resolve.call(&Value::Undefined, &[Value::Int(5)])
    }));
    ensure(is_pending(&d), || "thenable was called synchronously".to_string())?;
    env.queue.drain();
    expect_eq("value", get_value(&d), Ok(Value::Int(5)))
}

fn thenable_fault(env: &Env) -> Outcome {
    let d = env.engine.deferred();
    d.resolve(thenable(|_, _| Err(Value::error("x"))));
    env.queue.drain();
    expect_eq("reason", get_reason(&d), Ok(Value::error("x")))
}

fn non_thenable_passthrough(env: &Env) -> Outcome {
    let obj = Object::new().with("then", Value::Int(42));
    let d = env.engine.deferred();
    d.resolve(Value::Object(obj.clone()));
    env.queue.drain();
    match get_value(&d) {
        Ok(Value::Object(got)) if got.ptr_eq(&obj) => Ok(()),
        other => Err(format!("expected the same object back, got {:?}", other)),
    }
}

fn never(env: &Env) -> Outcome {
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    let never = env.engine.never();
    never.when(action(move |_| flag.set(true), |_| false));
    env.queue.drain();
    ensure(!ran.get(), || "never delivered a settlement".to_string())?;
    expect_eq("state", never.state(), State::Pending)
}

fn callback_adapter(env: &Env) -> Outcome {
    let add = Function::new("add", |_, args| {
        let a = args.first().and_then(Value::as_int).unwrap_or(0);
        let b = args.get(1).and_then(Value::as_int).unwrap_or(0);
        let cb = args
            .get(2)
            .and_then(Value::as_function)
            .cloned()
            .ok_or_else(|| Value::type_error("missing callback"))?;
        cb.call(&Value::Undefined, &[Value::Null, Value::Int(a + b)])
    });
    let d = adapt(
        &add,
        &Value::Null,
        vec![Value::Int(1), Value::Int(2)],
        env.engine.deferred(),
    );
    env.queue.drain();
    expect_eq("value", get_value(&d), Ok(Value::Int(3)))
}

fn rejection_tracking(env: &Env) -> Outcome {
    let r = env.engine.rejected(Value::error("lost"));
    env.queue.drain();
    expect_eq("tracked", env.tracker.tracked_count(), 1)?;
    ensure(!r.is_handled(), || "handled before any continuation".to_string())?;
    r.when(action(|_| {}, |_| true));
    env.queue.drain();
    ensure(r.is_handled(), || "acknowledging continuation did not mark handled".to_string())?;
    expect_eq("tracked", env.tracker.tracked_count(), 1)
}
