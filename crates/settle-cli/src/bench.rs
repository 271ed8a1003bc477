// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `settle bench`: a sequential upload pipeline over callback-style
//! operations.
//!
//! Each pipeline creates a blob, writes it, looks up the target file, opens
//! a transaction, inserts a row and commits. Every step is a fake async
//! operation that calls back from a later queue task; the adapter turns it
//! into a deferred and each step forwards to the next one.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use settle_core::{
    action, adapt, is_fulfilled, is_rejected, Deferred, Engine, FnTask, Function, FutureLike,
    MicrotaskQueue, Object, QueueConfig, TaskQueue, UnhandledRejections, Value,
};
use tracing::{debug, info};

/// Upper bound on queue slots reserved before a run; the queue grows past
/// it on demand.
const MAX_QUEUE_RESERVE: usize = 1 << 16;

#[derive(Debug, Clone)]
pub struct BenchReport {
    pub iterations: usize,
    pub fulfilled: usize,
    pub rejected: usize,
    pub tasks_run: u64,
    pub elapsed: Duration,
}

/// Callback-style operation completing from the queue with `(null, result)`.
/// The callback is the last argument.
fn fake_op(queue: &Rc<MicrotaskQueue>, name: &str, result: impl Fn(&[Value]) -> Value + 'static) -> Function {
    let queue = queue.clone();
    let name = name.to_string();
    Function::new(name.clone(), move |_, args| {
        let (cb, rest) = args
            .split_last()
            .ok_or_else(|| Value::type_error("missing callback"))?;
        let cb = cb
            .as_function()
            .cloned()
            .ok_or_else(|| Value::type_error("callback is not a function"))?;
        let value = result(rest);
        let op = name.clone();
        queue.enqueue(Box::new(FnTask(move || {
            if let Err(thrown) = cb.call(&Value::Undefined, &[Value::Null, value]) {
                debug!(op = %op, reason = %thrown, "completion callback threw");
            }
        })));
        Ok(Value::Undefined)
    })
}

struct Ops {
    create_blob: Function,
    put: Function,
    find_file: Function,
    begin: Function,
    insert: Function,
    commit: Function,
}

impl Ops {
    fn new(queue: &Rc<MicrotaskQueue>) -> Self {
        Ops {
            create_blob: fake_op(queue, "create_blob", |_| {
                Value::Object(Object::new().with("id", Value::str("blob")))
            }),
            put: fake_op(queue, "put", |_| Value::Null),
            // Even ids already have a file; odd ids get a new one.
            find_file: fake_op(queue, "find_file", |args| match args.first().and_then(Value::as_int) {
                Some(id) if id % 2 == 0 => Value::Int(id),
                _ => Value::Null,
            }),
            begin: fake_op(queue, "begin", |_| Value::Object(Object::new())),
            insert: fake_op(queue, "insert", |_| Value::Null),
            commit: fake_op(queue, "commit", |args| args.first().cloned().unwrap_or(Value::Undefined)),
        }
    }
}

/// Deferred that forwards to `step(value)` once `prev` fulfills, or
/// rejects with `prev`'s reason.
fn then<F>(engine: &Engine, prev: &Deferred, step: F) -> Deferred
where
    F: FnOnce(&Value) -> Deferred + 'static,
{
    let next = engine.deferred();
    let (ok, err) = (next.clone(), next.clone());
    prev.when(action(
        move |v| ok.resolve(Value::Future(step(v).into())),
        move |r| {
            err.reject(r.clone());
            true
        },
    ));
    next
}

fn upload(engine: &Engine, ops: &Rc<Ops>, id: i64) -> Deferred {
    let blob = adapt(
        &ops.create_blob,
        &Value::Null,
        vec![Value::str("account")],
        engine.deferred(),
    );

    let (e, o) = (engine.clone(), ops.clone());
    let stored = then(engine, &blob, move |_| {
        adapt(&o.put, &Value::Null, vec![Value::str("stream")], e.deferred())
    });

    let (e, o) = (engine.clone(), ops.clone());
    let file = then(engine, &stored, move |_| {
        adapt(&o.find_file, &Value::Null, vec![Value::Int(id)], e.deferred())
    });

    let (e, o) = (engine.clone(), ops.clone());
    let found = Rc::new(Cell::new(false));
    let seen = found.clone();
    let tx = then(engine, &file, move |f| {
        seen.set(!matches!(f, Value::Null));
        adapt(&o.begin, &Value::Null, Vec::new(), e.deferred())
    });

    let (e, o) = (engine.clone(), ops.clone());
    let inserted = then(engine, &tx, move |_| {
        let row = if found.get() { "version" } else { "file" };
        adapt(&o.insert, &Value::Null, vec![Value::str(row)], e.deferred())
    });

    let (e, o) = (engine.clone(), ops.clone());
    then(engine, &inserted, move |_| {
        adapt(&o.commit, &Value::Null, vec![Value::Int(id)], e.deferred())
    })
}

/// Queue slots reserved up front for `iterations` pipelines.
fn queue_reserve(iterations: usize) -> usize {
    iterations.saturating_mul(4).clamp(64, MAX_QUEUE_RESERVE)
}

pub fn run(iterations: usize) -> BenchReport {
    let queue = Rc::new(MicrotaskQueue::with_config(QueueConfig {
        initial_capacity: queue_reserve(iterations),
        drain_limit: None,
    }));
    let tracker = Rc::new(UnhandledRejections::new());
    let engine = Engine::builder(queue.clone()).tracker(tracker.clone()).build();
    let ops = Rc::new(Ops::new(&queue));

    info!(iterations, "starting upload pipelines");
    let start = Instant::now();
    let uploads: Vec<Deferred> = (0..iterations as i64)
        .map(|id| upload(&engine, &ops, id))
        .collect();
    let tasks_run = queue.drain() as u64;
    let elapsed = start.elapsed();

    let fulfilled = uploads.iter().filter(|d| is_fulfilled(*d)).count();
    let rejected = uploads.iter().filter(|d| is_rejected(*d)).count();
    debug!(fulfilled, rejected, tasks_run, "pipelines drained");
    tracker.report();

    BenchReport {
        iterations,
        fulfilled,
        rejected,
        tasks_run,
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settle_core::get_value;

    #[test]
    fn every_pipeline_completes() {
        let report = run(25);
        assert_eq!(report.iterations, 25);
        assert_eq!(report.fulfilled, 25);
        assert_eq!(report.rejected, 0);
        assert!(report.tasks_run > 0);
    }

    #[test]
    fn pipeline_yields_its_id() {
        let queue = Rc::new(MicrotaskQueue::new());
        let engine = Engine::new(queue.clone());
        let ops = Rc::new(Ops::new(&queue));
        let d = upload(&engine, &ops, 7);
        assert!(!d.state().is_settled());
        queue.drain();
        assert_eq!(get_value(&d), Ok(Value::Int(7)));
    }

    #[test]
    fn rejection_skips_remaining_steps() {
        let queue = Rc::new(MicrotaskQueue::new());
        let engine = Engine::new(queue.clone());
        let first = engine.deferred();
        let reached = Rc::new(Cell::new(false));
        let r = reached.clone();
        let e = engine.clone();
        let last = then(&engine, &first, move |_| {
            r.set(true);
            e.deferred()
        });
        first.reject(Value::error("disk full"));
        queue.drain();
        assert!(!reached.get());
        assert!(is_rejected(&last));
    }

    #[test]
    fn queue_reservation_is_bounded() {
        assert_eq!(queue_reserve(0), 64);
        assert_eq!(queue_reserve(100), 400);
        assert_eq!(queue_reserve(usize::MAX), MAX_QUEUE_RESERVE);
    }

    #[test]
    fn throwing_completion_callback_is_contained() {
        let queue = Rc::new(MicrotaskQueue::new());
        let op = fake_op(&queue, "op", |_| Value::Int(1));
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let cb = Function::new("cb", move |_, _| {
            c.set(c.get() + 1);
            Err(Value::error("callback failed"))
        });
        assert_eq!(op.call(&Value::Undefined, &[Value::Function(cb)]), Ok(Value::Undefined));
        assert_eq!(queue.drain(), 1);
        assert_eq!(calls.get(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn zero_iterations_is_empty() {
        let report = run(0);
        assert_eq!(report.fulfilled, 0);
        assert_eq!(report.tasks_run, 0);
    }
}
