// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! End-to-end behavior of deferreds: settle-once, asynchrony, ordering,
//! cycles, thenable assimilation, `Never`, the callback adapter and
//! rejection tracking.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{call, harness, thenable, Log};
use settle_core::{
    adapt, get_reason, get_value, is_pending, is_rejected, Function, FutureLike, Handler, Object,
    SettleError, State, Value,
};

// ---------------------------------------------------------------------------
// Settle-once
// ---------------------------------------------------------------------------

#[test]
fn only_the_first_settlement_counts() {
    let h = harness();
    let sequences: Vec<Vec<&str>> = vec![
        vec!["fulfill", "reject", "resolve"],
        vec!["reject", "fulfill", "resolve"],
        vec!["resolve", "reject", "fulfill"],
    ];
    for seq in sequences {
        let d = h.engine.deferred();
        for (i, op) in seq.iter().enumerate() {
            let v = Value::Int(i as i64);
            match *op {
                "fulfill" => d.fulfill(v),
                "reject" => d.reject(v),
                _ => d.resolve(v),
            }
        }
        h.queue.drain();
        let expected = match seq[0] {
            "reject" => State::Rejected {
                reason: Value::Int(0),
                handled: false,
            },
            _ => State::Fulfilled(Value::Int(0)),
        };
        assert_eq!(d.state(), expected, "sequence {:?}", seq);
    }
}

#[test]
fn resolving_with_a_thenable_after_settling_never_calls_then() {
    let h = harness();
    let called = Rc::new(Cell::new(false));
    let probe = called.clone();
    let d = h.engine.deferred();
    d.fulfill(Value::Int(1));
    d.resolve(thenable(move |_, _| {
        probe.set(true);
        Ok(Value::Undefined)
    }));
    assert_eq!(h.queue.pending_count(), 0);
    h.queue.drain();
    assert!(!called.get());
    assert_eq!(get_value(&d), Ok(Value::Int(1)));
}

// ---------------------------------------------------------------------------
// Asynchrony and ordering
// ---------------------------------------------------------------------------

#[test]
fn continuation_on_fulfilled_future_runs_later() {
    let h = harness();
    let log = Log::new();
    let d = h.engine.deferred();
    d.fulfill(Value::Int(7));
    d.when(log.action("a"));
    assert!(log.is_empty());
    h.queue.drain();
    assert_eq!(log.entries(), vec!["a:7"]);
}

#[test]
fn continuations_run_in_registration_order() {
    let h = harness();
    let log = Log::new();
    let d = h.engine.deferred();
    d.when(log.action("A"));
    d.when(log.action("B"));
    d.fulfill(Value::str("x"));
    assert!(log.is_empty());
    h.queue.drain();
    assert_eq!(log.entries(), vec!["A:x", "B:x"]);
}

#[test]
fn continuations_on_different_futures_follow_queue_order() {
    let h = harness();
    let log = Log::new();
    let (a, b) = (h.engine.deferred(), h.engine.deferred());
    a.when(log.action("a"));
    b.when(log.action("b"));
    b.fulfill(Value::Int(2));
    a.fulfill(Value::Int(1));
    h.queue.drain();
    assert_eq!(log.entries(), vec!["b:2", "a:1"]);
}

#[test]
fn long_forwarding_chain_reaches_the_end() {
    let h = harness();
    let log = Log::new();
    let first = h.engine.deferred();
    let mut last = first.clone();
    for _ in 0..100_000 {
        let next = h.engine.deferred();
        last.resolve(Value::Future(next.clone().into()));
        last = next;
    }
    first.when(log.action("end"));
    last.fulfill(Value::Int(42));
    h.queue.drain();
    assert_eq!(log.entries(), vec!["end:42"]);
}

#[test]
fn long_forwarding_chain_drops_cleanly() {
    let h = harness();
    let first = h.engine.deferred();
    let mut last = first.clone();
    for _ in 0..100_000 {
        let next = h.engine.deferred();
        last.resolve(Value::Future(next.clone().into()));
        last = next;
    }
    drop(last);
    drop(first);
    assert!(h.queue.is_empty());
}

// ---------------------------------------------------------------------------
// Cycles
// ---------------------------------------------------------------------------

#[test]
fn self_resolution_rejects_with_cycle_error() {
    let h = harness();
    let log = Log::new();
    let d = h.engine.deferred();
    d.when(log.action("c"));
    d.resolve(Value::Future(d.clone().into()));
    h.queue.drain();

    assert!(is_rejected(&d));
    let reason = get_reason(&d).unwrap();
    let err = reason.as_error().expect("cycle reason is an error value");
    assert_eq!(err.kind, settle_core::ErrorKind::TypeError);
    assert_eq!(err.message, "resolution cycle");
    assert_eq!(log.entries(), vec!["c:!TypeError: resolution cycle"]);
}

#[test]
fn repeated_joins_return_the_same_cycle_rejection() {
    let h = harness();
    let d = h.engine.deferred();
    d.resolve(Value::Future(d.clone().into()));
    let first = d.join();
    for _ in 0..3 {
        assert!(d.join().ptr_eq(&first));
    }
    assert_eq!(h.tracker.tracked_count(), 1);
}

#[test]
fn mutual_resolution_collapses_to_a_self_cycle() {
    let h = harness();
    let (a, b) = (h.engine.deferred(), h.engine.deferred());
    a.resolve(Value::Future(b.clone().into()));
    b.resolve(Value::Future(a.clone().into()));
    assert!(is_rejected(&b));
    assert!(is_rejected(&a));
    assert!(a.join().ptr_eq(&b.join()));
}

// ---------------------------------------------------------------------------
// Thenables
// ---------------------------------------------------------------------------

#[test]
fn thenable_fulfilling_with_five() {
    let h = harness();
    let d = h.engine.deferred();
    d.resolve(thenable(|res, _| call(res, Value::Int(5))));
    assert!(is_pending(&d));
    h.queue.drain();
    assert_eq!(get_value(&d), Ok(Value::Int(5)));
}

#[test]
fn thenable_whose_then_throws_rejects_with_the_thrown_error() {
    let h = harness();
    let d = h.engine.deferred();
    d.resolve(thenable(|_, _| Err(Value::error("x"))));
    assert!(is_pending(&d));
    h.queue.drain();
    assert_eq!(get_reason(&d), Ok(Value::error("x")));
}

#[test]
fn non_callable_then_fulfills_with_the_object_itself() {
    let h = harness();
    let obj = Object::new().with("then", Value::Int(42));
    let d = h.engine.deferred();
    d.resolve(Value::Object(obj.clone()));
    h.queue.drain();
    match get_value(&d).unwrap() {
        Value::Object(got) => assert!(got.ptr_eq(&obj)),
        other => panic!("expected the object back, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Never
// ---------------------------------------------------------------------------

#[test]
fn never_drops_continuations_forever() {
    let h = harness();
    let log = Log::new();
    let never = h.engine.never();
    never.when(log.action("n"));
    for _ in 0..10 {
        h.queue.drain();
    }
    assert!(log.is_empty());
    assert_eq!(never.state(), State::Pending);
}

#[test]
fn deferred_forwarded_to_never_stays_pending() {
    let h = harness();
    let log = Log::new();
    let d = h.engine.deferred();
    d.when(log.action("d"));
    d.resolve(Value::Future(h.engine.never()));
    h.queue.drain();
    assert!(d.is_resolved());
    assert!(is_pending(&d));
    assert!(log.is_empty());
    assert!(matches!(d.join(), Handler::Never(_)));
}

// ---------------------------------------------------------------------------
// Callback adapter
// ---------------------------------------------------------------------------

#[test]
fn adapter_fulfills_with_callback_value() {
    let h = harness();
    let add = Function::new("add", |_, args| {
        let (a, b) = (args[0].as_int().unwrap_or(0), args[1].as_int().unwrap_or(0));
        let cb = args[2].as_function().cloned().ok_or(Value::Undefined)?;
        cb.call(&Value::Undefined, &[Value::Null, Value::Int(a + b)])
    });
    let d = adapt(&add, &Value::Null, vec![Value::Int(1), Value::Int(2)], h.engine.deferred());
    assert_eq!(get_value(&d), Ok(Value::Int(3)));
}

// ---------------------------------------------------------------------------
// Unhandled rejections
// ---------------------------------------------------------------------------

#[test]
fn rejection_is_tracked_once_and_handled_by_an_acknowledging_continuation() {
    let h = harness();
    let log = Log::new();
    let r = h.engine.rejected(Value::error("lost"));
    h.queue.drain();
    assert_eq!(h.tracker.tracked_count(), 1);
    assert!(!r.is_handled());

    r.when(log.action("late"));
    h.queue.drain();
    assert!(r.is_handled());
    assert_eq!(h.tracker.tracked_count(), 1);
    assert!(h.tracker.unhandled().is_empty());
}

#[test]
fn accessor_misuse_is_reported() {
    let h = harness();
    let d = h.engine.deferred();
    assert_eq!(get_value(&d), Err(SettleError::NotFulfilled));
    d.fulfill(Value::Int(1));
    assert_eq!(get_reason(&d), Err(SettleError::NotRejected));
}
