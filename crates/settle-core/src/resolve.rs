// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Resolution: which handler represents an arbitrary value.
//!
//! - trusted future: its joined handler
//! - value exposing a callable `then`: a fresh deferred fed by that `then`,
//!   called later from the queue
//! - anything else, including a `then` that is not callable: fulfilled
//!
//! Reading `then` may throw; that becomes a rejection on the spot since no
//! foreign call has happened yet. Cycles need no visited set: resolving a
//! deferred with itself is the only cycle this API can build, and
//! `Deferred::join` breaks it.

use tracing::trace;

use crate::engine::Engine;
use crate::handler::{FutureLike, Handler};
use crate::task::Assimilate;
use crate::value::{arg, Function, Value};

impl Engine {
    pub fn handler_for(&self, value: &Value) -> Handler {
        match self.trusted_handler(value) {
            Some(handler) => handler.join(),
            None => self.handler_for_non_promise(value),
        }
    }

    /// Skips the trusted check. Plain values fulfill without touching
    /// any member.
    pub fn handler_for_non_promise(&self, value: &Value) -> Handler {
        if value.may_be_thenable() {
            self.handler_for_untrusted(value)
        } else {
            self.fulfilled(value.clone()).into()
        }
    }

    /// For values already known to be object-shaped.
    pub fn handler_for_maybe_thenable(&self, value: &Value) -> Handler {
        match self.trusted_handler(value) {
            Some(handler) => handler.join(),
            None => self.handler_for_untrusted(value),
        }
    }

    fn trusted_handler(&self, value: &Value) -> Option<Handler> {
        if self.host().is_trusted(value) {
            self.host().as_handler(value)
        } else {
            None
        }
    }

    fn handler_for_untrusted(&self, value: &Value) -> Handler {
        match value.get("then") {
            Err(thrown) => {
                trace!(reason = ?thrown, "reading then threw");
                self.rejected(thrown).into()
            }
            Ok(Value::Function(then)) => self.extract(then, value.clone()),
            Ok(other) => {
                trace!(then = other.type_name(), "then is not callable");
                self.fulfilled(value.clone()).into()
            }
        }
    }

    /// Fresh deferred settled by the foreign `then`, which runs from the
    /// queue. The deferred's settle-once rule absorbs thenables that call
    /// back twice, call both callbacks, or throw after calling back.
    fn extract(&self, then: Function, thenable: Value) -> Handler {
        let deferred = self.deferred();

        let d = deferred.clone();
        let resolve = Function::new("resolve", move |_, args| {
            d.resolve(arg(args, 0));
            Ok(Value::Undefined)
        });
        let d = deferred.clone();
        let reject = Function::new("reject", move |_, args| {
            d.reject(arg(args, 0));
            Ok(Value::Undefined)
        });

        trace!(then = then.name(), "assimilating foreign thenable");
        self.enqueue(Box::new(Assimilate::new(then, thenable, resolve, reject)));
        Handler::Deferred(deferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::State;
    use crate::queue::MicrotaskQueue;
    use crate::value::Object;
    use std::cell::Cell;
    use std::rc::Rc;

    fn setup() -> (Rc<MicrotaskQueue>, Engine) {
        let q = Rc::new(MicrotaskQueue::new());
        let engine = Engine::new(q.clone());
        (q, engine)
    }

    #[test]
    fn plain_values_fulfill_directly() {
        let (q, engine) = setup();
        for v in [Value::Undefined, Value::Null, Value::Int(4), Value::str("x")] {
            let h = engine.handler_for(&v);
            assert_eq!(h.state(), State::Fulfilled(v));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn trusted_future_is_joined() {
        let (_q, engine) = setup();
        let inner = engine.deferred();
        let outer = engine.deferred();
        outer.resolve(Value::Future(inner.clone().into()));
        let h = engine.handler_for(&Value::Future(outer.into()));
        assert!(h.ptr_eq(&Handler::Deferred(inner)));
    }

    #[test]
    fn object_without_then_fulfills_with_itself() {
        let (q, engine) = setup();
        let obj = Object::new().with("x", Value::Int(1));
        let h = engine.handler_for(&Value::Object(obj.clone()));
        assert_eq!(h.state(), State::Fulfilled(Value::Object(obj)));
        assert!(q.is_empty());
    }

    #[test]
    fn throwing_then_getter_rejects_synchronously() {
        let (q, engine) = setup();
        let obj = Object::new().with_getter(
            "then",
            Function::new("get then", |_, _| Err(Value::error("trap"))),
        );
        let h = engine.handler_for(&Value::Object(obj));
        assert!(q.is_empty());
        assert!(matches!(h.state(), State::Rejected { reason, .. } if reason == Value::error("trap")));
    }

    #[test]
    fn callable_then_is_deferred_to_the_queue() {
        let (q, engine) = setup();
        let called = Rc::new(Cell::new(false));
        let c = called.clone();
        let obj = Object::new().with(
            "then",
            Function::new("then", move |_, args| {
                c.set(true);
                let resolve = args[0].as_function().cloned().ok_or(Value::Undefined)?;
                resolve.call(&Value::Undefined, &[Value::Int(5)])
            }),
        );
        let h = engine.handler_for(&Value::Object(obj));
        assert!(!called.get());
        assert!(h.state().is_pending());
        assert_eq!(q.pending_count(), 1);
        q.drain();
        assert!(called.get());
        assert_eq!(h.state(), State::Fulfilled(Value::Int(5)));
    }

    #[test]
    fn then_is_called_with_the_thenable_as_receiver() {
        let (q, engine) = setup();
        let obj = Object::new();
        let seen = Rc::new(Cell::new(false));
        let (s, target) = (seen.clone(), obj.clone());
        obj.set(
            "then",
            Function::new("then", move |this, _| {
                s.set(matches!(this, Value::Object(o) if o.ptr_eq(&target)));
                Ok(Value::Undefined)
            }),
        );
        engine.handler_for(&Value::Object(obj));
        q.drain();
        assert!(seen.get());
    }

    #[test]
    fn functions_with_then_are_thenables() {
        let (q, engine) = setup();
        let f = Function::new("f", |_, _| Ok(Value::Undefined));
        f.set(
            "then",
            Function::new("then", |_, args| {
                let reject = args[1].as_function().cloned().ok_or(Value::Undefined)?;
                reject.call(&Value::Undefined, &[Value::error("from fn")])
            }),
        );
        let h = engine.handler_for(&Value::Function(f));
        q.drain();
        assert!(h.state().is_rejected());
    }

    #[test]
    fn maybe_thenable_skips_shape_check() {
        let (q, engine) = setup();
        let h = engine.handler_for_maybe_thenable(&Value::Int(3));
        assert_eq!(h.state(), State::Fulfilled(Value::Int(3)));
        assert!(q.is_empty());
    }
}
