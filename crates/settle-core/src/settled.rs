// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Terminal handlers: `Fulfilled`, `Rejected` and the `Never` sentinel.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::handler::{Action, FutureLike, Handler, State};
use crate::queue::TaskQueue;
use crate::task::Continuation;
use crate::value::Value;

struct FulfilledInner {
    value: Value,
    queue: Rc<dyn TaskQueue>,
}

/// A future settled with a value. Immutable.
#[derive(Clone)]
pub struct Fulfilled(Rc<FulfilledInner>);

impl Fulfilled {
    pub(crate) fn new(queue: Rc<dyn TaskQueue>, value: Value) -> Self {
        Fulfilled(Rc::new(FulfilledInner { value, queue }))
    }

    pub fn value(&self) -> &Value {
        &self.0.value
    }

    pub fn ptr_eq(&self, other: &Fulfilled) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl FutureLike for Fulfilled {
    fn state(&self) -> State {
        State::Fulfilled(self.0.value.clone())
    }

    fn when(&self, action: Box<dyn Action>) {
        self.0
            .queue
            .enqueue(Box::new(Continuation::new(action, self.clone().into())));
    }

    fn asap(&self, action: Box<dyn Action>) {
        action.fulfilled(self);
    }

    fn join(&self) -> Handler {
        Handler::Fulfilled(self.clone())
    }
}

impl fmt::Debug for Fulfilled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fulfilled").field(&self.0.value).finish()
    }
}

struct RejectedInner {
    reason: Value,
    /// Set once an action acknowledges the reason. Never cleared.
    handled: Cell<bool>,
    queue: Rc<dyn TaskQueue>,
}

/// A future settled with a reason.
///
/// Only constructed through `Engine::rejected`, which reports every new
/// rejection to the engine's tracker.
#[derive(Clone)]
pub struct Rejected(Rc<RejectedInner>);

impl Rejected {
    pub(crate) fn new(queue: Rc<dyn TaskQueue>, reason: Value) -> Self {
        Rejected(Rc::new(RejectedInner {
            reason,
            handled: Cell::new(false),
            queue,
        }))
    }

    pub fn reason(&self) -> &Value {
        &self.0.reason
    }

    pub fn is_handled(&self) -> bool {
        self.0.handled.get()
    }

    pub fn ptr_eq(&self, other: &Rejected) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl FutureLike for Rejected {
    fn state(&self) -> State {
        State::Rejected {
            reason: self.0.reason.clone(),
            handled: self.0.handled.get(),
        }
    }

    fn when(&self, action: Box<dyn Action>) {
        self.0
            .queue
            .enqueue(Box::new(Continuation::new(action, self.clone().into())));
    }

    fn asap(&self, action: Box<dyn Action>) {
        if action.rejected(self) {
            self.0.handled.set(true);
        }
    }

    fn join(&self) -> Handler {
        Handler::Rejected(self.clone())
    }
}

impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("reason", &self.0.reason)
            .field("handled", &self.0.handled.get())
            .finish()
    }
}

/// Permanently pending. Every continuation registered here is dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Never;

impl FutureLike for Never {
    fn state(&self) -> State {
        State::Pending
    }

    fn when(&self, _action: Box<dyn Action>) {
        trace!("continuation dropped by never");
    }

    fn asap(&self, _action: Box<dyn Action>) {
        trace!("continuation dropped by never");
    }

    fn join(&self) -> Handler {
        Handler::Never(Never)
    }
}
