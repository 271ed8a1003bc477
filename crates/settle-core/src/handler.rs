// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The future protocol shared by every handler variant.
//!
//! A handler is what a future *is* right now: a mutable `Deferred`, a
//! terminal `Fulfilled`/`Rejected`, or the permanently pending `Never`.
//! Deferreds forward to other handlers once resolved; `join` follows
//! those links to the canonical one.

use std::fmt;

use crate::deferred::Deferred;
use crate::settled::{Fulfilled, Never, Rejected};
use crate::value::Value;

/// Observable state of a future.
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    Pending,
    Fulfilled(Value),
    Rejected { reason: Value, handled: bool },
}

impl State {
    pub fn is_pending(&self) -> bool {
        matches!(self, State::Pending)
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, State::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, State::Rejected { .. })
    }

    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// True for a rejection some continuation has acknowledged.
    pub fn is_handled(&self) -> bool {
        matches!(self, State::Rejected { handled: true, .. })
    }
}

/// A continuation waiting on a settlement. Consumed on delivery, so it
/// can run at most once.
pub trait Action {
    fn fulfilled(self: Box<Self>, settled: &Fulfilled);

    /// Return `true` to mark the rejection as handled.
    fn rejected(self: Box<Self>, settled: &Rejected) -> bool;
}

struct FnAction<F, R> {
    on_fulfilled: F,
    on_rejected: R,
}

impl<F, R> Action for FnAction<F, R>
where
    F: FnOnce(&Value),
    R: FnOnce(&Value) -> bool,
{
    fn fulfilled(self: Box<Self>, settled: &Fulfilled) {
        (self.on_fulfilled)(settled.value())
    }

    fn rejected(self: Box<Self>, settled: &Rejected) -> bool {
        (self.on_rejected)(settled.reason())
    }
}

/// Build an action from a pair of closures.
pub fn action<F, R>(on_fulfilled: F, on_rejected: R) -> Box<dyn Action>
where
    F: FnOnce(&Value) + 'static,
    R: FnOnce(&Value) -> bool + 'static,
{
    Box::new(FnAction {
        on_fulfilled,
        on_rejected,
    })
}

/// Protocol implemented by every handler variant.
pub trait FutureLike {
    fn state(&self) -> State;

    /// Register a continuation. Delivery always goes through the task
    /// queue, never inline.
    fn when(&self, action: Box<dyn Action>);

    /// Deliver now if settled, otherwise wait. Only called from tasks
    /// that are already running off the queue.
    fn asap(&self, action: Box<dyn Action>);

    /// Follow forwarding links to the canonical handler.
    fn join(&self) -> Handler;
}

#[derive(Clone)]
pub enum Handler {
    Deferred(Deferred),
    Fulfilled(Fulfilled),
    Rejected(Rejected),
    Never(Never),
}

impl Handler {
    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        match (self, other) {
            (Handler::Deferred(a), Handler::Deferred(b)) => a.ptr_eq(b),
            (Handler::Fulfilled(a), Handler::Fulfilled(b)) => a.ptr_eq(b),
            (Handler::Rejected(a), Handler::Rejected(b)) => a.ptr_eq(b),
            (Handler::Never(_), Handler::Never(_)) => true,
            _ => false,
        }
    }

    pub(crate) fn is_deferred(&self, deferred: &Deferred) -> bool {
        matches!(self, Handler::Deferred(d) if d.ptr_eq(deferred))
    }

    pub fn as_rejected(&self) -> Option<&Rejected> {
        match self {
            Handler::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

impl FutureLike for Handler {
    fn state(&self) -> State {
        match self {
            Handler::Deferred(d) => d.state(),
            Handler::Fulfilled(f) => f.state(),
            Handler::Rejected(r) => r.state(),
            Handler::Never(n) => n.state(),
        }
    }

    fn when(&self, action: Box<dyn Action>) {
        match self {
            Handler::Deferred(d) => d.when(action),
            Handler::Fulfilled(f) => f.when(action),
            Handler::Rejected(r) => r.when(action),
            Handler::Never(n) => n.when(action),
        }
    }

    fn asap(&self, action: Box<dyn Action>) {
        match self {
            Handler::Deferred(d) => d.asap(action),
            Handler::Fulfilled(f) => f.asap(action),
            Handler::Rejected(r) => r.asap(action),
            Handler::Never(n) => n.asap(action),
        }
    }

    fn join(&self) -> Handler {
        match self {
            Handler::Deferred(d) => d.join(),
            Handler::Fulfilled(f) => f.join(),
            Handler::Rejected(r) => r.join(),
            Handler::Never(n) => n.join(),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Deferred(d) => d.fmt(f),
            Handler::Fulfilled(v) => v.fmt(f),
            Handler::Rejected(r) => r.fmt(f),
            Handler::Never(n) => n.fmt(f),
        }
    }
}

impl From<Deferred> for Handler {
    fn from(d: Deferred) -> Self {
        Handler::Deferred(d)
    }
}

impl From<Fulfilled> for Handler {
    fn from(f: Fulfilled) -> Self {
        Handler::Fulfilled(f)
    }
}

impl From<Rejected> for Handler {
    fn from(r: Rejected) -> Self {
        Handler::Rejected(r)
    }
}

impl From<Never> for Handler {
    fn from(n: Never) -> Self {
        Handler::Never(n)
    }
}
