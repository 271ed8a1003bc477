// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Engine: the injected capabilities every handler shares.
//!
//! Hosts plug in three things: the task queue, the notion of a trusted
//! future, and a tracker told about every rejection. The engine bundles
//! them and is the only way to create deferreds and settlements.

use std::fmt;
use std::rc::Rc;

use crate::deferred::Deferred;
use crate::handler::Handler;
use crate::queue::{Task, TaskQueue};
use crate::settled::{Fulfilled, Never, Rejected};
use crate::tracker::{NoopTracker, RejectionTracker};
use crate::value::Value;

/// Recognizes the host's own future type.
pub trait Host {
    /// True for values that are futures of the host's trusted type.
    fn is_trusted(&self, value: &Value) -> bool;

    /// Converts a trusted future into a handler. `None` for anything
    /// else.
    fn as_handler(&self, value: &Value) -> Option<Handler>;
}

/// Trusts `Value::Future` and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHost;

impl Host for DefaultHost {
    fn is_trusted(&self, value: &Value) -> bool {
        matches!(value, Value::Future(_))
    }

    fn as_handler(&self, value: &Value) -> Option<Handler> {
        match value {
            Value::Future(h) => Some(h.clone()),
            _ => None,
        }
    }
}

struct EngineInner {
    queue: Rc<dyn TaskQueue>,
    host: Rc<dyn Host>,
    tracker: Rc<dyn RejectionTracker>,
}

/// Shared handle to the engine. Cheap to clone.
#[derive(Clone)]
pub struct Engine(Rc<EngineInner>);

impl Engine {
    /// Engine with the default host and no rejection tracking.
    pub fn new(queue: Rc<dyn TaskQueue>) -> Self {
        Self::builder(queue).build()
    }

    pub fn builder(queue: Rc<dyn TaskQueue>) -> EngineBuilder {
        EngineBuilder {
            queue,
            host: None,
            tracker: None,
        }
    }

    pub fn deferred(&self) -> Deferred {
        Deferred::new(self.clone())
    }

    pub fn fulfilled(&self, value: Value) -> Fulfilled {
        Fulfilled::new(self.0.queue.clone(), value)
    }

    /// New rejection, reported to the tracker exactly once.
    pub fn rejected(&self, reason: Value) -> Rejected {
        let rejected = Rejected::new(self.0.queue.clone(), reason);
        self.0.tracker.track(&rejected);
        rejected
    }

    pub fn never(&self) -> Handler {
        Handler::Never(Never)
    }

    pub fn host(&self) -> &dyn Host {
        self.0.host.as_ref()
    }

    pub(crate) fn enqueue(&self, task: Box<dyn Task>) {
        self.0.queue.enqueue(task);
    }

    pub(crate) fn cycle(&self) -> Rejected {
        self.rejected(Value::type_error("resolution cycle"))
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

pub struct EngineBuilder {
    queue: Rc<dyn TaskQueue>,
    host: Option<Rc<dyn Host>>,
    tracker: Option<Rc<dyn RejectionTracker>>,
}

impl EngineBuilder {
    pub fn host(mut self, host: Rc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn tracker(mut self, tracker: Rc<dyn RejectionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn build(self) -> Engine {
        Engine(Rc::new(EngineInner {
            queue: self.queue,
            host: self.host.unwrap_or_else(|| Rc::new(DefaultHost) as Rc<dyn Host>),
            tracker: self.tracker.unwrap_or_else(|| Rc::new(NoopTracker) as Rc<dyn RejectionTracker>),
        }))
    }
}
