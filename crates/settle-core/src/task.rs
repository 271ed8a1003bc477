// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Work units the engine places on the task queue.

use tracing::trace;

use crate::handler::{Action, FutureLike, Handler};
use crate::queue::Task;
use crate::value::{Function, Value};

/// Delivers one action to a future's settlement.
pub(crate) struct Continuation {
    action: Box<dyn Action>,
    handler: Handler,
}

impl Continuation {
    pub(crate) fn new(action: Box<dyn Action>, handler: Handler) -> Self {
        Self { action, handler }
    }
}

impl Task for Continuation {
    fn run(self: Box<Self>) {
        let Continuation { action, handler } = *self;
        handler.join().asap(action);
    }
}

/// Drives a foreign `then` with callbacks that settle a deferred.
pub(crate) struct Assimilate {
    then: Function,
    thenable: Value,
    resolve: Function,
    reject: Function,
}

impl Assimilate {
    pub(crate) fn new(then: Function, thenable: Value, resolve: Function, reject: Function) -> Self {
        Self {
            then,
            thenable,
            resolve,
            reject,
        }
    }
}

impl Task for Assimilate {
    fn run(self: Box<Self>) {
        let callbacks = [
            Value::Function(self.resolve.clone()),
            Value::Function(self.reject.clone()),
        ];
        if let Err(thrown) = self.then.call(&self.thenable, &callbacks) {
            trace!(reason = ?thrown, "foreign then threw");
            // The reject callback settles a deferred and never throws; a
            // late throw after the thenable already settled is ignored.
            let _ = self.reject.call(&Value::Undefined, &[thrown]);
        }
    }
}
