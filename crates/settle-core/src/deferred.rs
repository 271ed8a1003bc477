// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The mutable future cell.
//!
//! A `Deferred` starts pending and collects continuations. It is resolved
//! at most once, by storing the handler it forwards to; from then on every
//! query goes through `join`. Waiting continuations are handed over by a
//! single dispatch task, so resolution never runs user code inline.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::engine::Engine;
use crate::handler::{Action, FutureLike, Handler, State};
use crate::queue::Task;
use crate::settled::Never;
use crate::value::Value;

enum Slot {
    Pending(Vec<Box<dyn Action>>),
    /// `waiting` holds continuations registered before resolution until
    /// the dispatch task takes them.
    Resolved {
        handler: Handler,
        waiting: Vec<Box<dyn Action>>,
    },
}

struct DeferredCell {
    engine: Engine,
    slot: RefCell<Slot>,
}

/// A future resolved later by its owner.
#[derive(Clone)]
pub struct Deferred(Rc<DeferredCell>);

impl Deferred {
    pub(crate) fn new(engine: Engine) -> Self {
        Deferred(Rc::new(DeferredCell {
            engine,
            slot: RefCell::new(Slot::Pending(Vec::new())),
        }))
    }

    /// True once a handler has been stored, even if that handler is
    /// itself still pending.
    pub fn is_resolved(&self) -> bool {
        matches!(*self.0.slot.borrow(), Slot::Resolved { .. })
    }

    /// Continuations held by this cell and not yet handed on.
    pub fn waiting_count(&self) -> usize {
        match &*self.0.slot.borrow() {
            Slot::Pending(waiting) | Slot::Resolved { waiting, .. } => waiting.len(),
        }
    }

    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Resolve with an arbitrary value: a plain value fulfills, a future
    /// is followed, a foreign thenable is assimilated. Ignored once
    /// resolved.
    pub fn resolve(&self, value: Value) {
        if self.is_resolved() {
            return;
        }
        let handler = self.0.engine.handler_for(&value);
        self.become_handler(handler);
    }

    pub fn fulfill(&self, value: Value) {
        if self.is_resolved() {
            return;
        }
        let fulfilled = self.0.engine.fulfilled(value);
        self.become_handler(fulfilled.into());
    }

    /// Reject with `reason`. A resolved deferred creates no rejection, so
    /// the tracker never sees one.
    pub fn reject(&self, reason: Value) {
        if self.is_resolved() {
            return;
        }
        let rejected = self.0.engine.rejected(reason);
        self.become_handler(rejected.into());
    }

    /// The single mutation point. First call wins.
    pub(crate) fn become_handler(&self, handler: Handler) {
        let mut slot = self.0.slot.borrow_mut();
        let waiting = match &mut *slot {
            Slot::Resolved { .. } => return,
            Slot::Pending(waiting) => std::mem::take(waiting),
        };
        let dispatch = !waiting.is_empty();
        trace!(waiting = waiting.len(), "deferred resolved");
        *slot = Slot::Resolved { handler, waiting };
        drop(slot);

        if dispatch {
            self.0.engine.enqueue(Box::new(self.clone()));
        }
    }
}

/// Takes the forwarding link out of a resolved slot, leaving `Never`.
fn take_link(slot: &mut Slot) -> Option<Deferred> {
    if let Slot::Resolved { handler, .. } = slot {
        if matches!(handler, Handler::Deferred(_)) {
            if let Handler::Deferred(next) = std::mem::replace(handler, Handler::Never(Never)) {
                return Some(next);
            }
        }
    }
    None
}

impl Drop for DeferredCell {
    /// Unlinks a chain of forwarded deferreds one cell at a time, so
    /// dropping a long chain does not recurse per link.
    fn drop(&mut self) {
        let mut link = take_link(self.slot.get_mut());
        while let Some(next) = link {
            link = match Rc::try_unwrap(next.0) {
                Ok(mut cell) => take_link(cell.slot.get_mut()),
                Err(_) => None,
            };
        }
    }
}

impl FutureLike for Deferred {
    fn state(&self) -> State {
        if self.is_resolved() {
            self.join().state()
        } else {
            State::Pending
        }
    }

    fn when(&self, action: Box<dyn Action>) {
        if self.is_resolved() {
            self.join().when(action);
        } else if let Slot::Pending(waiting) = &mut *self.0.slot.borrow_mut() {
            waiting.push(action);
        }
    }

    fn asap(&self, action: Box<dyn Action>) {
        self.when(action);
    }

    /// Unresolved: self. Resolved: the end of the forwarding chain,
    /// written back into every deferred on the way so later calls are one
    /// hop. A deferred forwarding to itself is replaced, once and for good,
    /// by a resolution-cycle rejection.
    ///
    /// Walks the chain in a loop; chains can be arbitrarily long. Stored
    /// handlers are already joined when stored, so the only cycle a walk
    /// can meet is a self-forward.
    fn join(&self) -> Handler {
        let mut visited: Vec<Deferred> = Vec::new();
        let mut current = self.clone();

        let joined = loop {
            let next = match &*current.0.slot.borrow() {
                Slot::Pending(_) => None,
                Slot::Resolved { handler, .. } => Some(handler.clone()),
            };
            match next {
                None => break Handler::Deferred(current),
                Some(handler) if handler.is_deferred(&current) => {
                    debug!("deferred resolved to itself; rejecting with resolution cycle");
                    let cycle: Handler = current.0.engine.cycle().into();
                    visited.push(current);
                    break cycle;
                }
                Some(Handler::Deferred(next)) => {
                    visited.push(current);
                    current = next;
                }
                Some(terminal) => {
                    visited.push(current);
                    break terminal;
                }
            }
        };

        if visited.len() > 1 {
            trace!(hops = visited.len(), "compressing forwarding chain");
        }
        for deferred in &visited {
            if let Slot::Resolved { handler, .. } = &mut *deferred.0.slot.borrow_mut() {
                *handler = joined.clone();
            }
        }
        joined
    }
}

impl Task for Deferred {
    /// Hand every waiting continuation, in registration order, to the
    /// canonical handler.
    fn run(self: Box<Self>) {
        let waiting = match &mut *self.0.slot.borrow_mut() {
            Slot::Resolved { waiting, .. } => std::mem::take(waiting),
            Slot::Pending(_) => return,
        };
        let handler = self.join();
        trace!(count = waiting.len(), "dispatching continuations");
        for action in waiting {
            handler.asap(action);
        }
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // No join here: formatting must not rewrite the forwarding link.
        // Forwarding targets print as markers; chains can be long.
        match &*self.0.slot.borrow() {
            Slot::Pending(waiting) => f
                .debug_struct("Deferred")
                .field("resolved", &false)
                .field("waiting", &waiting.len())
                .finish(),
            Slot::Resolved { handler, waiting } => {
                let mut s = f.debug_struct("Deferred");
                s.field("resolved", &true);
                match handler {
                    Handler::Deferred(d) if d.ptr_eq(self) => s.field("handler", &"<self>"),
                    Handler::Deferred(_) => s.field("handler", &"<deferred>"),
                    other => s.field("handler", other),
                };
                s.field("waiting", &waiting.len()).finish()
            }
        }
    }
}
