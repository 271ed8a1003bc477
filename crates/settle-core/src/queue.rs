// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Task queue contract and a single-threaded FIFO implementation.
//!
//! The engine only ever enqueues. Draining is the host's job: run each
//! task exactly once, strictly after the enqueuing call returned, in FIFO
//! order. Draining in a loop instead of recursing keeps long forwarding
//! chains off the call stack.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

use tracing::trace;

/// A unit of deferred work. Consumed by `run`.
pub trait Task {
    fn run(self: Box<Self>);
}

/// Where the engine puts deferred work.
pub trait TaskQueue {
    fn enqueue(&self, task: Box<dyn Task>);
}

/// Queue tuning.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Slots reserved up front.
    pub initial_capacity: usize,
    /// Upper bound on tasks run by one `drain` call. `None` drains until
    /// empty.
    pub drain_limit: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            drain_limit: None,
        }
    }
}

/// FIFO microtask queue, drained explicitly by the owner.
pub struct MicrotaskQueue {
    tasks: RefCell<VecDeque<Box<dyn Task>>>,
    config: QueueConfig,
    draining: Cell<bool>,
    total_enqueued: Cell<u64>,
    total_run: Cell<u64>,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            tasks: RefCell::new(VecDeque::with_capacity(config.initial_capacity)),
            config,
            draining: Cell::new(false),
            total_enqueued: Cell::new(0),
            total_run: Cell::new(0),
        }
    }

    /// Run tasks until the queue is empty (or the configured drain limit
    /// is hit). Tasks enqueued while draining run in the same call.
    /// Returns the number of tasks run.
    pub fn drain(&self) -> usize {
        self.run_batch(self.config.drain_limit.unwrap_or(usize::MAX))
    }

    /// Run at most `limit` tasks. A call made from inside a running task
    /// does nothing and returns 0: the outer loop will get there.
    pub fn run_batch(&self, limit: usize) -> usize {
        if self.draining.replace(true) {
            return 0;
        }
        let _guard = DrainGuard(&self.draining);

        let mut ran = 0;
        while ran < limit {
            let next = self.tasks.borrow_mut().pop_front();
            let Some(task) = next else { break };
            task.run();
            ran += 1;
        }

        self.total_run.set(self.total_run.get() + ran as u64);
        trace!(ran, remaining = self.pending_count(), "drained microtasks");
        ran
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.get()
    }

    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued.get()
    }

    pub fn total_run(&self) -> u64 {
        self.total_run.get()
    }
}

impl Default for MicrotaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue for MicrotaskQueue {
    fn enqueue(&self, task: Box<dyn Task>) {
        self.tasks.borrow_mut().push_back(task);
        self.total_enqueued.set(self.total_enqueued.get() + 1);
    }
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotaskQueue")
            .field("pending", &self.pending_count())
            .field("draining", &self.draining.get())
            .field("total_enqueued", &self.total_enqueued.get())
            .field("total_run", &self.total_run.get())
            .finish()
    }
}

/// Clears the draining flag even if a task panics.
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Task built from a closure.
pub struct FnTask<F>(pub F);

impl<F: FnOnce()> Task for FnTask<F> {
    fn run(self: Box<Self>) {
        (self.0)()
    }
}
