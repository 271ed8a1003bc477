// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Unhandled-rejection tracking.
//!
//! The engine reports every new `Rejected` once. A rejection counts as
//! handled when some continuation acknowledges it; what to do about the
//! rest (log, fail, ignore) is the tracker's call.

use std::cell::RefCell;

use tracing::warn;

use crate::settled::Rejected;

pub trait RejectionTracker {
    /// Called once per constructed rejection.
    fn track(&self, rejected: &Rejected);
}

/// Ignores every rejection.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

impl RejectionTracker for NoopTracker {
    fn track(&self, _rejected: &Rejected) {}
}

/// Keeps every tracked rejection so unacknowledged ones can be reported
/// after the queue settles down.
#[derive(Debug, Default)]
pub struct UnhandledRejections {
    tracked: RefCell<Vec<Rejected>>,
}

impl UnhandledRejections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.borrow().len()
    }

    /// Rejections no continuation has acknowledged yet.
    pub fn unhandled(&self) -> Vec<Rejected> {
        self.tracked
            .borrow()
            .iter()
            .filter(|r| !r.is_handled())
            .cloned()
            .collect()
    }

    /// Warn about each unhandled rejection. Returns how many there were.
    pub fn report(&self) -> usize {
        let unhandled = self.unhandled();
        for rejected in &unhandled {
            warn!(reason = %rejected.reason(), "unhandled rejection");
        }
        unhandled.len()
    }

    /// Forget handled rejections; keep the unhandled ones.
    pub fn prune(&self) {
        self.tracked.borrow_mut().retain(|r| !r.is_handled());
    }
}

impl RejectionTracker for UnhandledRejections {
    fn track(&self, rejected: &Rejected) {
        self.tracked.borrow_mut().push(rejected.clone());
    }
}
