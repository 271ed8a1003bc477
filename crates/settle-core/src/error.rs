// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Misuse errors.

use thiserror::Error;

/// Accessor called on a future in the wrong state. A programming error,
/// not something to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SettleError {
    #[error("not fulfilled")]
    NotFulfilled,

    #[error("not rejected")]
    NotRejected,
}
