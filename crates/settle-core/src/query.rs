// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! State queries over any future.

use crate::error::SettleError;
use crate::handler::{FutureLike, Handler};
use crate::value::Value;

pub fn is_pending<F: FutureLike + ?Sized>(future: &F) -> bool {
    future.state().is_pending()
}

pub fn is_fulfilled<F: FutureLike + ?Sized>(future: &F) -> bool {
    future.state().is_fulfilled()
}

pub fn is_rejected<F: FutureLike + ?Sized>(future: &F) -> bool {
    future.state().is_rejected()
}

pub fn is_settled<F: FutureLike + ?Sized>(future: &F) -> bool {
    future.state().is_settled()
}

/// Fulfillment value, or `NotFulfilled` if the future has not fulfilled.
pub fn get_value<F: FutureLike + ?Sized>(future: &F) -> Result<Value, SettleError> {
    match future.join() {
        Handler::Fulfilled(f) => Ok(f.value().clone()),
        _ => Err(SettleError::NotFulfilled),
    }
}

/// Rejection reason, or `NotRejected` if the future has not rejected.
/// Reading the reason does not mark the rejection handled.
pub fn get_reason<F: FutureLike + ?Sized>(future: &F) -> Result<Value, SettleError> {
    match future.join() {
        Handler::Rejected(r) => Ok(r.reason().clone()),
        _ => Err(SettleError::NotRejected),
    }
}
