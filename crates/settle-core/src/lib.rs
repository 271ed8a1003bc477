// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Deferred-value resolution engine.
//!
//! A `Deferred` is a value (or error) that becomes available later.
//! Continuations registered on it run from a host-supplied task queue,
//! never inline. Resolving with another future forwards to it; resolving
//! with a foreign thenable (anything exposing a callable `then`) drives
//! that `then` from the queue, capturing throws as rejections.
//!
//! Components:
//! - `value`: dynamic values, objects, functions
//! - `handler`: `Handler`, `FutureLike`, `State`, `Action`
//! - `settled`: `Fulfilled`, `Rejected`, `Never`
//! - `deferred`: the mutable cell, cycle breaking, dispatch
//! - `resolve`: which handler represents a value
//! - `task`: continuation and assimilation tasks
//! - `queue`: queue contract + `MicrotaskQueue`
//! - `tracker`: unhandled-rejection tracking
//! - `callback`: `(error, value)` callback adapter
//! - `query`: `is_*` / `get_*` accessors
//!
//! Everything is single-threaded: handles are `Rc`-based and `!Send`.

mod callback;
mod deferred;
mod engine;
mod error;
mod handler;
mod query;
mod queue;
mod resolve;
mod settled;
mod task;
mod tracker;
mod value;

pub use callback::adapt;
pub use deferred::Deferred;
pub use engine::{DefaultHost, Engine, EngineBuilder, Host};
pub use error::SettleError;
pub use handler::{action, Action, FutureLike, Handler, State};
pub use query::{get_reason, get_value, is_fulfilled, is_pending, is_rejected, is_settled};
pub use queue::{FnTask, MicrotaskQueue, QueueConfig, Task, TaskQueue};
pub use settled::{Fulfilled, Never, Rejected};
pub use tracker::{NoopTracker, RejectionTracker, UnhandledRejections};
pub use value::{arg, Completion, ErrorKind, ErrorValue, Function, Object, Property, Value};
