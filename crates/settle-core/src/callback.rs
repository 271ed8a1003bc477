// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Adapter for callback-style async functions.
//!
//! The function receives its arguments followed by a completion callback
//! `(error, value)`. A truthy `error` rejects the deferred, anything else
//! fulfills it with `value`.

use crate::deferred::Deferred;
use crate::value::{arg, Function, Value};

/// Call `f` on `receiver` with `args` plus a completion callback that
/// settles `deferred`, and return `deferred` right away.
///
/// A synchronous throw from `f` rejects `deferred`, unless the callback
/// already settled it.
pub fn adapt(f: &Function, receiver: &Value, args: Vec<Value>, deferred: Deferred) -> Deferred {
    let d = deferred.clone();
    let settle = Value::Function(Function::new("settle", move |_, cb_args| {
        let error = arg(cb_args, 0);
        if error.is_truthy() {
            d.reject(error);
        } else {
            d.fulfill(arg(cb_args, 1));
        }
        Ok(Value::Undefined)
    }));

    let outcome = match args.len() {
        0 => f.call(receiver, &[settle]),
        1 => f.call(receiver, &[args[0].clone(), settle]),
        2 => f.call(receiver, &[args[0].clone(), args[1].clone(), settle]),
        3 => f.call(
            receiver,
            &[args[0].clone(), args[1].clone(), args[2].clone(), settle],
        ),
        _ => {
            let mut args = args;
            args.push(settle);
            f.call(receiver, &args)
        }
    };

    if let Err(thrown) = outcome {
        deferred.reject(thrown);
    }
    deferred
}
