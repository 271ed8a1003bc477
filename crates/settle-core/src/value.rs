// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Dynamic values crossing the resolution boundary.
//!
//! Foreign objects are untyped: anything may expose a `then` member, and
//! reading that member may itself throw. `Value` models just enough of a
//! dynamic object system to express that.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::handler::Handler;

/// Outcome of calling into foreign code. `Err` carries the thrown value.
pub type Completion = Result<Value, Value>;

/// A runtime value as seen by the resolution engine.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// Thrown error payload (`Error`, `TypeError`).
    Error(Rc<ErrorValue>),
    /// Property bag, shared by reference.
    Object(Object),
    /// Callable, shared by reference. Functions carry properties too.
    Function(Function),
    /// The host's own future type.
    Future(Handler),
}

/// Class of an error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Error => write!(f, "Error"),
            ErrorKind::TypeError => write!(f, "TypeError"),
        }
    }
}

/// Error payload carried by `Value::Error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ErrorValue {
    pub kind: ErrorKind,
    pub message: String,
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    /// A plain `Error` with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(Rc::new(ErrorValue {
            kind: ErrorKind::Error,
            message: message.into(),
        }))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Value::Error(Rc::new(ErrorValue {
            kind: ErrorKind::TypeError,
            message: message.into(),
        }))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::Float(_) => "number",
            Value::Str(_) => "string",
            Value::Error(_) => "error",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Future(_) => "future",
        }
    }

    /// Truthiness under dynamic-language rules.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0 && !x.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Error(_) | Value::Object(_) | Value::Function(_) | Value::Future(_) => true,
        }
    }

    /// Shape check only: values that could carry a `then` member.
    pub fn may_be_thenable(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Function(_))
    }

    /// Read a member. Primitives have no members and read as `Undefined`.
    /// A getter that throws surfaces as `Err(thrown)`.
    pub fn get(&self, key: &str) -> Completion {
        match self {
            Value::Object(obj) => obj.get(key),
            Value::Function(func) => func.get(key),
            _ => Ok(Value::Undefined),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Primitives and errors compare by content; objects, functions and
    /// futures compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Future(a), Value::Future(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Error(e) => write!(f, "{}", e),
            Value::Object(obj) => obj.fmt(f),
            Value::Function(func) => func.fmt(f),
            // Opaque: a future may settle with a value holding itself.
            Value::Future(_) => write!(f, "[future]"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Object(_) => write!(f, "[object]"),
            Value::Function(func) => write!(f, "[function {}]", func.name()),
            Value::Future(_) => write!(f, "[future]"),
            other => write!(f, "{:?}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<ErrorValue> for Value {
    fn from(e: ErrorValue) -> Self {
        Value::Error(Rc::new(e))
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Value::Function(func)
    }
}

impl From<Handler> for Value {
    fn from(h: Handler) -> Self {
        Value::Future(h)
    }
}

/// A member slot: plain data, or an accessor run on every read.
#[derive(Clone)]
pub enum Property {
    Data(Value),
    Getter(Function),
}

#[derive(Default)]
struct Properties {
    entries: RefCell<IndexMap<String, Property>>,
}

impl Properties {
    fn set(&self, key: &str, prop: Property) {
        self.entries.borrow_mut().insert(key.to_string(), prop);
    }

    /// The borrow is released before a getter runs; getters may mutate
    /// the object they are read from.
    fn get(&self, receiver: &Value, key: &str) -> Completion {
        let prop = self.entries.borrow().get(key).cloned();
        match prop {
            None => Ok(Value::Undefined),
            Some(Property::Data(v)) => Ok(v),
            Some(Property::Getter(getter)) => getter.call(receiver, &[]),
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

/// Shared property bag.
#[derive(Clone, Default)]
pub struct Object(Rc<Properties>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `set`.
    pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder form of `define_getter`.
    pub fn with_getter(self, key: &str, getter: Function) -> Self {
        self.define_getter(key, getter);
        self
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.0.set(key, Property::Data(value.into()));
    }

    pub fn define_getter(&self, key: &str, getter: Function) {
        self.0.set(key, Property::Getter(getter));
    }

    pub fn get(&self, key: &str) -> Completion {
        self.0.get(&Value::Object(self.clone()), key)
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keys only: objects may reference themselves.
        write!(f, "Object {{ {} }}", self.0.keys().join(", "))
    }
}

type NativeFn = dyn Fn(&Value, &[Value]) -> Completion;

struct FunctionInner {
    name: String,
    body: Box<NativeFn>,
    props: Properties,
}

/// Shared callable taking a receiver and positional arguments.
#[derive(Clone)]
pub struct Function(Rc<FunctionInner>);

impl Function {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Completion + 'static,
    {
        Function(Rc::new(FunctionInner {
            name: name.into(),
            body: Box::new(body),
            props: Properties::default(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn call(&self, receiver: &Value, args: &[Value]) -> Completion {
        (self.0.body)(receiver, args)
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.0.props.set(key, Property::Data(value.into()));
    }

    pub fn get(&self, key: &str) -> Completion {
        self.0.props.get(&Value::Function(self.clone()), key)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[function {}]", self.0.name)
    }
}

/// Positional argument `i`, or `Undefined` when missing.
pub fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}
