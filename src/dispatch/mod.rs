//! Patch table for interceptable operations
//!
//! Every interceptable client method is called through an explicit indirection point: the
//! client builds an [`Invocation`] and asks a [`DispatchTable`] to run whatever [`Method`]
//! is currently bound at the method's [`TargetPath`]. Swapping that binding is how the
//! sniffer patches an operation, and binding the captured original back restores it.
//!
//! # Architecture
//!
//! - **TargetPath**: `(type name, method name)` identity of one interceptable method
//! - **Invocation**: receiver plus positional and keyword arguments of one call
//! - **Reply**: what a method returns, including the "no result" sentinel
//! - **DispatchTable**: the binding table; one process-wide instance plus isolated ones
//! - **Signature**: declared parameter lists and Python-style argument binding

mod signature;
mod table;

pub use signature::{BoundArgs, Param, ParamDefault, Signature};
pub use table::{DispatchTable, Method};

use crate::client::{Collection, Cursor, Database};
use crate::error::{MongodogError, Result};
use crate::value::{Document, Value};
use std::fmt;

/// Identity of one interceptable method on one target type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetPath {
    pub type_name: &'static str,
    pub method: &'static str,
}

impl TargetPath {
    pub const fn new(type_name: &'static str, method: &'static str) -> Self {
        Self { type_name, method }
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.method)
    }
}

/// The object an operation is invoked on
#[derive(Debug, Clone)]
pub enum Receiver {
    Database(Database),
    Collection(Collection),
    Cursor(Cursor),
    /// Receiver of a type outside the client library, named by its type
    Other(String),
}

impl Receiver {
    pub fn type_name(&self) -> &str {
        match self {
            Receiver::Database(_) => "Database",
            Receiver::Collection(_) => "Collection",
            Receiver::Cursor(_) => "Cursor",
            Receiver::Other(name) => name,
        }
    }

    pub fn as_database(&self, method: &str) -> Result<&Database> {
        match self {
            Receiver::Database(database) => Ok(database),
            _ => Err(self.mismatch(method, "Database")),
        }
    }

    pub fn as_collection(&self, method: &str) -> Result<&Collection> {
        match self {
            Receiver::Collection(collection) => Ok(collection),
            _ => Err(self.mismatch(method, "Collection")),
        }
    }

    pub fn as_cursor(&self, method: &str) -> Result<&Cursor> {
        match self {
            Receiver::Cursor(cursor) => Ok(cursor),
            _ => Err(self.mismatch(method, "Cursor")),
        }
    }

    fn mismatch(&self, method: &str, expected: &str) -> MongodogError {
        MongodogError::invalid_arguments(
            method,
            format!("expected a {} receiver, got {}", expected, self.type_name()),
        )
    }
}

/// One call of an interceptable operation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub receiver: Receiver,
    pub args: Vec<Value>,
    pub kwargs: Document,
}

impl Invocation {
    pub fn new(receiver: Receiver, args: Vec<Value>, kwargs: Document) -> Self {
        Self {
            receiver,
            args,
            kwargs,
        }
    }
}

/// Result of a dispatched method
#[derive(Debug, Clone, Default)]
pub enum Reply {
    /// No result: what a skipped call returns
    #[default]
    None,
    Value(Value),
    Cursor(Cursor),
}

impl Reply {
    pub fn is_none(&self) -> bool {
        matches!(self, Reply::None)
    }

    /// The reply as a plain value; `None` becomes null
    pub fn into_value(self) -> Result<Value> {
        match self {
            Reply::None => Ok(Value::Null),
            Reply::Value(value) => Ok(value),
            Reply::Cursor(_) => Err(MongodogError::OperationFailure(
                "expected a value, got a cursor".to_string(),
            )),
        }
    }

    pub fn into_cursor(self) -> Result<Cursor> {
        match self {
            Reply::Cursor(cursor) => Ok(cursor),
            Reply::None => Err(MongodogError::OperationFailure("call produced no cursor".to_string())),
            Reply::Value(value) => Err(MongodogError::OperationFailure(format!(
                "expected a cursor, got {}",
                value
            ))),
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}
