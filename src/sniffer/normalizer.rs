//! Turning intercepted calls into call records
//!
//! Each operation gets a [`Normalizer`] picked by its reported name. The normalizer binds
//! the call's arguments against the operation's published signature, so a record lists
//! every parameter by name whether the caller passed it positionally, by keyword or not
//! at all (defaults are filled in). Extra keyword arguments follow the declared ones.
//!
//! Operations without a dedicated normalizer get [`Normalizer::Generic`], which reports
//! the raw positional and keyword arguments.

use super::record::CallRecord;
use crate::client::operations::*;
use crate::dispatch::Invocation;
use crate::error::Result;
use crate::value::Value;

#[derive(Debug, Clone, Copy)]
pub enum Normalizer {
    /// `{db, op, <command params>, <extras>}`
    DatabaseCommand,
    /// `{db, collection, op, <params>, <extras>}` for an operation on a collection
    CollectionScoped(Operation),
    /// `{db, collection, op, <cursor query state>}`
    CursorIter,
    /// `{op, args, kwargs}`
    Generic,
}

impl Normalizer {
    /// The normalizer for calls reported as `name`
    pub fn for_operation(name: &str) -> Self {
        let operation = match name {
            "database_command" => return Normalizer::DatabaseCommand,
            "cursor_iter" => return Normalizer::CursorIter,
            "collection_aggregate" => COLLECTION_AGGREGATE,
            "collection_count" => COLLECTION_COUNT,
            "collection_distinct" => COLLECTION_DISTINCT,
            "collection_find" => COLLECTION_FIND,
            "collection_find_and_modify" => COLLECTION_FIND_AND_MODIFY,
            "collection_find_one" => COLLECTION_FIND_ONE,
            "collection_group" => COLLECTION_GROUP,
            "collection_inline_map_reduce" => COLLECTION_INLINE_MAP_REDUCE,
            "collection_insert" => COLLECTION_INSERT,
            "collection_map_reduce" => COLLECTION_MAP_REDUCE,
            "collection_remove" => COLLECTION_REMOVE,
            "collection_save" => COLLECTION_SAVE,
            "collection_update" => COLLECTION_UPDATE,
            _ => return Normalizer::Generic,
        };
        Normalizer::CollectionScoped(operation)
    }

    /// Build the record for one call reported as `op`
    ///
    /// Fails if the call does not fit the operation's signature or receiver type; the
    /// call itself would fail the same way.
    pub fn normalize(&self, op: &str, invocation: &Invocation) -> Result<CallRecord> {
        match self {
            Normalizer::DatabaseCommand => {
                let database = invocation.receiver.as_database("command")?;
                let bound = DATABASE_COMMAND
                    .signature
                    .bind(&invocation.args, &invocation.kwargs)?;

                let mut record = CallRecord::scoped(database.name(), None, op);
                let (declared, extra) = bound.into_parts();
                record.extend(declared);
                record.extend(extra);
                Ok(record)
            }
            Normalizer::CollectionScoped(operation) => {
                let collection = invocation.receiver.as_collection(operation.signature.method)?;
                let bound = operation.signature.bind(&invocation.args, &invocation.kwargs)?;

                let mut record =
                    CallRecord::scoped(collection.database().name(), Some(collection.name()), op);
                let (declared, extra) = bound.into_parts();
                record.extend(declared);
                record.extend(extra);
                Ok(record)
            }
            Normalizer::CursorIter => {
                let cursor = invocation.receiver.as_cursor("iter")?;
                CURSOR_ITER.signature.bind(&invocation.args, &invocation.kwargs)?;

                let collection = cursor.collection();
                let mut record =
                    CallRecord::scoped(collection.database().name(), Some(collection.name()), op);
                let state = cursor.query_state();
                for field in CURSOR_STATE_FIELDS {
                    record.insert(*field, state.get(field).cloned().unwrap_or_default());
                }
                Ok(record)
            }
            Normalizer::Generic => {
                let mut record = CallRecord::new(op);
                record.insert("args", Value::Array(invocation.args.clone()));
                record.insert("kwargs", invocation.kwargs.clone());
                Ok(record)
            }
        }
    }
}
