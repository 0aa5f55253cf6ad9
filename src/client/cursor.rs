//! Result cursors
//!
//! A [`Cursor`] is what `find` returns: a collection plus the stored state of the query
//! (filter, projection, window, ordering and the read flags `find` was given). Builder
//! methods refine that state; only [`Cursor::iter`] actually reads documents, and it is
//! the interceptable operation. Since iteration carries no arguments of its own, anything
//! observing it has to read the query from [`Cursor::query_state`].

use super::operations::{CURSOR_ITER, CURSOR_STATE_FIELDS};
use super::query::{ordering_from, spec_from, Query};
use super::Collection;
use crate::dispatch::{BoundArgs, Invocation, Receiver};
use crate::error::{MongodogError, Result};
use crate::value::{Document, Value};

const QUERY_TAILABLE: i64 = 2;
const QUERY_SLAVE_OKAY: i64 = 4;
const QUERY_NO_TIMEOUT: i64 = 16;
const QUERY_AWAIT_DATA: i64 = 32;
const QUERY_PARTIAL: i64 = 128;

#[derive(Debug, Clone)]
pub struct Cursor {
    collection: Collection,
    state: Document,
}

impl Cursor {
    /// Build a cursor from arguments bound to the `find` signature
    pub(crate) fn from_find(collection: Collection, bound: &BoundArgs) -> Result<Self> {
        let mut state = Document::new();
        for field in CURSOR_STATE_FIELDS {
            state.insert(*field, Value::Null);
        }

        let spec = match bound.get("spec") {
            Value::Null => Value::Document(Document::new()),
            spec @ Value::Document(_) => spec.clone(),
            other => {
                return Err(MongodogError::OperationFailure(format!(
                    "spec must be a document, got {}",
                    other
                )));
            }
        };

        state.insert("spec", spec);
        for name in [
            "fields",
            "skip",
            "limit",
            "timeout",
            "snapshot",
            "tailable",
            "max_scan",
            "as_class",
            "slave_okay",
            "await_data",
            "partial",
            "manipulate",
            "read_preference",
            "tag_sets",
            "secondary_acceptable_latency_ms",
        ] {
            state.insert(name, bound.get(name).clone());
        }
        state.insert("ordering", Value::from(ordering_from(bound.get("sort"))?));
        state.insert("explain", false);
        state.insert("batch_size", 0);
        state.insert("must_use_master", bound.get("_must_use_master").clone());
        state.insert("uuid_subtype", bound.get("_uuid_subtype").clone());
        state.insert("kwargs", bound.extra().clone());

        let mut cursor = Self { collection, state };
        cursor.refresh_query_flags();
        Ok(cursor)
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// The stored query: one entry per field of [`CURSOR_STATE_FIELDS`]
    pub fn query_state(&self) -> &Document {
        &self.state
    }

    pub fn sort(mut self, ordering: Document) -> Self {
        self.state.insert("ordering", ordering);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.state.insert("skip", skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.state.insert("limit", limit);
        self
    }

    pub fn batch_size(mut self, batch_size: i64) -> Self {
        self.state.insert("batch_size", batch_size);
        self
    }

    pub fn hint(mut self, index: impl Into<Value>) -> Self {
        self.state.insert("hint", index);
        self
    }

    /// Read every matching document
    pub fn iter(&self) -> Result<Vec<Document>> {
        let invocation = Invocation::new(Receiver::Cursor(self.clone()), Vec::new(), Document::new());
        let reply = self
            .collection
            .database()
            .client()
            .dispatch()
            .invoke(&CURSOR_ITER.path, &invocation)?;

        match reply.into_value()? {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Document(doc) => Ok(doc),
                    other => Err(MongodogError::OperationFailure(format!(
                        "cursor yielded a non-document: {}",
                        other
                    ))),
                })
                .collect(),
            other => Err(MongodogError::OperationFailure(format!(
                "cursor iteration returned {}",
                other
            ))),
        }
    }

    /// Number of documents matching the filter, ignoring skip and limit
    pub fn count(&self) -> Result<i64> {
        let query = Query {
            spec: self.spec(),
            ..Default::default()
        };
        self.collection
            .read(|documents| Ok(query.run(documents)?.len() as i64))
    }

    fn spec(&self) -> Document {
        spec_from(self.state.get("spec").unwrap_or(&Value::Null))
    }

    pub(crate) fn query(&self) -> Query {
        let int = |name: &str| self.state.get(name).and_then(Value::as_i64).unwrap_or(0);
        Query {
            spec: self.spec(),
            fields: self.state.get("fields").cloned().unwrap_or(Value::Null),
            skip: int("skip"),
            limit: int("limit"),
            ordering: self.state.get("ordering").and_then(Value::as_document).cloned(),
        }
    }

    fn refresh_query_flags(&mut self) {
        let flag = |name: &str| self.state.get(name).is_some_and(Value::is_truthy);
        let mut flags = 0;
        if flag("tailable") {
            flags |= QUERY_TAILABLE;
        }
        if flag("slave_okay") {
            flags |= QUERY_SLAVE_OKAY;
        }
        if !flag("timeout") {
            flags |= QUERY_NO_TIMEOUT;
        }
        if flag("await_data") {
            flags |= QUERY_AWAIT_DATA;
        }
        if flag("partial") {
            flags |= QUERY_PARTIAL;
        }
        self.state.insert("query_flags", flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::dispatch::DispatchTable;
    use crate::doc;
    use std::sync::Arc;

    fn collection() -> Collection {
        let client = Client::with_dispatch(Arc::new(DispatchTable::new()));
        let collection = client.database("mongodog_test").collection("cursor_test");
        let docs: Vec<Document> = (0..10).map(|x| doc! { "a" => x % 2, "b" => x }).collect();
        collection.insert(docs, Document::new()).unwrap();
        collection
    }

    #[test]
    fn test_builder_methods_update_state() {
        let cursor = collection()
            .find(doc! { "a" => 0 }, Document::new())
            .unwrap()
            .sort(doc! { "b" => -1 })
            .skip(1)
            .limit(2);

        let state = cursor.query_state();
        assert_eq!(state.get("spec"), Some(&Value::from(doc! { "a" => 0 })));
        assert_eq!(state.get("fields"), Some(&Value::Null));
        assert_eq!(state.get("skip"), Some(&Value::Int(1)));
        assert_eq!(state.get("limit"), Some(&Value::Int(2)));
        assert_eq!(state.get("ordering"), Some(&Value::from(doc! { "b" => -1 })));
    }

    #[test]
    fn test_state_has_every_reported_field() {
        let cursor = collection().find(Value::Null, Document::new()).unwrap();
        let keys: Vec<_> = cursor.query_state().keys().collect();
        assert_eq!(keys, CURSOR_STATE_FIELDS.to_vec());
    }

    #[test]
    fn test_iter_applies_query() {
        let docs = collection()
            .find(doc! { "a" => 0 }, Document::new())
            .unwrap()
            .sort(doc! { "b" => -1 })
            .skip(1)
            .limit(2)
            .iter()
            .unwrap();

        let bs: Vec<_> = docs.iter().map(|d| d.get("b").cloned().unwrap()).collect();
        assert_eq!(bs, vec![Value::Int(6), Value::Int(4)]);
    }

    #[test]
    fn test_count_ignores_window() {
        let cursor = collection().find(doc! { "a" => 1 }, Document::new()).unwrap().limit(1);
        assert_eq!(cursor.count().unwrap(), 5);
    }

    #[test]
    fn test_query_flags() {
        let cursor = collection()
            .find(Value::Null, doc! { "tailable" => true, "timeout" => false })
            .unwrap();
        assert_eq!(
            cursor.query_state().get("query_flags"),
            Some(&Value::Int(QUERY_TAILABLE | QUERY_NO_TIMEOUT))
        );
    }
}
