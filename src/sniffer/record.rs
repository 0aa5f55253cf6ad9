//! Normalized call records

use crate::error::Result;
use crate::value::{Document, Value};
use serde::Serialize;
use std::fmt;

/// Structured representation of one intercepted call
///
/// Always carries `op`, the name of the operation that produced it. Everything else is
/// operation-specific: usually `db` and `collection` followed by every parameter of the
/// operation by name and then any extra keyword arguments of the call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CallRecord {
    fields: Document,
}

impl CallRecord {
    pub fn new(op: impl Into<String>) -> Self {
        let mut fields = Document::new();
        fields.insert("op", op.into());
        Self { fields }
    }

    /// Record with `db` (and `collection`, if given) ahead of `op`
    pub(crate) fn scoped(db: &str, collection: Option<&str>, op: &str) -> Self {
        let mut fields = Document::new();
        fields.insert("db", db);
        if let Some(collection) = collection {
            fields.insert("collection", collection);
        }
        fields.insert("op", op);
        Self { fields }
    }

    pub fn op(&self) -> &str {
        self.fields.get("op").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn db(&self) -> Option<&str> {
        self.fields.get("db").and_then(Value::as_str)
    }

    pub fn collection(&self) -> Option<&str> {
        self.fields.get("collection").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a field; `op` cannot be replaced
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if key != "op" {
            self.fields.insert(key, value);
        }
    }

    pub fn extend(&mut self, fields: Document) {
        for (key, value) in fields {
            self.insert(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_document(&self) -> &Document {
        &self.fields
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.fields.to_json()
    }
}

impl fmt::Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.fields, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use serde_json::json;

    #[test]
    fn test_scoped_key_order() {
        let mut record = CallRecord::scoped("app", Some("users"), "collection_find");
        record.insert("spec", doc! { "a" => 0 });

        let keys: Vec<_> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["db", "collection", "op", "spec"]);
        assert_eq!(record.db(), Some("app"));
        assert_eq!(record.collection(), Some("users"));
    }

    #[test]
    fn test_op_cannot_be_overwritten() {
        let mut record = CallRecord::new("dummy");
        record.extend(doc! { "op" => "other", "x" => 1 });

        assert_eq!(record.op(), "dummy");
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_to_json() {
        let mut record = CallRecord::new("dummy");
        record.insert("args", vec![2]);
        record.insert("kwargs", Document::new());

        assert_eq!(
            record.to_json().unwrap(),
            json!({"op": "dummy", "args": [2], "kwargs": {}})
        );
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"op":"dummy","args":[2],"kwargs":{}}"#
        );
    }
}
