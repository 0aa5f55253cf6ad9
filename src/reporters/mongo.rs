//! Reporter that stores records as documents in a collection

use super::Reporter;
use crate::client::Collection;
use crate::error::Result;
use crate::sniffer::{CallRecord, Traceback};
use crate::value::{Document, Value};
use tracing::{debug, warn};

/// Inserts one document per record into a collection
///
/// Calls on the reporter's own collection are never stored: the reporter's inserts are
/// themselves intercepted, and storing them would report every report again.
///
/// Primitive fields are copied as they are. Any other field is stored as its JSON text,
/// or as its textual representation when it has no JSON form. The traceback is stored
/// under `_traceback` as a list of lines, empty when none was captured.
#[derive(Debug, Clone)]
pub struct MongoReporter {
    collection: Collection,
}

impl MongoReporter {
    pub fn new(collection: Collection) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    fn to_document(record: &CallRecord, traceback: Option<&Traceback>) -> Document {
        let mut doc = Document::new();
        for (key, value) in record.iter() {
            doc.insert(key, Self::field_value(record.op(), key, value));
        }

        let lines = traceback.map(Traceback::format).unwrap_or_default();
        doc.insert("_traceback", lines);
        doc
    }

    fn field_value(op: &str, key: &str, value: &Value) -> Value {
        if value.is_primitive() {
            return value.clone();
        }
        match serde_json::to_string(value) {
            Ok(json) => Value::String(json),
            Err(e) => {
                warn!("Field {} of {} is not JSON-serializable ({}), storing it as text", key, op, e);
                Value::String(value.to_string())
            }
        }
    }
}

impl Reporter for MongoReporter {
    fn accept(&self, record: CallRecord, traceback: Option<Traceback>) -> Result<()> {
        if record.collection() == Some(self.collection.name()) {
            debug!("Dropping {} on the reporter's own collection {}", record.op(), self.collection.name());
            return Ok(());
        }

        let doc = Self::to_document(&record, traceback.as_ref());
        self.collection.insert(doc, Document::new())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::dispatch::DispatchTable;
    use crate::doc;
    use crate::sniffer::Frame;
    use std::sync::Arc;

    fn reporter() -> MongoReporter {
        let client = Client::with_dispatch(Arc::new(DispatchTable::new()));
        MongoReporter::new(client.database("mongodog_test").collection("mongodog_reports"))
    }

    fn stored(reporter: &MongoReporter) -> Vec<Document> {
        reporter
            .collection()
            .find(Value::Null, Document::new())
            .unwrap()
            .iter()
            .unwrap()
    }

    #[test]
    fn test_primitives_copied_and_others_as_json() {
        let reporter = reporter();
        let mut record = CallRecord::new("collection_find");
        record.insert("collection", "users");
        record.insert("skip", 1);
        record.insert("spec", doc! { "a" => 0 });
        record.insert("fields", Value::Null);
        record.insert("data", Value::Binary(vec![1, 2]));

        reporter.accept(record, None).unwrap();

        let docs = stored(&reporter);
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.get("op"), Some(&Value::from("collection_find")));
        assert_eq!(doc.get("skip"), Some(&Value::Int(1)));
        assert_eq!(doc.get("spec"), Some(&Value::from(r#"{"a":0}"#)));
        assert_eq!(doc.get("fields"), Some(&Value::from("null")));
        assert_eq!(doc.get("data"), Some(&Value::Binary(vec![1, 2])));
        assert_eq!(doc.get("_traceback"), Some(&Value::Array(Vec::new())));
    }

    #[test]
    fn test_text_fallback() {
        let reporter = reporter();
        let mut record = CallRecord::new("collection_insert");
        record.insert("doc_or_docs", doc! { "x" => f64::INFINITY });

        reporter.accept(record, None).unwrap();
        assert_eq!(
            stored(&reporter)[0].get("doc_or_docs"),
            Some(&Value::from("{ \"x\": Infinity }"))
        );
    }

    #[test]
    fn test_traceback_lines() {
        let reporter = reporter();
        let traceback = Traceback::from_frames(vec![Frame {
            symbol: "main".to_string(),
            file: Some("src/main.rs".to_string()),
            line: Some(4),
        }]);

        reporter.accept(CallRecord::new("collection_count"), Some(traceback)).unwrap();
        assert_eq!(
            stored(&reporter)[0].get("_traceback"),
            Some(&Value::from(vec!["File \"src/main.rs\", line 4, in main"]))
        );
    }

    #[test]
    fn test_own_collection_excluded() {
        let reporter = reporter();
        let mut record = CallRecord::new("collection_insert");
        record.insert("collection", "mongodog_reports");

        reporter.accept(record, None).unwrap();
        assert!(stored(&reporter).is_empty());
    }
}
