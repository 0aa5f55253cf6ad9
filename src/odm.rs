//! Companion document layer
//!
//! A thin object-document layer over [`Collection`]. Its [`DocumentCollection::find`]
//! overrides the collection's own `find`: it is bound at a separate patch-table path,
//! fills in a default filter and then delegates to the wrapped collection, which is
//! itself interceptable. A sniffer therefore sees both the document layer's call and
//! the collection call it delegates to.

use crate::client::operations::{Operation, COLLECTION_FIND};
use crate::client::{Collection, Cursor};
use crate::dispatch::{DispatchTable, Invocation, Method, Receiver, Reply, TargetPath};
use crate::doc;
use crate::error::Result;
use crate::value::{Document, Value};
use std::sync::Arc;

pub const DOCUMENT_COLLECTION_TYPE: &str = "odm.DocumentCollection";

/// `find` of the document layer: same call convention as the collection's
pub const DOCUMENT_COLLECTION_FIND: Operation = Operation::new(
    TargetPath::new(DOCUMENT_COLLECTION_TYPE, "find"),
    COLLECTION_FIND.signature,
);

pub(crate) fn register_methods(table: &DispatchTable) {
    table.bind_if_absent(DOCUMENT_COLLECTION_FIND.path, || -> Method { Arc::new(find) });
}

fn find(invocation: &Invocation) -> Result<Reply> {
    let collection = invocation.receiver.as_collection("find")?;
    let bound = DOCUMENT_COLLECTION_FIND
        .signature
        .bind(&invocation.args, &invocation.kwargs)?;

    let (mut declared, extra) = bound.into_parts();
    if declared.get("spec").map_or(true, Value::is_null) {
        declared.insert("spec", Document::new());
    }
    declared.extend(extra);
    collection.call(&COLLECTION_FIND, Vec::new(), declared)
}

/// Collection of typed documents
#[derive(Debug, Clone)]
pub struct DocumentCollection {
    collection: Collection,
}

impl DocumentCollection {
    pub fn new(collection: Collection) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn find(&self, spec: impl Into<Value>, opts: Document) -> Result<Cursor> {
        let invocation = Invocation::new(
            Receiver::Collection(self.collection.clone()),
            vec![spec.into()],
            opts,
        );
        self.collection
            .database()
            .client()
            .dispatch()
            .invoke(&DOCUMENT_COLLECTION_FIND.path, &invocation)?
            .into_cursor()
    }

    pub fn find_one(&self, spec_or_id: impl Into<Value>) -> Result<Option<Document>> {
        self.collection.find_one(spec_or_id, Document::new())
    }

    /// Store a document; reported as a collection save
    pub fn save(&self, document: Document) -> Result<Value> {
        self.collection.save(document, Document::new())
    }

    /// Remove the document with this `_id`; reported as a collection remove
    pub fn delete(&self, id: impl Into<Value>) -> Result<Value> {
        self.collection.remove(doc! { "_id" => id.into() }, Document::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;

    fn documents() -> DocumentCollection {
        let client = Client::with_dispatch(Arc::new(DispatchTable::new()));
        DocumentCollection::new(client.database("mongodog_test").collection("dummy_documents"))
    }

    #[test]
    fn test_find_defaults_to_empty_filter() {
        let documents = documents();
        for i in 0..3 {
            documents.save(doc! { "_id" => i, "a" => i }).unwrap();
        }

        let cursor = documents.find(Value::Null, Document::new()).unwrap();
        assert_eq!(cursor.query_state().get("spec"), Some(&Value::from(Document::new())));
        assert_eq!(cursor.iter().unwrap().len(), 3);
    }

    #[test]
    fn test_find_passes_options_through() {
        let documents = documents();
        for i in 0..3 {
            documents.save(doc! { "_id" => i }).unwrap();
        }

        let cursor = documents
            .find(Document::new(), doc! { "limit" => 2, "comment" => "odm" })
            .unwrap();
        assert_eq!(cursor.iter().unwrap().len(), 2);
        assert_eq!(
            cursor.query_state().get("kwargs"),
            Some(&Value::from(doc! { "comment" => "odm" }))
        );
    }

    #[test]
    fn test_delete() {
        let documents = documents();
        documents.save(doc! { "_id" => 1 }).unwrap();
        documents.delete(1).unwrap();
        assert_eq!(documents.find_one(1).unwrap(), None);
    }
}
