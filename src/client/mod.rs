//! In-memory document-store client
//!
//! A small, process-local client with the call surface of a classic document database
//! driver: a [`Client`] hands out [`Database`]s, a database hands out [`Collection`]s,
//! and `find` returns a [`Cursor`]. Documents live in memory for the lifetime of the
//! client.
//!
//! Every interceptable method is routed through a [`DispatchTable`] instead of being
//! called directly. The typed methods below only build an [`Invocation`] and ask the
//! table to run whatever is bound at the method's path; the real work lives in the
//! built-in methods the client binds when it is created. This is the seam the
//! sniffer patches.
//!
//! # Examples
//!
//! ```
//! use mongodog::client::Client;
//! use mongodog::value::Document;
//! use mongodog::doc;
//!
//! let client = Client::new();
//! let users = client.database("app").collection("users");
//! users.insert(doc! { "name" => "ada" }, Document::new()).unwrap();
//!
//! let found = users.find_one(doc! { "name" => "ada" }, Document::new()).unwrap();
//! assert!(found.is_some());
//! ```

mod cursor;
mod methods;
pub mod operations;
pub(crate) mod query;
mod store;

pub use cursor::Cursor;
pub(crate) use methods::register_methods;

use crate::dispatch::{DispatchTable, Invocation, Receiver, Reply};
use crate::error::{MongodogError, Result};
use crate::value::{Document, Value};
use operations::*;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use store::Store;

struct ClientInner {
    store: Mutex<Store>,
    dispatch: Arc<DispatchTable>,
}

/// Handle to one in-memory store; clones share the same data
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Create a client whose operations dispatch through the process-wide table
    pub fn new() -> Self {
        Self::with_dispatch(DispatchTable::global())
    }

    /// Create a client whose operations dispatch through `dispatch`
    ///
    /// The client's built-in methods are bound into the table unless something
    /// is already bound there, so creating a client never undoes an installed sniffer.
    pub fn with_dispatch(dispatch: Arc<DispatchTable>) -> Self {
        register_methods(&dispatch);
        Self {
            inner: Arc::new(ClientInner {
                store: Mutex::new(Store::default()),
                dispatch,
            }),
        }
    }

    pub fn dispatch(&self) -> &Arc<DispatchTable> {
        &self.inner.dispatch
    }

    pub fn database(&self, name: impl Into<String>) -> Database {
        Database {
            client: self.clone(),
            name: name.into(),
        }
    }

    pub fn database_names(&self) -> Vec<String> {
        self.with_store(|store| Ok(store.database_names())).unwrap_or_default()
    }

    pub(crate) fn with_store<T>(&self, f: impl FnOnce(&mut Store) -> Result<T>) -> Result<T> {
        let mut store = self.inner.store.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut store)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("databases", &self.database_names())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Database {
    client: Client,
    name: String,
}

impl Database {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn collection(&self, name: impl Into<String>) -> Collection {
        Collection {
            database: self.clone(),
            name: name.into(),
        }
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.client
            .with_store(|store| Ok(store.collection_names(&self.name)))
            .unwrap_or_default()
    }

    /// Run a database command
    ///
    /// `command` is either the command name (its argument then comes from the `value`
    /// option) or a command document whose first key names the command.
    pub fn command(&self, command: impl Into<Value>, opts: Document) -> Result<Value> {
        let invocation = Invocation::new(Receiver::Database(self.clone()), vec![command.into()], opts);
        self.client
            .dispatch()
            .invoke(&DATABASE_COMMAND.path, &invocation)?
            .into_value()
    }

    pub fn drop_collection(&self, name: &str) -> Result<Value> {
        let mut opts = Document::new();
        opts.insert("value", name);
        self.command("drop", opts)
    }
}

#[derive(Debug, Clone)]
pub struct Collection {
    database: Database,
    name: String,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<database>.<collection>`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.database.name, self.name)
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn drop(&self) -> Result<Value> {
        self.database.drop_collection(&self.name)
    }

    /// Dispatch `operation` on this collection with raw arguments
    ///
    /// The typed methods are thin wrappers around this. A call skipped by an
    /// interception hook comes back as [`Reply::None`].
    pub fn call(&self, operation: &Operation, args: Vec<Value>, kwargs: Document) -> Result<Reply> {
        let invocation = Invocation::new(Receiver::Collection(self.clone()), args, kwargs);
        self.database.client.dispatch().invoke(&operation.path, &invocation)
    }

    fn call_value(&self, operation: &Operation, args: Vec<Value>, kwargs: Document) -> Result<Value> {
        self.call(operation, args, kwargs)?.into_value()
    }

    pub fn aggregate(&self, pipeline: impl Into<Value>, opts: Document) -> Result<Value> {
        self.call_value(&COLLECTION_AGGREGATE, vec![pipeline.into()], opts)
    }

    pub fn count(&self) -> Result<i64> {
        let count = self.call_value(&COLLECTION_COUNT, Vec::new(), Document::new())?;
        Ok(count.as_i64().unwrap_or(0))
    }

    pub fn distinct(&self, key: &str) -> Result<Vec<Value>> {
        match self.call_value(&COLLECTION_DISTINCT, vec![key.into()], Document::new())? {
            Value::Array(values) => Ok(values),
            Value::Null => Ok(Vec::new()),
            other => Err(MongodogError::OperationFailure(format!(
                "distinct returned {}",
                other
            ))),
        }
    }

    pub fn find(&self, spec: impl Into<Value>, opts: Document) -> Result<Cursor> {
        self.call(&COLLECTION_FIND, vec![spec.into()], opts)?.into_cursor()
    }

    pub fn find_and_modify(
        &self,
        query: impl Into<Value>,
        update: impl Into<Value>,
        opts: Document,
    ) -> Result<Value> {
        self.call_value(&COLLECTION_FIND_AND_MODIFY, vec![query.into(), update.into()], opts)
    }

    pub fn find_one(&self, spec_or_id: impl Into<Value>, opts: Document) -> Result<Option<Document>> {
        match self.call_value(&COLLECTION_FIND_ONE, vec![spec_or_id.into()], opts)? {
            Value::Null => Ok(None),
            Value::Document(doc) => Ok(Some(doc)),
            other => Err(MongodogError::OperationFailure(format!(
                "find_one returned {}",
                other
            ))),
        }
    }

    pub fn group(
        &self,
        key: impl Into<Value>,
        condition: impl Into<Value>,
        initial: impl Into<Value>,
        reduce: impl Into<Value>,
        opts: Document,
    ) -> Result<Value> {
        let args = vec![key.into(), condition.into(), initial.into(), reduce.into()];
        self.call_value(&COLLECTION_GROUP, args, opts)
    }

    pub fn inline_map_reduce(
        &self,
        map: impl Into<Value>,
        reduce: impl Into<Value>,
        opts: Document,
    ) -> Result<Value> {
        self.call_value(&COLLECTION_INLINE_MAP_REDUCE, vec![map.into(), reduce.into()], opts)
    }

    /// Insert one document or a list of documents, returning the new `_id` (or list of them)
    pub fn insert(&self, doc_or_docs: impl Into<Value>, opts: Document) -> Result<Value> {
        self.call_value(&COLLECTION_INSERT, vec![doc_or_docs.into()], opts)
    }

    pub fn map_reduce(
        &self,
        map: impl Into<Value>,
        reduce: impl Into<Value>,
        out: impl Into<Value>,
        opts: Document,
    ) -> Result<Value> {
        self.call_value(&COLLECTION_MAP_REDUCE, vec![map.into(), reduce.into(), out.into()], opts)
    }

    pub fn remove(&self, spec_or_id: impl Into<Value>, opts: Document) -> Result<Value> {
        self.call_value(&COLLECTION_REMOVE, vec![spec_or_id.into()], opts)
    }

    /// Insert `to_save`, or replace the stored document with the same `_id`
    pub fn save(&self, to_save: Document, opts: Document) -> Result<Value> {
        self.call_value(&COLLECTION_SAVE, vec![to_save.into()], opts)
    }

    pub fn update(&self, spec: Document, document: Document, opts: Document) -> Result<Value> {
        self.call_value(&COLLECTION_UPDATE, vec![spec.into(), document.into()], opts)
    }

    pub(crate) fn read<T>(&self, f: impl FnOnce(&[Document]) -> Result<T>) -> Result<T> {
        self.database
            .client
            .with_store(|store| f(store.documents(&self.database.name, &self.name)))
    }

    pub(crate) fn write<T>(&self, f: impl FnOnce(&mut Vec<Document>) -> Result<T>) -> Result<T> {
        self.database
            .client
            .with_store(|store| f(store.documents_mut(&self.database.name, &self.name)))
    }
}
