//! Mongodog sniffs out the calls an application makes through its document-store client.
//!
//! A [`Sniffer`](sniffer::Sniffer) patches a registered set of client operations so that
//! every call is normalized into a [`CallRecord`](sniffer::CallRecord) and handed to a
//! [`Reporter`](reporters::Reporter) before the operation runs. The application and the
//! client are unaware of it, and uninstalling puts the original operations back.
//!
//! ```
//! use std::sync::Arc;
//! use mongodog::prelude::*;
//! use mongodog::doc;
//!
//! let table = Arc::new(DispatchTable::new());
//! let client = Client::with_dispatch(Arc::clone(&table));
//! let reporter = Arc::new(MemoryReporter::new());
//! let sniffer = Sniffer::with_table(table, default_registry(), reporter.clone(), false)?;
//!
//! sniffer.install();
//! client.database("app").collection("users").find(doc! { "a" => 0 }, Document::new())?;
//! sniffer.uninstall();
//!
//! assert_eq!(reporter.records()[0].op(), "collection_find");
//! # Ok::<(), mongodog::MongodogError>(())
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
#[cfg(feature = "odm")]
pub mod odm;
pub mod reporters;
pub mod sniffer;
pub mod value;

pub use error::{MongodogError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::client::{Client, Collection, Cursor, Database};
    pub use crate::config::{ReporterKind, SnifferConfig};
    pub use crate::dispatch::DispatchTable;
    pub use crate::error::{MongodogError, Result};
    pub use crate::reporters::{LoggingReporter, MemoryReporter, MongoReporter, NullReporter, Reporter};
    pub use crate::sniffer::{default_registry, CallRecord, HookOutcome, Registry, Sniffer, Traceback};
    pub use crate::value::{Document, ObjectId, Value};
}
