//! The sniffer: patches registered operations and delivers their records

use super::interceptor::{wrap, BeforeHook, HookOutcome};
use super::normalizer::Normalizer;
use super::record::CallRecord;
use super::registry::{default_registry, Registry};
use super::traceback::Traceback;
use crate::client::{self, Database};
use crate::config::SnifferConfig;
use crate::dispatch::{DispatchTable, Invocation, Method};
use crate::error::{MongodogError, Result};
use crate::reporters::Reporter;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Single path every record takes to the reporter
struct Delivery {
    reporter: Arc<dyn Reporter>,
    capture_traceback: bool,
}

impl Delivery {
    #[inline(never)]
    fn deliver(&self, record: &CallRecord) -> Result<()> {
        // `capture(1)` drops exactly this frame; nothing may sit in between
        let traceback = if self.capture_traceback {
            Some(Traceback::capture(1))
        } else {
            None
        };
        self.reporter.accept(record.clone(), traceback)
    }
}

/// Intercepts the registered operations of a dispatch table and reports each call
///
/// Construction captures the method currently bound at every registered path and builds
/// its wrapped replacement; nothing is patched until [`Sniffer::start`]. While
/// installed, every call of a registered operation is normalized into a [`CallRecord`]
/// and handed to the reporter before the operation itself runs.
///
/// Installing is idempotent and does not nest: [`Sniffer::stop`] always restores the
/// methods captured at construction, however many times `start` ran. Patching is
/// table-wide, so every client sharing the table is observed. Start and stop are not
/// synchronized with calls running concurrently on other threads; such a call sees
/// either the original or the wrapped method.
///
/// Dropping a sniffer does not uninstall it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use mongodog::client::Client;
/// use mongodog::dispatch::DispatchTable;
/// use mongodog::reporters::MemoryReporter;
/// use mongodog::sniffer::{default_registry, Sniffer};
/// use mongodog::value::Document;
/// use mongodog::doc;
///
/// let table = Arc::new(DispatchTable::new());
/// let client = Client::with_dispatch(Arc::clone(&table));
/// let reporter = Arc::new(MemoryReporter::new());
/// let sniffer = Sniffer::with_table(table, default_registry(), reporter.clone(), false).unwrap();
///
/// sniffer.start();
/// client.database("app").collection("users").insert(doc! { "a" => 1 }, Document::new()).unwrap();
/// sniffer.stop();
///
/// assert_eq!(reporter.records()[0].op(), "collection_insert");
/// ```
pub struct Sniffer {
    table: Arc<DispatchTable>,
    registry: Registry,
    delivery: Arc<Delivery>,
    original: HashMap<String, Method>,
    decorated: HashMap<String, Method>,
}

impl Sniffer {
    /// Create a sniffer over the process-wide table with the default registry and
    /// traceback capture on
    pub fn new(reporter: Arc<dyn Reporter>) -> Result<Self> {
        Self::with_table(DispatchTable::global(), default_registry(), reporter, true)
    }

    /// Create a sniffer over a specific table and registry
    ///
    /// The client library's own operations are bound into `table` first if they are
    /// not bound yet.
    ///
    /// # Arguments
    ///
    /// * `table` - The dispatch table to patch
    /// * `registry` - The operations to intercept
    /// * `reporter` - Receives every record
    /// * `capture_traceback` - Whether to attach a stack snapshot to each record
    ///
    /// # Errors
    ///
    /// Returns `MethodNotBound` if a registered path has nothing bound in `table`.
    pub fn with_table(
        table: Arc<DispatchTable>,
        registry: Registry,
        reporter: Arc<dyn Reporter>,
        capture_traceback: bool,
    ) -> Result<Self> {
        client::register_methods(&table);

        let delivery = Arc::new(Delivery {
            reporter,
            capture_traceback,
        });
        let mut original = HashMap::new();
        let mut decorated = HashMap::new();

        for descriptor in registry.iter() {
            let path = descriptor.path.to_string();
            let method = table
                .lookup(&descriptor.path)
                .ok_or_else(|| MongodogError::MethodNotBound(path.clone()))?;

            let normalizer = Normalizer::for_operation(descriptor.name);
            let hook_delivery = Arc::clone(&delivery);
            let before: BeforeHook<&'static str, Invocation> =
                Box::new(move |op: &&'static str, invocation: &Invocation| {
                    let record = normalizer.normalize(op, invocation)?;
                    hook_delivery.deliver(&record)?;
                    Ok(HookOutcome::Proceed)
                });

            let target = Arc::clone(&method);
            let wrapped: Method = Arc::new(wrap(
                move |invocation: &Invocation| target(invocation),
                descriptor.name,
                Some(before),
                None,
            ));

            original.insert(path.clone(), method);
            decorated.insert(path, wrapped);
        }

        debug!(
            "Sniffer prepared {} operations (traceback capture {})",
            registry.len(),
            if capture_traceback { "on" } else { "off" }
        );

        Ok(Self {
            table,
            registry,
            delivery,
            original,
            decorated,
        })
    }

    /// Create a sniffer over `database`'s table with the reporter chosen by `config`
    pub fn from_config(config: &SnifferConfig, database: &Database) -> Result<Self> {
        let reporter = config.build_reporter(database)?;
        Self::with_table(
            Arc::clone(database.client().dispatch()),
            default_registry(),
            reporter,
            config.capture_traceback,
        )
    }

    /// Bind the wrapped method at every registered path
    pub fn start(&self) {
        for descriptor in self.registry.iter() {
            if let Some(wrapped) = self.decorated.get(&descriptor.path.to_string()) {
                self.table.bind(descriptor.path, Arc::clone(wrapped));
            }
        }
        info!("Sniffer installed on {} operations", self.registry.len());
    }

    /// Bind the original method back at every registered path
    pub fn stop(&self) {
        for descriptor in self.registry.iter() {
            if let Some(original) = self.original.get(&descriptor.path.to_string()) {
                self.table.bind(descriptor.path, Arc::clone(original));
            }
        }
        info!("Sniffer uninstalled");
    }

    pub fn install(&self) {
        self.start();
    }

    pub fn uninstall(&self) {
        self.stop();
    }

    /// Whether every registered path is currently bound to its wrapped method
    pub fn is_installed(&self) -> bool {
        self.registry.iter().all(|descriptor| {
            self.decorated
                .get(&descriptor.path.to_string())
                .is_some_and(|wrapped| self.table.is_bound_to(&descriptor.path, wrapped))
        })
    }

    /// Hand a record to the reporter, with a stack snapshot when capture is on
    ///
    /// The reporter gets its own copy; later changes to `record` do not reach it.
    pub fn deliver(&self, record: &CallRecord) -> Result<()> {
        self.delivery.deliver(record)
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.delivery.reporter
    }

    pub fn captures_traceback(&self) -> bool {
        self.delivery.capture_traceback
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn table(&self) -> &Arc<DispatchTable> {
        &self.table
    }

    /// Method bound at `path` when the sniffer was created
    pub fn original(&self, path: &str) -> Option<&Method> {
        self.original.get(path)
    }

    /// Wrapped replacement for `path`
    pub fn decorated(&self, path: &str) -> Option<&Method> {
        self.decorated.get(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::operations::COLLECTION_FIND;
    use crate::dispatch::{Receiver, Reply, TargetPath};
    use crate::reporters::MemoryReporter;
    use crate::sniffer::OperationDescriptor;
    use crate::value::{Document, Value};

    const DUMMY: TargetPath = TargetPath::new("tests.Dummy", "dummy");

    fn dummy_table() -> Arc<DispatchTable> {
        let table = Arc::new(DispatchTable::new());
        table.bind(DUMMY, Arc::new(|inv: &Invocation| Ok(Reply::Value(inv.args[0].clone()))));
        table
    }

    fn dummy_sniffer(table: &Arc<DispatchTable>, reporter: &Arc<MemoryReporter>) -> Sniffer {
        let registry = Registry::new(vec![OperationDescriptor::new("dummy", DUMMY)]).unwrap();
        Sniffer::with_table(Arc::clone(table), registry, reporter.clone(), false).unwrap()
    }

    fn call_dummy(table: &DispatchTable, arg: i64) -> Value {
        let invocation = Invocation::new(Receiver::Other("Dummy".to_string()), vec![Value::Int(arg)], Document::new());
        table.invoke(&DUMMY, &invocation).unwrap().into_value().unwrap()
    }

    #[test]
    fn test_not_installed_until_started() {
        let table = dummy_table();
        let reporter = Arc::new(MemoryReporter::new());
        let sniffer = dummy_sniffer(&table, &reporter);

        assert!(!sniffer.is_installed());
        assert_eq!(call_dummy(&table, 1), Value::Int(1));
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_start_stop_restores_original_identity() {
        let table = dummy_table();
        let before = table.lookup(&DUMMY).unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let sniffer = dummy_sniffer(&table, &reporter);

        sniffer.start();
        assert!(sniffer.is_installed());
        assert!(!table.is_bound_to(&DUMMY, &before));

        sniffer.stop();
        assert!(!sniffer.is_installed());
        assert!(table.is_bound_to(&DUMMY, &before));
        assert!(Arc::ptr_eq(sniffer.original("tests.Dummy.dummy").unwrap(), &before));
    }

    #[test]
    fn test_stop_without_start_is_harmless() {
        let table = dummy_table();
        let before = table.lookup(&DUMMY).unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let sniffer = dummy_sniffer(&table, &reporter);

        sniffer.stop();
        assert!(table.is_bound_to(&DUMMY, &before));
    }

    #[test]
    fn test_double_start_reports_once_per_call() {
        let table = dummy_table();
        let reporter = Arc::new(MemoryReporter::new());
        let sniffer = dummy_sniffer(&table, &reporter);

        sniffer.start();
        sniffer.start();
        call_dummy(&table, 2);

        assert_eq!(reporter.len(), 1);
    }

    #[test]
    fn test_unbound_path_fails_construction() {
        let table = Arc::new(DispatchTable::new());
        let registry = Registry::new(vec![OperationDescriptor::new("dummy", DUMMY)]).unwrap();
        let result = Sniffer::with_table(table, registry, Arc::new(MemoryReporter::new()), false);

        assert!(matches!(result, Err(MongodogError::MethodNotBound(p)) if p == "tests.Dummy.dummy"));
    }

    #[test]
    fn test_construction_binds_client_methods() {
        let table = Arc::new(DispatchTable::new());
        let sniffer =
            Sniffer::with_table(Arc::clone(&table), default_registry(), Arc::new(MemoryReporter::new()), false)
                .unwrap();

        assert!(table.lookup(&COLLECTION_FIND.path).is_some());
        assert_eq!(sniffer.registry().len(), default_registry().len());
    }

    #[test]
    fn test_deliver_copies_record() {
        let table = dummy_table();
        let reporter = Arc::new(MemoryReporter::new());
        let sniffer = dummy_sniffer(&table, &reporter);

        let mut record = CallRecord::new("dummy");
        record.insert("x", 1);
        sniffer.deliver(&record).unwrap();
        record.insert("x", 2);

        assert_eq!(reporter.records()[0].get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_deliver_attaches_traceback_when_enabled() {
        let table = dummy_table();
        let reporter = Arc::new(MemoryReporter::new());
        let registry = Registry::new(vec![OperationDescriptor::new("dummy", DUMMY)]).unwrap();
        let sniffer = Sniffer::with_table(Arc::clone(&table), registry, reporter.clone(), true).unwrap();
        assert!(sniffer.captures_traceback());

        sniffer.start();
        call_dummy(&table, 1);

        let (_, traceback) = reporter.last().unwrap();
        let traceback = traceback.unwrap();
        assert!(traceback
            .frames()
            .iter()
            .all(|frame| !frame.symbol.contains("Delivery::deliver")));
    }
}
