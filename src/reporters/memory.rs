//! In-memory record collection
//!
//! Keeps every reported record, in order, for inspection later. Mostly useful in tests
//! and for short diagnostic sessions.

use super::Reporter;
use crate::error::Result;
use crate::sniffer::{CallRecord, Traceback};
use std::sync::{Arc, Mutex, PoisonError};

/// Callback run for every record as it is stored
pub type ReportCallback = Arc<dyn Fn(&CallRecord, Option<&Traceback>) + Send + Sync>;

/// Reporter that collects `(record, traceback)` pairs in insertion order
///
/// Never discards a record and never fails.
#[derive(Default)]
pub struct MemoryReporter {
    reported: Mutex<Vec<(CallRecord, Option<Traceback>)>>,
    on_report: Option<ReportCallback>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory reporter that also calls `on_report` for each record
    ///
    /// # Arguments
    ///
    /// * `on_report` - Called with each record before it is stored
    pub fn with_callback(on_report: ReportCallback) -> Self {
        Self {
            reported: Mutex::new(Vec::new()),
            on_report: Some(on_report),
        }
    }

    /// Everything reported so far, oldest first
    pub fn reported(&self) -> Vec<(CallRecord, Option<Traceback>)> {
        self.lock().clone()
    }

    /// Reported records without their tracebacks, oldest first
    pub fn records(&self) -> Vec<CallRecord> {
        self.lock().iter().map(|(record, _)| record.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn last(&self) -> Option<(CallRecord, Option<Traceback>)> {
        self.lock().last().cloned()
    }

    /// First reported record with this operation name
    pub fn find_op(&self, op: &str) -> Option<CallRecord> {
        self.lock()
            .iter()
            .find(|(record, _)| record.op() == op)
            .map(|(record, _)| record.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(CallRecord, Option<Traceback>)>> {
        self.reported.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Reporter for MemoryReporter {
    fn accept(&self, record: CallRecord, traceback: Option<Traceback>) -> Result<()> {
        if let Some(callback) = &self.on_report {
            callback(&record, traceback.as_ref());
        }
        self.lock().push((record, traceback));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_keeps_records_in_order() {
        let reporter = MemoryReporter::new();
        assert!(reporter.is_empty());

        reporter.accept(CallRecord::new("first"), None).unwrap();
        reporter.accept(CallRecord::new("second"), Some(Traceback::default())).unwrap();

        let ops: Vec<_> = reporter.records().iter().map(|r| r.op().to_string()).collect();
        assert_eq!(ops, vec!["first", "second"]);
        assert_eq!(reporter.len(), 2);

        let (last, traceback) = reporter.last().unwrap();
        assert_eq!(last.op(), "second");
        assert!(traceback.is_some());
    }

    #[test]
    fn test_find_op() {
        let reporter = MemoryReporter::new();
        reporter.accept(CallRecord::new("collection_find"), None).unwrap();
        reporter.accept(CallRecord::new("cursor_iter"), None).unwrap();

        assert!(reporter.find_op("cursor_iter").is_some());
        assert!(reporter.find_op("collection_save").is_none());
    }

    #[test]
    fn test_clear() {
        let reporter = MemoryReporter::new();
        reporter.accept(CallRecord::new("dummy"), None).unwrap();
        reporter.clear();
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_callback_sees_every_record() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let reporter = MemoryReporter::with_callback(Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        reporter.accept(CallRecord::new("a"), None).unwrap();
        reporter.accept(CallRecord::new("b"), None).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(reporter.len(), 2);
    }
}
