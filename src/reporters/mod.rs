//! Sinks for call records
//!
//! A [`Reporter`] receives every record the sniffer produces, together with the
//! call-stack snapshot when capture is enabled. Delivery happens inline, before the
//! intercepted operation runs, so a slow reporter slows every intercepted call.
//!
//! A reporter that writes through the client it observes re-enters intercepted
//! operations. It must keep its own writes out of what it reports, as
//! [`MongoReporter`] does, or every report triggers another one.

mod logging;
mod memory;
mod mongo;
mod null;

pub use logging::{LoggerHandle, LoggingReporter, LOG_PREFIX};
pub use memory::{MemoryReporter, ReportCallback};
pub use mongo::MongoReporter;
pub use null::NullReporter;

use crate::error::{MongodogError, Result};
use crate::sniffer::{CallRecord, Traceback};

/// Consumer of call records
pub trait Reporter: Send + Sync {
    /// Accept one record and, when captured, the stack it was made from
    ///
    /// Must not fail for a well-formed record and must accept a missing traceback.
    fn accept(&self, record: CallRecord, traceback: Option<Traceback>) -> Result<()> {
        let _ = (record, traceback);
        Err(MongodogError::NotImplemented(format!(
            "accept was not implemented in {}",
            std::any::type_name::<Self>()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unfinished;

    impl Reporter for Unfinished {}

    #[test]
    fn test_default_accept_names_the_type() {
        let err = Unfinished.accept(CallRecord::new("dummy"), None).unwrap_err();
        match err {
            MongodogError::NotImplemented(message) => {
                assert!(message.starts_with("accept was not implemented in "));
                assert!(message.ends_with("Unfinished"));
            }
            other => panic!("Expected NotImplemented, got {:?}", other),
        }
    }
}
