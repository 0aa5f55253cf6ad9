//! Reporter that logs each record through `tracing`

use super::Reporter;
use crate::error::{MongodogError, Result};
use crate::sniffer::{CallRecord, Traceback};
use tracing::{info, warn, Dispatch};

/// Prefix of every logged record
pub const LOG_PREFIX: &str = "mongodog: ";

const DEFAULT_LOGGER: &str = "mongodog";

/// Where a [`LoggingReporter`] sends its events
#[derive(Debug, Clone)]
pub enum LoggerHandle {
    /// A specific subscriber; events are logged through it whatever the thread's default is
    Dispatch(Dispatch),
    /// A logger name; events go to the default subscriber of the calling thread
    Name(String),
}

impl From<Dispatch> for LoggerHandle {
    fn from(dispatch: Dispatch) -> Self {
        LoggerHandle::Dispatch(dispatch)
    }
}

impl From<&str> for LoggerHandle {
    fn from(name: &str) -> Self {
        LoggerHandle::Name(name.to_string())
    }
}

impl From<String> for LoggerHandle {
    fn from(name: String) -> Self {
        LoggerHandle::Name(name)
    }
}

/// Logs one `info` event per record
///
/// The message is [`LOG_PREFIX`] followed by the record as JSON. The logger name goes in
/// a `logger` field and, when present, the traceback in a separate `traceback` field.
#[derive(Debug, Clone)]
pub struct LoggingReporter {
    handle: LoggerHandle,
}

impl LoggingReporter {
    /// Create a reporter from a subscriber or a logger name
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the logger name is empty.
    pub fn new(handle: impl Into<LoggerHandle>) -> Result<Self> {
        let handle = handle.into();
        if let LoggerHandle::Name(name) = &handle {
            if name.trim().is_empty() {
                return Err(MongodogError::ConfigError(
                    "LoggingReporter expects a subscriber or a non-empty logger name".to_string(),
                ));
            }
        }
        Ok(Self { handle })
    }

    pub fn named(name: impl Into<String>) -> Result<Self> {
        Self::new(LoggerHandle::Name(name.into()))
    }

    pub fn logger(&self) -> &str {
        match &self.handle {
            LoggerHandle::Dispatch(_) => DEFAULT_LOGGER,
            LoggerHandle::Name(name) => name,
        }
    }

    fn emit(&self, message: &str, traceback: Option<&Traceback>) {
        let logger = self.logger();
        match traceback {
            Some(traceback) => info!(logger, traceback = %traceback, "{}{}", LOG_PREFIX, message),
            None => info!(logger, "{}{}", LOG_PREFIX, message),
        }
    }
}

impl Reporter for LoggingReporter {
    fn accept(&self, record: CallRecord, traceback: Option<Traceback>) -> Result<()> {
        let message = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                warn!("Record of {} is not JSON-serializable ({}), logging it as text", record.op(), e);
                record.to_string()
            }
        };

        match &self.handle {
            LoggerHandle::Dispatch(dispatch) => {
                tracing::dispatcher::with_default(dispatch, || self.emit(&message, traceback.as_ref()))
            }
            LoggerHandle::Name(_) => self.emit(&message, traceback.as_ref()),
        }
        Ok(())
    }
}
