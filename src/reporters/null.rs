//! Reporter that discards everything
//!
//! Lets a sniffer run (and its normalizers validate calls) without keeping or emitting
//! any records.

use super::Reporter;
use crate::error::Result;
use crate::sniffer::{CallRecord, Traceback};

#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl NullReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for NullReporter {
    fn accept(&self, _record: CallRecord, _traceback: Option<Traceback>) -> Result<()> {
        Ok(())
    }
}
