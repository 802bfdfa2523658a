//! Log emission sinks

use crate::error::SinkError;
use shared_types::LogRecord;
use std::cell::RefCell;

/// Receives log records one at a time
///
/// Emission is synchronous. A sink must not call back into the processor
/// that is emitting to it.
pub trait LogSink {
    fn emit(&self, record: LogRecord) -> Result<(), SinkError>;
}

/// Converts a queued entry into the record that gets emitted
pub trait IntoLogRecord {
    fn into_log_record(self) -> LogRecord;
}

/// Sink that keeps every record in memory
#[derive(Debug, Default)]
pub struct InMemorySink {
    records: RefCell<Vec<LogRecord>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records emitted so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Remove and return everything emitted so far
    pub fn take(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.records.borrow_mut())
    }
}

impl LogSink for InMemorySink {
    fn emit(&self, record: LogRecord) -> Result<(), SinkError> {
        self.records.borrow_mut().push(record);
        Ok(())
    }
}
