//! Log sinks that hand records to JavaScript

use instrumentation_core::{LogSink, SinkError};
use js_sys::Function;
use serde::Serialize;
use shared_types::LogRecord;
use wasm_bindgen::prelude::*;

/// Convert a record into a plain JS object
///
/// Attribute maps become objects rather than `Map`s.
pub fn record_to_js(record: &LogRecord) -> Result<JsValue, SinkError> {
    record
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| SinkError(format!("Serialization error: {}", e)))
}

/// Calls a JS function with every record
pub struct CallbackSink {
    callback: Function,
}

impl CallbackSink {
    pub fn new(callback: Function) -> Self {
        Self { callback }
    }
}

impl LogSink for CallbackSink {
    fn emit(&self, record: LogRecord) -> Result<(), SinkError> {
        let value = record_to_js(&record)?;
        self.callback
            .call1(&JsValue::NULL, &value)
            .map(|_| ())
            .map_err(|e| SinkError(format!("onRecord threw: {:?}", e)))
    }
}

/// Writes every record to the browser console
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn emit(&self, record: LogRecord) -> Result<(), SinkError> {
        let value = record_to_js(&record)?;
        web_sys::console::log_2(&JsValue::from_str(&record.event_name), &value);
        Ok(())
    }
}
