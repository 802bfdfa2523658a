//! Resource timing entries and their log record mapping

use crate::semconv::*;
use crate::sink::IntoLogRecord;
use serde::{Deserialize, Serialize};
use shared_types::{LogRecord, SeverityNumber};

/// One resource load as reported by the browser
///
/// All timestamps are milliseconds relative to the page's time origin.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceTimingEntry {
    /// The resource URL
    pub name: String,
    pub initiator_type: String,
    pub start_time: f64,
    pub duration: f64,
    pub fetch_start: f64,
    pub domain_lookup_start: f64,
    pub domain_lookup_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub secure_connection_start: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub response_end: f64,
    pub transfer_size: f64,
    pub encoded_body_size: f64,
    pub decoded_body_size: f64,
    pub redirect_start: f64,
    pub redirect_end: f64,
    pub worker_start: f64,
    pub next_hop_protocol: String,
    /// Not exposed by every browser
    pub render_blocking_status: Option<String>,
}

impl ResourceTimingEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl IntoLogRecord for ResourceTimingEntry {
    fn into_log_record(self) -> LogRecord {
        let mut record = LogRecord::new(RESOURCE_TIMING_EVENT_NAME, SeverityNumber::Info)
            .with_timestamp(self.start_time)
            .with_attribute(ATTR_RESOURCE_URL, self.name)
            .with_attribute(ATTR_RESOURCE_INITIATOR_TYPE, self.initiator_type)
            .with_attribute(ATTR_RESOURCE_DURATION, self.duration)
            .with_attribute(ATTR_RESOURCE_FETCH_START, self.fetch_start)
            .with_attribute(ATTR_RESOURCE_DOMAIN_LOOKUP_START, self.domain_lookup_start)
            .with_attribute(ATTR_RESOURCE_DOMAIN_LOOKUP_END, self.domain_lookup_end)
            .with_attribute(ATTR_RESOURCE_CONNECT_START, self.connect_start)
            .with_attribute(ATTR_RESOURCE_CONNECT_END, self.connect_end)
            .with_attribute(
                ATTR_RESOURCE_SECURE_CONNECTION_START,
                self.secure_connection_start,
            )
            .with_attribute(ATTR_RESOURCE_REQUEST_START, self.request_start)
            .with_attribute(ATTR_RESOURCE_RESPONSE_START, self.response_start)
            .with_attribute(ATTR_RESOURCE_RESPONSE_END, self.response_end)
            .with_attribute(ATTR_RESOURCE_TRANSFER_SIZE, self.transfer_size)
            .with_attribute(ATTR_RESOURCE_ENCODED_BODY_SIZE, self.encoded_body_size)
            .with_attribute(ATTR_RESOURCE_DECODED_BODY_SIZE, self.decoded_body_size)
            .with_attribute(ATTR_RESOURCE_REDIRECT_START, self.redirect_start)
            .with_attribute(ATTR_RESOURCE_REDIRECT_END, self.redirect_end)
            .with_attribute(ATTR_RESOURCE_WORKER_START, self.worker_start);

        record.severity_text = Some(SeverityNumber::Info.name().to_string());

        if !self.next_hop_protocol.is_empty() {
            record = record.with_attribute(ATTR_RESOURCE_NEXT_HOP_PROTOCOL, self.next_hop_protocol);
        }
        if let Some(status) = self.render_blocking_status.filter(|s| !s.is_empty()) {
            record = record.with_attribute(ATTR_RESOURCE_RENDER_BLOCKING_STATUS, status);
        }
        record
    }
}
