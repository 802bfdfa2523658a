//! Configuration for the resource timing instrumentation
//!
//! Every option is optional. Omitted fields fall back to defaults and
//! unknown fields are ignored. No range validation is performed: a value of
//! `0` is legal and simply produces degenerate behavior (for example
//! `maxProcessingTime = 0` emits nothing per idle slice until a flush).

use crate::error::InstrumentationError;
use serde::{Deserialize, Serialize};

/// Batching and scheduling options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceTimingConfig {
    /// Number of entries processed per idle slice (default: 50)
    pub batch_size: usize,
    /// Maximum milliseconds to wait for an idle period before forcing processing (default: 1000)
    pub force_processing_after: u32,
    /// Maximum milliseconds spent emitting entries per idle slice (default: 50)
    pub max_processing_time: u32,
    /// Number of queued entries that forces an immediate flush (default: 1000)
    pub max_queue_size: usize,
}

impl Default for ResourceTimingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            force_processing_after: default_force_processing_after(),
            max_processing_time: default_max_processing_time(),
            max_queue_size: default_max_queue_size(),
        }
    }
}

fn default_batch_size() -> usize {
    50
}

fn default_force_processing_after() -> u32 {
    1000
}

fn default_max_processing_time() -> u32 {
    50
}

fn default_max_queue_size() -> usize {
    1000
}

impl ResourceTimingConfig {
    /// Parse configuration from a JSON object string
    ///
    /// # Example
    ///
    /// ```
    /// use instrumentation_core::config::ResourceTimingConfig;
    ///
    /// let config = ResourceTimingConfig::from_json(r#"{ "batchSize": 10 }"#).unwrap();
    /// assert_eq!(config.batch_size, 10);
    /// assert_eq!(config.max_queue_size, 1000);
    /// ```
    pub fn from_json(s: &str) -> Result<Self, InstrumentationError> {
        serde_json::from_str(s).map_err(|e| InstrumentationError::Config(e.to_string()))
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_force_processing_after(mut self, ms: u32) -> Self {
        self.force_processing_after = ms;
        self
    }

    pub fn with_max_processing_time(mut self, ms: u32) -> Self {
        self.max_processing_time = ms;
        self
    }

    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }
}
