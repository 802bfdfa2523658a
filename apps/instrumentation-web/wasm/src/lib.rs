//! WASM bindings for resource timing instrumentation
//!
//! Wires the batching pipeline from `instrumentation-core` to the browser:
//! `PerformanceObserver` for entries, `requestIdleCallback` (or a
//! `setTimeout` fallback) for scheduling, and document events for the load
//! and page-hidden signals.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { ResourceTimingInstrumentation } from './pkg/instrumentation_wasm.js';
//!
//! await init();
//!
//! const instrumentation = new ResourceTimingInstrumentation(
//!     { batchSize: 20, forceProcessingAfter: 500 },
//!     (record) => exporter.push(record),
//! );
//! instrumentation.enable();
//!
//! // later
//! instrumentation.disable(); // flushes whatever is still queued
//! ```

pub mod logging;
pub mod observer;
pub mod page;
pub mod scheduler;
pub mod sink;

use instrumentation_core::{
    Clock, InstrumentationError, LogSink, Platform, ResourceTimingConfig, ResourceTimingEntry,
};
use std::rc::Rc;
use wasm_bindgen::prelude::*;

pub use observer::PerformanceObserverSource;
pub use page::DocumentLifecycle;
pub use scheduler::{select_scheduler, NativeIdleScheduler, PerformanceClock, WindowTimer};
pub use sink::{CallbackSink, ConsoleSink};

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
///
/// Installs the panic hook and sends warnings (unsupported APIs, rejected
/// records, refused idle callbacks) to the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::init_logging(logging::DEFAULT_LOG_LEVEL);
}

/// Get the library version
#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js(err: InstrumentationError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Browser-backed collaborators for the instrumentation
pub fn browser_platform() -> Result<Platform<ResourceTimingEntry>, InstrumentationError> {
    let window = web_sys::window()
        .ok_or_else(|| InstrumentationError::Unsupported("No window".to_string()))?;

    let clock: Rc<dyn Clock> = Rc::new(PerformanceClock::new(&window));
    let scheduler = select_scheduler(&window, Rc::clone(&clock));
    let page = DocumentLifecycle::new(window.clone())?;

    Ok(Platform {
        source: Rc::new(PerformanceObserverSource::new(window)),
        page: Rc::new(page),
        scheduler,
        clock,
    })
}

/// Parse the optional JS config object; `undefined` and `null` mean defaults
fn parse_config(config: JsValue) -> Result<ResourceTimingConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(ResourceTimingConfig::default());
    }
    serde_wasm_bindgen::from_value(config)
        .map_err(|e| JsValue::from_str(&format!("Invalid configuration: {}", e)))
}

/// Emits a log record for every resource the page loads
#[wasm_bindgen]
pub struct ResourceTimingInstrumentation {
    inner: instrumentation_core::ResourceTimingInstrumentation,
}

#[wasm_bindgen]
impl ResourceTimingInstrumentation {
    /// Create a disabled instrumentation
    ///
    /// `on_record` receives each record as a plain object. Without it records
    /// are written to the console.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config: JsValue,
        on_record: Option<js_sys::Function>,
    ) -> Result<ResourceTimingInstrumentation, JsValue> {
        let config = parse_config(config)?;
        let platform = browser_platform().map_err(to_js)?;
        let sink: Rc<dyn LogSink> = match on_record {
            Some(callback) => Rc::new(CallbackSink::new(callback)),
            None => Rc::new(ConsoleSink),
        };

        Ok(Self {
            inner: instrumentation_core::ResourceTimingInstrumentation::new(config, platform, sink),
        })
    }

    /// Start observing; waits for `load` if the document is still loading
    pub fn enable(&self) {
        self.inner.enable();
    }

    /// Flush queued entries and stop observing
    pub fn disable(&self) {
        self.inner.disable();
    }

    /// Emit everything queued now; returns how many records were emitted
    pub fn flush(&self) -> u32 {
        u32::try_from(self.inner.flush()).unwrap_or(u32::MAX)
    }

    #[wasm_bindgen(getter)]
    pub fn pending(&self) -> u32 {
        u32::try_from(self.inner.pending()).unwrap_or(u32::MAX)
    }

    #[wasm_bindgen(getter)]
    pub fn enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    /// Effective configuration as a plain object
    #[wasm_bindgen(getter)]
    pub fn config(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.inner.config())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_crate_version() {
        assert_eq!(get_version(), env!("CARGO_PKG_VERSION"));
    }
}
