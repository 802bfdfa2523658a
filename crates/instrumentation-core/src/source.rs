//! Platform signals consumed by the instrumentation
//!
//! [`EntrySource`] stands in for `PerformanceObserver` and [`PageLifecycle`]
//! for the `document`/`window` events the instrumentation listens to.
//! Browser implementations live in the WASM crate; tests use the fakes in
//! the `testing` module.

use crate::error::InstrumentationError;

/// Callback receiving one batch of observed entries
pub type EntryCallback<E> = Box<dyn FnMut(Vec<E>)>;

/// An active registration that can be torn down
pub trait Subscription {
    /// Stop delivery. Calling this more than once is harmless.
    fn disconnect(&mut self);
}

/// Asynchronous producer of performance entries
pub trait EntrySource<E> {
    /// Start delivering batches of `entry_type` entries to `callback`
    ///
    /// With `buffered` set, entries recorded before the call are delivered
    /// too. Returns [`InstrumentationError::Unsupported`] when the platform
    /// cannot observe this entry type.
    fn observe(
        &self,
        entry_type: &str,
        buffered: bool,
        callback: EntryCallback<E>,
    ) -> Result<Box<dyn Subscription>, InstrumentationError>;
}

/// Document readiness and visibility signals
pub trait PageLifecycle {
    /// Whether the document finished loading (`readyState == "complete"`)
    fn is_loaded(&self) -> bool;

    /// Run `callback` once when the page `load` event fires
    fn on_load(
        &self,
        callback: Box<dyn FnOnce()>,
    ) -> Result<Box<dyn Subscription>, InstrumentationError>;

    /// Run `callback` every time the page becomes hidden or is unloaded
    fn on_hidden(
        &self,
        callback: Box<dyn FnMut()>,
    ) -> Result<Box<dyn Subscription>, InstrumentationError>;
}
