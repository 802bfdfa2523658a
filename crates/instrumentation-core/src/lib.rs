//! Resource timing instrumentation core
//!
//! Observes resource timing entries and emits each one as a structured log
//! record without monopolizing the main thread. Entries are buffered in a
//! bounded queue and drained during idle periods in slices capped by both an
//! item count and a wall-clock budget. The queue is flushed synchronously
//! when it fills up, when the page is hidden and when the instrumentation
//! is disabled, so no entry is ever dropped.
//!
//! Platform access goes through small traits ([`EntrySource`],
//! [`PageLifecycle`], [`IdleScheduler`], [`Clock`], [`LogSink`]). The
//! `instrumentation-wasm` crate implements them on top of `web-sys`; the
//! `testing` module (behind the `testing` feature) provides deterministic
//! fakes.
//!
//! # Example
//!
//! ```
//! use instrumentation_core::testing::{FakeEntrySource, FakePage, ManualClock, ManualScheduler};
//! use instrumentation_core::{
//!     InMemorySink, Platform, ResourceTimingConfig, ResourceTimingEntry,
//!     ResourceTimingInstrumentation,
//! };
//! use std::rc::Rc;
//!
//! let source = Rc::new(FakeEntrySource::<ResourceTimingEntry>::new());
//! let scheduler = Rc::new(ManualScheduler::new());
//! let sink = Rc::new(InMemorySink::new());
//! let platform: Platform<ResourceTimingEntry> = Platform {
//!     source: source.clone(),
//!     page: Rc::new(FakePage::loaded()),
//!     scheduler: scheduler.clone(),
//!     clock: Rc::new(ManualClock::new()),
//! };
//!
//! let instrumentation = ResourceTimingInstrumentation::new(
//!     ResourceTimingConfig::default(),
//!     platform,
//!     sink.clone(),
//! );
//! instrumentation.enable();
//!
//! source.deliver(vec![ResourceTimingEntry::new("https://example.com/app.js")]);
//! scheduler.fire_next(50.0);
//!
//! assert_eq!(sink.len(), 1);
//! instrumentation.disable();
//! ```

pub mod config;
pub mod error;
pub mod instrumentation;
pub mod processor;
pub mod resource_timing;
pub mod scheduler;
pub mod semconv;
pub mod sink;
pub mod source;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::ResourceTimingConfig;
pub use error::{InstrumentationError, SinkError};
pub use instrumentation::{Platform, ResourceTimingInstrumentation};
pub use processor::BatchProcessor;
pub use resource_timing::ResourceTimingEntry;
pub use scheduler::{
    Clock, FallbackScheduler, IdleCallback, IdleDeadline, IdleRequestOptions, IdleScheduler,
    SyntheticDeadline, TaskHandle, Timer,
};
pub use sink::{InMemorySink, IntoLogRecord, LogSink};
pub use source::{EntryCallback, EntrySource, PageLifecycle, Subscription};
