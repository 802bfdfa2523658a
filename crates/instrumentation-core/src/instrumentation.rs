//! Resource timing instrumentation lifecycle
//!
//! `enable()` subscribes to resource entries (deferring until the `load`
//! event when the document is still loading) and to the page-hidden signal.
//! Observed batches go to the [`BatchProcessor`]; hiding the page flushes
//! it. `disable()` flushes, unsubscribes and cancels pending idle work.
//!
//! Neither call fails. A platform that cannot observe resource entries
//! leaves the instrumentation inert.

use crate::config::ResourceTimingConfig;
use crate::processor::BatchProcessor;
use crate::resource_timing::ResourceTimingEntry;
use crate::scheduler::{Clock, IdleScheduler};
use crate::semconv::RESOURCE_ENTRY_TYPE;
use crate::sink::{IntoLogRecord, LogSink};
use crate::source::{EntrySource, PageLifecycle, Subscription};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Platform collaborators the instrumentation is built on
pub struct Platform<E> {
    pub source: Rc<dyn EntrySource<E>>,
    pub page: Rc<dyn PageLifecycle>,
    pub scheduler: Rc<dyn IdleScheduler>,
    pub clock: Rc<dyn Clock>,
}

#[derive(Default)]
struct Observation {
    enabled: bool,
    entries: Option<Box<dyn Subscription>>,
    hidden: Option<Box<dyn Subscription>>,
    load: Option<Box<dyn Subscription>>,
}

struct Inner<E> {
    processor: BatchProcessor<E>,
    source: Rc<dyn EntrySource<E>>,
    page: Rc<dyn PageLifecycle>,
    observation: RefCell<Observation>,
}

/// Emits one log record per resource loaded by the page
pub struct ResourceTimingInstrumentation<E: IntoLogRecord + 'static = ResourceTimingEntry> {
    inner: Rc<Inner<E>>,
}

impl<E: IntoLogRecord + 'static> ResourceTimingInstrumentation<E> {
    pub fn new(config: ResourceTimingConfig, platform: Platform<E>, sink: Rc<dyn LogSink>) -> Self {
        let processor = BatchProcessor::new(config, platform.scheduler, sink, platform.clock);
        Self {
            inner: Rc::new(Inner {
                processor,
                source: platform.source,
                page: platform.page,
                observation: RefCell::new(Observation::default()),
            }),
        }
    }

    pub fn enable(&self) {
        {
            let mut observation = self.inner.observation.borrow_mut();
            if observation.enabled {
                return;
            }
            observation.enabled = true;
        }
        self.inner.processor.start();

        if self.inner.page.is_loaded() {
            self.inner.start_observing();
            return;
        }

        debug!("document still loading, deferring resource observation until load");
        let weak = Rc::downgrade(&self.inner);
        let registered = self.inner.page.on_load(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.observation.borrow_mut().load = None;
                inner.start_observing();
            }
        }));
        match registered {
            Ok(subscription) => self.inner.observation.borrow_mut().load = Some(subscription),
            Err(err) => warn!(%err, "could not listen for the load event, observing now"),
        }
        if self.inner.observation.borrow().load.is_none() {
            self.inner.start_observing();
        }
    }

    /// Flush every queued entry, stop observing and cancel pending idle work
    pub fn disable(&self) {
        let subscriptions = {
            let mut observation = self.inner.observation.borrow_mut();
            if !observation.enabled {
                return;
            }
            observation.enabled = false;
            [
                observation.entries.take(),
                observation.hidden.take(),
                observation.load.take(),
            ]
        };

        self.inner.processor.shutdown();
        for mut subscription in subscriptions.into_iter().flatten() {
            subscription.disconnect();
        }
        debug!("resource timing instrumentation disabled");
    }

    /// Emit everything queued right now
    pub fn flush(&self) -> usize {
        self.inner.processor.flush()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.observation.borrow().enabled
    }

    /// Whether entries are currently being observed
    pub fn is_observing(&self) -> bool {
        self.inner.observation.borrow().entries.is_some()
    }

    pub fn pending(&self) -> usize {
        self.inner.processor.pending()
    }

    pub fn config(&self) -> &ResourceTimingConfig {
        self.inner.processor.config()
    }
}

impl<E: IntoLogRecord + 'static> Drop for ResourceTimingInstrumentation<E> {
    fn drop(&mut self) {
        self.disable();
    }
}

impl<E: IntoLogRecord + 'static> Inner<E> {
    fn start_observing(&self) {
        {
            let observation = self.observation.borrow();
            if !observation.enabled || observation.entries.is_some() {
                return;
            }
        }

        let processor = self.processor.clone();
        let observed = self.source.observe(
            RESOURCE_ENTRY_TYPE,
            true,
            Box::new(move |entries: Vec<E>| processor.enqueue(entries)),
        );
        let entries = match observed {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!(%err, "resource timing unavailable, instrumentation stays inert");
                return;
            }
        };

        let processor = self.processor.clone();
        let hidden = match self.page.on_hidden(Box::new(move || {
            let flushed = processor.flush();
            debug!(flushed, "page hidden, flushed queued entries");
        })) {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                warn!(%err, "could not listen for page visibility, queued entries flush on disable only");
                None
            }
        };

        let mut observation = self.observation.borrow_mut();
        observation.entries = Some(entries);
        observation.hidden = hidden;
        debug!("observing resource timing entries");
    }
}
