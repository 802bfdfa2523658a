//! Cooperative batch processor
//!
//! Entries observed by the platform are buffered in a bounded FIFO queue and
//! emitted to a [`LogSink`] from idle callbacks, a slice at a time. A slice
//! stops as soon as any of these holds:
//!
//! - `batch_size` entries were emitted
//! - `max_processing_time` ms of wall-clock time were spent
//! - the idle deadline has less than 1ms left
//! - the queue is empty
//!
//! Whatever is left gets a continuation scheduled. Three paths bypass the
//! idle schedule and emit synchronously: a full queue (before the next entry
//! is appended), [`BatchProcessor::flush`] (used when the page is hidden) and
//! [`BatchProcessor::shutdown`]. Entries are never dropped and always leave
//! the queue in arrival order.
//!
//! Everything runs on one thread. Interior state lives in a `RefCell` whose
//! borrows are released before calling into the sink or the scheduler.

use crate::config::ResourceTimingConfig;
use crate::scheduler::{
    Clock, IdleCallback, IdleDeadline, IdleRequestOptions, IdleScheduler, TaskHandle,
};
use crate::sink::{IntoLogRecord, LogSink};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Minimum idle time (ms) needed to emit another entry
const MIN_IDLE_REMAINING_MS: f64 = 1.0;

struct State<E> {
    enabled: bool,
    queue: VecDeque<E>,
    /// The one outstanding idle callback, if any
    scheduled: Option<TaskHandle>,
}

struct Shared<E> {
    config: ResourceTimingConfig,
    scheduler: Rc<dyn IdleScheduler>,
    sink: Rc<dyn LogSink>,
    clock: Rc<dyn Clock>,
    state: RefCell<State<E>>,
}

/// Handle to a batch processor; clones share the same queue
pub struct BatchProcessor<E> {
    shared: Rc<Shared<E>>,
}

impl<E> Clone for BatchProcessor<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<E: IntoLogRecord + 'static> BatchProcessor<E> {
    /// Create a disabled processor
    pub fn new(
        config: ResourceTimingConfig,
        scheduler: Rc<dyn IdleScheduler>,
        sink: Rc<dyn LogSink>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self {
            shared: Rc::new(Shared {
                config,
                scheduler,
                sink,
                clock,
                state: RefCell::new(State {
                    enabled: false,
                    queue: VecDeque::new(),
                    scheduled: None,
                }),
            }),
        }
    }

    pub fn config(&self) -> &ResourceTimingConfig {
        &self.shared.config
    }

    /// Start accepting entries
    pub fn start(&self) {
        self.shared.state.borrow_mut().enabled = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.state.borrow().enabled
    }

    /// Number of queued entries
    pub fn pending(&self) -> usize {
        self.shared.state.borrow().queue.len()
    }

    pub fn has_scheduled_task(&self) -> bool {
        self.shared.state.borrow().scheduled.is_some()
    }

    /// Queue a batch of entries and make sure a slice is scheduled
    ///
    /// When the queue is full, everything already queued is emitted
    /// synchronously before the next entry is appended.
    pub fn enqueue<I>(&self, entries: I)
    where
        I: IntoIterator<Item = E>,
    {
        if !self.is_enabled() {
            trace!("processor disabled, ignoring entries");
            return;
        }

        let max_queue_size = self.shared.config.max_queue_size;
        for entry in entries {
            let full = self.shared.state.borrow().queue.len() >= max_queue_size;
            if full {
                debug!(max_queue_size, "queue full, flushing synchronously");
                self.flush();
            }
            self.shared.state.borrow_mut().queue.push_back(entry);
        }

        self.schedule_processing();
    }

    /// Request an idle slice unless one is already outstanding
    pub fn schedule_processing(&self) {
        {
            let state = self.shared.state.borrow();
            if !state.enabled || state.scheduled.is_some() || state.queue.is_empty() {
                return;
            }
        }

        let weak = Rc::downgrade(&self.shared);
        let callback: IdleCallback = Box::new(move |deadline: &dyn IdleDeadline| {
            if let Some(shared) = weak.upgrade() {
                BatchProcessor { shared }.process_chunk(deadline);
            }
        });
        let options = IdleRequestOptions::with_timeout(self.shared.config.force_processing_after);

        match self.shared.scheduler.schedule(callback, options) {
            Ok(handle) => {
                debug!(?handle, "scheduled idle processing");
                self.shared.state.borrow_mut().scheduled = Some(handle);
            }
            Err(err) => {
                warn!(%err, "could not schedule idle processing, entries wait for the next flush");
            }
        }
    }

    /// Emit one bounded slice of the queue
    ///
    /// Only the callback registered by `schedule_processing` runs this, so
    /// the handle it clears is always its own.
    fn process_chunk(&self, deadline: &dyn IdleDeadline) {
        {
            let mut state = self.shared.state.borrow_mut();
            state.scheduled = None;
            if !state.enabled || state.queue.is_empty() {
                return;
            }
        }

        let config = &self.shared.config;
        let budget = f64::from(config.max_processing_time);
        let start = self.shared.clock.now();
        let mut processed = 0;

        while processed < config.batch_size {
            let elapsed = self.shared.clock.now() - start;
            if elapsed >= budget || deadline.time_remaining() < MIN_IDLE_REMAINING_MS {
                break;
            }

            let next = {
                let mut state = self.shared.state.borrow_mut();
                if !state.enabled {
                    break;
                }
                state.queue.pop_front()
            };
            let Some(entry) = next else {
                break;
            };

            self.emit(entry);
            processed += 1;
        }

        let remaining = self.pending();
        trace!(
            processed,
            remaining,
            did_timeout = deadline.did_timeout(),
            "processed idle slice"
        );

        if remaining > 0 {
            self.schedule_processing();
        }
    }

    /// Emit every queued entry now, returning how many were emitted
    pub fn flush(&self) -> usize {
        let drained: Vec<E> = self.shared.state.borrow_mut().queue.drain(..).collect();
        let count = drained.len();
        if count > 0 {
            debug!(count, "flushing queued entries");
        }
        for entry in drained {
            self.emit(entry);
        }
        count
    }

    /// Flush everything, stop accepting entries and cancel the outstanding slice
    ///
    /// Calling this on a stopped processor does nothing.
    pub fn shutdown(&self) {
        let (handle, drained) = {
            let mut state = self.shared.state.borrow_mut();
            if !state.enabled {
                return;
            }
            state.enabled = false;
            let drained: Vec<E> = state.queue.drain(..).collect();
            (state.scheduled.take(), drained)
        };

        if let Some(handle) = handle {
            debug!(?handle, "cancelling outstanding idle processing");
            self.shared.scheduler.cancel(handle);
        }

        debug!(count = drained.len(), "shutting down batch processor");
        for entry in drained {
            self.emit(entry);
        }
    }

    fn emit(&self, entry: E) {
        if let Err(err) = self.shared.sink.emit(entry.into_log_record()) {
            warn!(%err, "log sink rejected a record");
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::sink::InMemorySink;
    use crate::testing::{ManualClock, ManualScheduler};
    use proptest::prelude::*;
    use shared_types::{LogRecord, SeverityNumber};

    struct Numbered(u32);

    impl IntoLogRecord for Numbered {
        fn into_log_record(self) -> LogRecord {
            LogRecord::new("test.entry", SeverityNumber::Info).with_attribute("n", i64::from(self.0))
        }
    }

    #[derive(Debug, Clone)]
    enum Step {
        Deliver(u32),
        Fire(f64),
        Flush,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0u32..8).prop_map(Step::Deliver),
            (0.0f64..60.0).prop_map(Step::Fire),
            Just(Step::Flush),
        ]
    }

    proptest! {
        /// Property: every delivered entry is emitted exactly once, in order
        #[test]
        fn no_loss_and_fifo(
            steps in proptest::collection::vec(step(), 0..40),
            batch_size in 0usize..6,
            max_queue_size in 0usize..6,
            max_processing_time in 0u32..3,
        ) {
            let scheduler = Rc::new(ManualScheduler::new());
            let sink = Rc::new(InMemorySink::new());
            let config = ResourceTimingConfig::default()
                .with_batch_size(batch_size)
                .with_max_queue_size(max_queue_size)
                .with_max_processing_time(max_processing_time);
            let processor = BatchProcessor::new(
                config,
                scheduler.clone(),
                sink.clone(),
                Rc::new(ManualClock::new()),
            );
            processor.start();

            let mut next = 0u32;
            for step in steps {
                match step {
                    Step::Deliver(count) => {
                        let entries: Vec<_> = (next..next + count).map(Numbered).collect();
                        next += count;
                        processor.enqueue(entries);
                    }
                    Step::Fire(remaining) => {
                        scheduler.fire_next(remaining);
                    }
                    Step::Flush => {
                        processor.flush();
                    }
                }
                prop_assert!(scheduler.pending_count() <= 1, "more than one idle task outstanding");
                if max_queue_size > 0 {
                    prop_assert!(processor.pending() <= max_queue_size);
                }
            }

            processor.shutdown();

            let emitted: Vec<u32> = sink
                .records()
                .iter()
                .map(|r| r.attribute("n").and_then(|v| v.as_f64()).unwrap() as u32)
                .collect();
            prop_assert_eq!(emitted, (0..next).collect::<Vec<_>>());
        }
    }
}
