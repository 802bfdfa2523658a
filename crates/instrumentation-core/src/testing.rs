//! Controllable stand-ins for the platform collaborators
//!
//! Everything here is deterministic: time only moves when told to, idle
//! callbacks only fire when told to, and entries only arrive when
//! delivered by hand.

use crate::error::InstrumentationError;
use crate::scheduler::{
    Clock, IdleCallback, IdleDeadline, IdleRequestOptions, IdleScheduler, TaskHandle, Timer,
};
use crate::source::{EntryCallback, EntrySource, PageLifecycle, Subscription};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Clock that only advances when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// Deadline with fixed values
#[derive(Debug, Clone, Copy)]
pub struct StaticDeadline {
    pub time_remaining: f64,
    pub did_timeout: bool,
}

impl StaticDeadline {
    pub fn new(time_remaining: f64) -> Self {
        Self {
            time_remaining,
            did_timeout: false,
        }
    }
}

impl IdleDeadline for StaticDeadline {
    fn time_remaining(&self) -> f64 {
        self.time_remaining
    }

    fn did_timeout(&self) -> bool {
        self.did_timeout
    }
}

/// Idle scheduler whose callbacks run only through [`ManualScheduler::fire_next`]
#[derive(Default)]
pub struct ManualScheduler {
    next_id: Cell<u32>,
    pending: RefCell<VecDeque<(u32, IdleCallback)>>,
    requests: RefCell<Vec<IdleRequestOptions>>,
    cancelled: RefCell<Vec<TaskHandle>>,
    failing: Cell<bool>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `schedule` call fail (or succeed again)
    ///
    /// Failed calls still count towards [`ManualScheduler::schedule_count`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Number of `schedule` calls so far
    pub fn schedule_count(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Options passed to every `schedule` call, in order
    pub fn requests(&self) -> Vec<IdleRequestOptions> {
        self.requests.borrow().clone()
    }

    pub fn cancelled(&self) -> Vec<TaskHandle> {
        self.cancelled.borrow().clone()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Run the oldest pending callback with `deadline`
    ///
    /// Returns `false` when nothing was pending.
    pub fn fire_next_with(&self, deadline: &dyn IdleDeadline) -> bool {
        let next = self.pending.borrow_mut().pop_front();
        match next {
            Some((_, callback)) => {
                callback(deadline);
                true
            }
            None => false,
        }
    }

    /// Run the oldest pending callback with `time_remaining` ms of idle time
    pub fn fire_next(&self, time_remaining: f64) -> bool {
        self.fire_next_with(&StaticDeadline::new(time_remaining))
    }

    /// Keep firing callbacks until none are pending, returning how many ran
    pub fn run_until_idle(&self, time_remaining: f64) -> usize {
        let mut fired = 0;
        while self.fire_next(time_remaining) {
            fired += 1;
        }
        fired
    }
}

impl IdleScheduler for ManualScheduler {
    fn schedule(
        &self,
        callback: IdleCallback,
        options: IdleRequestOptions,
    ) -> Result<TaskHandle, InstrumentationError> {
        self.requests.borrow_mut().push(options);
        if self.failing.get() {
            return Err(InstrumentationError::Platform(
                "requestIdleCallback refused".to_string(),
            ));
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.pending.borrow_mut().push_back((id, callback));
        Ok(TaskHandle::Idle(id))
    }

    fn cancel(&self, handle: TaskHandle) {
        if let TaskHandle::Idle(id) = handle {
            self.pending.borrow_mut().retain(|(pending, _)| *pending != id);
        }
        self.cancelled.borrow_mut().push(handle);
    }
}

/// Timer whose callbacks run only through [`ManualTimer::run_pending`]
#[derive(Default)]
pub struct ManualTimer {
    next_id: Cell<i32>,
    pending: RefCell<Vec<(i32, Box<dyn FnOnce()>)>>,
    delays: RefCell<Vec<i32>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays passed to every `set_timeout` call, in order
    pub fn delays(&self) -> Vec<i32> {
        self.delays.borrow().clone()
    }

    /// Run every pending callback, returning how many ran
    pub fn run_pending(&self) -> usize {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        let count = pending.len();
        for (_, callback) in pending {
            callback();
        }
        count
    }
}

impl Timer for ManualTimer {
    fn set_timeout(
        &self,
        callback: Box<dyn FnOnce()>,
        delay_ms: i32,
    ) -> Result<i32, InstrumentationError> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.delays.borrow_mut().push(delay_ms);
        self.pending.borrow_mut().push((id, callback));
        Ok(id)
    }

    fn clear_timeout(&self, id: i32) {
        self.pending.borrow_mut().retain(|(pending, _)| *pending != id);
    }
}

type CallbackSlot<E> = Rc<RefCell<Option<EntryCallback<E>>>>;

/// Entry source driven by [`FakeEntrySource::deliver`]
pub struct FakeEntrySource<E> {
    supported: bool,
    callback: CallbackSlot<E>,
    connected: Rc<Cell<bool>>,
    observed: RefCell<Vec<(String, bool)>>,
    disconnects: Rc<Cell<usize>>,
}

impl<E> FakeEntrySource<E> {
    pub fn new() -> Self {
        Self {
            supported: true,
            callback: Rc::new(RefCell::new(None)),
            connected: Rc::new(Cell::new(false)),
            observed: RefCell::new(Vec::new()),
            disconnects: Rc::new(Cell::new(0)),
        }
    }

    /// A source whose `observe` always reports the entry type as unsupported
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// `(entry_type, buffered)` for every successful `observe` call
    pub fn observed(&self) -> Vec<(String, bool)> {
        self.observed.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.get()
    }

    /// Hand a batch to the observer callback, as the platform would
    ///
    /// Returns `false` when nobody is subscribed.
    pub fn deliver(&self, entries: Vec<E>) -> bool {
        let taken = self.callback.borrow_mut().take();
        let Some(mut callback) = taken else {
            return false;
        };
        callback(entries);
        let mut slot = self.callback.borrow_mut();
        if slot.is_none() && self.connected.get() {
            *slot = Some(callback);
        }
        true
    }
}

impl<E> Default for FakeEntrySource<E> {
    fn default() -> Self {
        Self::new()
    }
}

struct FakeSubscription<E> {
    callback: CallbackSlot<E>,
    connected: Rc<Cell<bool>>,
    disconnects: Rc<Cell<usize>>,
}

impl<E> Subscription for FakeSubscription<E> {
    fn disconnect(&mut self) {
        if self.connected.replace(false) {
            self.callback.borrow_mut().take();
            self.disconnects.set(self.disconnects.get() + 1);
        }
    }
}

impl<E: 'static> EntrySource<E> for FakeEntrySource<E> {
    fn observe(
        &self,
        entry_type: &str,
        buffered: bool,
        callback: EntryCallback<E>,
    ) -> Result<Box<dyn Subscription>, InstrumentationError> {
        if !self.supported {
            return Err(InstrumentationError::Unsupported(format!(
                "PerformanceObserver cannot observe '{}'",
                entry_type
            )));
        }
        self.observed
            .borrow_mut()
            .push((entry_type.to_string(), buffered));
        *self.callback.borrow_mut() = Some(callback);
        self.connected.set(true);
        Ok(Box::new(FakeSubscription {
            callback: Rc::clone(&self.callback),
            connected: Rc::clone(&self.connected),
            disconnects: Rc::clone(&self.disconnects),
        }))
    }
}

type Listeners<F> = Rc<RefCell<Vec<(u64, F)>>>;

/// Page lifecycle driven by [`FakePage::fire_load`] and [`FakePage::hide`]
pub struct FakePage {
    loaded: Cell<bool>,
    refuse_load: Cell<bool>,
    next_id: Cell<u64>,
    load_listeners: Listeners<Box<dyn FnOnce()>>,
    hidden_listeners: Listeners<Rc<RefCell<Box<dyn FnMut()>>>>,
}

impl FakePage {
    /// A page whose document already finished loading
    pub fn loaded() -> Self {
        Self {
            loaded: Cell::new(true),
            refuse_load: Cell::new(false),
            next_id: Cell::new(0),
            load_listeners: Rc::new(RefCell::new(Vec::new())),
            hidden_listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A page that is still loading
    pub fn loading() -> Self {
        let page = Self::loaded();
        page.loaded.set(false);
        page
    }

    /// A loading page that cannot register a `load` listener
    pub fn loading_without_load_event() -> Self {
        let page = Self::loading();
        page.refuse_load.set(true);
        page
    }

    pub fn load_listener_count(&self) -> usize {
        self.load_listeners.borrow().len()
    }

    pub fn hidden_listener_count(&self) -> usize {
        self.hidden_listeners.borrow().len()
    }

    /// Mark the document loaded and run every load listener once
    pub fn fire_load(&self) {
        self.loaded.set(true);
        let listeners = std::mem::take(&mut *self.load_listeners.borrow_mut());
        for (_, callback) in listeners {
            callback();
        }
    }

    /// Signal that the page became hidden
    pub fn hide(&self) {
        let listeners: Vec<_> = self
            .hidden_listeners
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in listeners {
            (&mut *callback.borrow_mut())();
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

struct ListenerSubscription<F> {
    id: u64,
    listeners: Listeners<F>,
}

impl<F> Subscription for ListenerSubscription<F> {
    fn disconnect(&mut self) {
        let id = self.id;
        self.listeners.borrow_mut().retain(|(listener, _)| *listener != id);
    }
}

impl PageLifecycle for FakePage {
    fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    fn on_load(
        &self,
        callback: Box<dyn FnOnce()>,
    ) -> Result<Box<dyn Subscription>, InstrumentationError> {
        if self.refuse_load.get() {
            return Err(InstrumentationError::Platform(
                "addEventListener('load') refused".to_string(),
            ));
        }
        let id = self.next_id();
        self.load_listeners.borrow_mut().push((id, callback));
        Ok(Box::new(ListenerSubscription {
            id,
            listeners: Rc::clone(&self.load_listeners),
        }))
    }

    fn on_hidden(
        &self,
        callback: Box<dyn FnMut()>,
    ) -> Result<Box<dyn Subscription>, InstrumentationError> {
        let id = self.next_id();
        self.hidden_listeners
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(callback))));
        Ok(Box::new(ListenerSubscription {
            id,
            listeners: Rc::clone(&self.hidden_listeners),
        }))
    }
}
