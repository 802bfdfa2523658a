//! Browser idle scheduling
//!
//! `requestIdleCallback` is used when the window has it. Otherwise the core
//! `FallbackScheduler` runs on top of `setTimeout` with a synthetic deadline.

use instrumentation_core::{
    Clock, FallbackScheduler, IdleCallback, IdleDeadline, IdleRequestOptions, IdleScheduler,
    InstrumentationError, TaskHandle, Timer,
};
use js_sys::Reflect;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Performance, Window};

fn platform_error(context: &str, err: JsValue) -> InstrumentationError {
    InstrumentationError::Platform(format!("{}: {:?}", context, err))
}

/// Whether the window exposes a global named `name`
pub(crate) fn has_global(window: &Window, name: &str) -> bool {
    Reflect::has(window, &JsValue::from_str(name)).unwrap_or(false)
}

/// Pick the native scheduler when available, the timer fallback otherwise
pub fn select_scheduler(window: &Window, clock: Rc<dyn Clock>) -> Rc<dyn IdleScheduler> {
    if has_global(window, "requestIdleCallback") {
        debug!("using native requestIdleCallback");
        Rc::new(NativeIdleScheduler::new(window.clone()))
    } else {
        debug!("requestIdleCallback missing, using setTimeout fallback");
        Rc::new(FallbackScheduler::new(WindowTimer::new(window.clone()), clock))
    }
}

struct NativeDeadline(web_sys::IdleDeadline);

impl IdleDeadline for NativeDeadline {
    fn time_remaining(&self) -> f64 {
        self.0.time_remaining()
    }

    fn did_timeout(&self) -> bool {
        self.0.did_timeout()
    }
}

type IdleClosure = Closure<dyn FnMut(web_sys::IdleDeadline)>;
type TimerClosure = Closure<dyn FnMut()>;

/// Closures of callbacks that have not run yet, keyed by platform handle
///
/// A callback releases its own slot when it runs; `cancel` releases it
/// otherwise.
struct Slots<K, C> {
    closures: Rc<RefCell<HashMap<K, C>>>,
}

impl<K: Eq + Hash + Copy + 'static, C: 'static> Slots<K, C> {
    fn new() -> Self {
        Self {
            closures: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Hook run by the callback itself, once its handle is known
    fn releaser(&self) -> (Rc<Cell<Option<K>>>, impl FnOnce() -> Option<C>) {
        let key = Rc::new(Cell::new(None));
        let slot = Rc::clone(&key);
        let closures = Rc::downgrade(&self.closures);
        let release = move || {
            let key = slot.get()?;
            let closures = closures.upgrade()?;
            let released = closures.borrow_mut().remove(&key);
            released
        };
        (key, release)
    }

    fn insert(&self, key: K, closure: C) {
        self.closures.borrow_mut().insert(key, closure);
    }

    fn release(&self, key: K) {
        let released = self.closures.borrow_mut().remove(&key);
        drop(released);
    }

    fn len(&self) -> usize {
        self.closures.borrow().len()
    }
}

/// Scheduler backed by `window.requestIdleCallback`
pub struct NativeIdleScheduler {
    window: Window,
    slots: Slots<u32, IdleClosure>,
}

impl NativeIdleScheduler {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            slots: Slots::new(),
        }
    }

    /// Callbacks scheduled but neither run nor cancelled
    pub fn outstanding(&self) -> usize {
        self.slots.len()
    }
}

impl IdleScheduler for NativeIdleScheduler {
    fn schedule(
        &self,
        callback: IdleCallback,
        options: IdleRequestOptions,
    ) -> Result<TaskHandle, InstrumentationError> {
        let (key, release) = self.slots.releaser();
        // Dropping a closure from inside its own call is deferred by wasm-bindgen
        let closure: IdleClosure = Closure::once(move |deadline: web_sys::IdleDeadline| {
            let own = release();
            callback(&NativeDeadline(deadline));
            drop(own);
        });

        let request = web_sys::IdleRequestOptions::new();
        if let Some(timeout) = options.timeout {
            request.set_timeout(timeout);
        }

        let id = self
            .window
            .request_idle_callback_with_options(closure.as_ref().unchecked_ref(), &request)
            .map_err(|e| platform_error("requestIdleCallback failed", e))?;
        key.set(Some(id));
        self.slots.insert(id, closure);
        Ok(TaskHandle::Idle(id))
    }

    fn cancel(&self, handle: TaskHandle) {
        match handle {
            TaskHandle::Idle(id) => {
                self.window.cancel_idle_callback(id);
                self.slots.release(id);
            }
            TaskHandle::Timeout(id) => self.window.clear_timeout_with_handle(id),
        }
    }
}

/// `setTimeout` / `clearTimeout` on the window
pub struct WindowTimer {
    window: Window,
    slots: Slots<i32, TimerClosure>,
}

impl WindowTimer {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            slots: Slots::new(),
        }
    }

    /// Timeouts set but neither run nor cleared
    pub fn outstanding(&self) -> usize {
        self.slots.len()
    }
}

impl Timer for WindowTimer {
    fn set_timeout(
        &self,
        callback: Box<dyn FnOnce()>,
        delay_ms: i32,
    ) -> Result<i32, InstrumentationError> {
        let (key, release) = self.slots.releaser();
        let closure: TimerClosure = Closure::once(move || {
            let own = release();
            callback();
            drop(own);
        });

        let id = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                delay_ms,
            )
            .map_err(|e| platform_error("setTimeout failed", e))?;
        key.set(Some(id));
        self.slots.insert(id, closure);
        Ok(id)
    }

    fn clear_timeout(&self, id: i32) {
        self.window.clear_timeout_with_handle(id);
        self.slots.release(id);
    }
}

/// `performance.now()`, or `Date.now()` where the Performance API is missing
pub struct PerformanceClock {
    performance: Option<Performance>,
}

impl PerformanceClock {
    pub fn new(window: &Window) -> Self {
        Self {
            performance: window.performance(),
        }
    }
}

impl Clock for PerformanceClock {
    fn now(&self) -> f64 {
        match &self.performance {
            Some(performance) => performance.now(),
            None => js_sys::Date::now(),
        }
    }
}
