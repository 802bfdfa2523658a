//! Idle-time scheduling abstraction
//!
//! The batch processor never talks to the platform directly. It asks an
//! [`IdleScheduler`] to run a callback during an idle period (or once a
//! timeout expires) and receives an [`IdleDeadline`] describing how much
//! idle time is left.
//!
//! Two strategies exist:
//! - a native one backed by `requestIdleCallback` (provided by the WASM crate)
//! - [`FallbackScheduler`], which defers through a one-shot [`Timer`] and
//!   hands the callback a [`SyntheticDeadline`] reporting a fixed 50ms budget
//!
//! The strategy is picked once when the instrumentation is built.

use crate::error::InstrumentationError;
use std::rc::Rc;
use tracing::debug;

/// Idle budget reported by the synthetic deadline (W3C recommendation)
pub const IDLE_DEADLINE_MS: f64 = 50.0;

/// Delay used by the timer fallback
pub const FALLBACK_DELAY_MS: i32 = 1;

/// Time remaining in the current idle period
pub trait IdleDeadline {
    /// Milliseconds left in the idle period, never negative
    fn time_remaining(&self) -> f64;
    /// Whether the callback fired because the timeout elapsed
    fn did_timeout(&self) -> bool;
}

/// Options for an idle request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdleRequestOptions {
    /// Milliseconds after which the callback runs even without an idle period
    pub timeout: Option<u32>,
}

impl IdleRequestOptions {
    pub fn with_timeout(timeout: u32) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Handle to an outstanding scheduled callback
///
/// The variant records which platform primitive issued it so that
/// cancellation goes to the matching cancel call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskHandle {
    /// Issued by `requestIdleCallback`
    Idle(u32),
    /// Issued by `setTimeout`
    Timeout(i32),
}

pub type IdleCallback = Box<dyn FnOnce(&dyn IdleDeadline)>;

/// Schedules callbacks into idle periods
///
/// Implementations must never invoke the callback before `schedule` returns.
pub trait IdleScheduler {
    fn schedule(
        &self,
        callback: IdleCallback,
        options: IdleRequestOptions,
    ) -> Result<TaskHandle, InstrumentationError>;

    /// Best-effort cancellation; a no-op when the callback already ran
    fn cancel(&self, handle: TaskHandle);
}

/// Monotonic millisecond clock (`performance.now()` in the browser)
pub trait Clock {
    fn now(&self) -> f64;
}

/// One-shot deferred execution (`setTimeout` in the browser)
pub trait Timer {
    fn set_timeout(
        &self,
        callback: Box<dyn FnOnce()>,
        delay_ms: i32,
    ) -> Result<i32, InstrumentationError>;

    fn clear_timeout(&self, id: i32);
}

impl<T: Timer + ?Sized> Timer for Rc<T> {
    fn set_timeout(
        &self,
        callback: Box<dyn FnOnce()>,
        delay_ms: i32,
    ) -> Result<i32, InstrumentationError> {
        (**self).set_timeout(callback, delay_ms)
    }

    fn clear_timeout(&self, id: i32) {
        (**self).clear_timeout(id)
    }
}

/// Deadline handed out by the fallback scheduler
pub struct SyntheticDeadline {
    clock: Rc<dyn Clock>,
    start: f64,
}

impl SyntheticDeadline {
    /// Start a fresh idle budget at the clock's current time
    pub fn starting_now(clock: Rc<dyn Clock>) -> Self {
        let start = clock.now();
        Self { clock, start }
    }
}

impl IdleDeadline for SyntheticDeadline {
    fn time_remaining(&self) -> f64 {
        let elapsed = self.clock.now() - self.start;
        (IDLE_DEADLINE_MS - elapsed).max(0.0)
    }

    fn did_timeout(&self) -> bool {
        false
    }
}

/// Idle scheduler for platforms without `requestIdleCallback`
pub struct FallbackScheduler<T> {
    timer: T,
    clock: Rc<dyn Clock>,
}

impl<T: Timer> FallbackScheduler<T> {
    pub fn new(timer: T, clock: Rc<dyn Clock>) -> Self {
        Self { timer, clock }
    }
}

impl<T: Timer> IdleScheduler for FallbackScheduler<T> {
    fn schedule(
        &self,
        callback: IdleCallback,
        _options: IdleRequestOptions,
    ) -> Result<TaskHandle, InstrumentationError> {
        let clock = Rc::clone(&self.clock);
        let id = self.timer.set_timeout(
            Box::new(move || {
                let deadline = SyntheticDeadline::starting_now(clock);
                callback(&deadline);
            }),
            FALLBACK_DELAY_MS,
        )?;
        Ok(TaskHandle::Timeout(id))
    }

    fn cancel(&self, handle: TaskHandle) {
        match handle {
            TaskHandle::Timeout(id) => self.timer.clear_timeout(id),
            TaskHandle::Idle(id) => {
                debug!(id, "fallback scheduler ignoring cancel of native idle handle");
            }
        }
    }
}
