//! Cancelable timers for delayed and periodic work
//!
//! Apps routinely arm a delayed re-check ("wait 30 seconds, then alert if
//! still unoccupied") and cancel it when conditions change. A timer is a
//! spawned task; canceling aborts it.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Handle to a scheduled timer
#[derive(Debug)]
pub struct TimerHandle {
    handle: JoinHandle<()>,
}

impl TimerHandle {
    /// Cancel the timer; a no-op if it already fired
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the timer task has completed or been canceled
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Run a task once after a delay
pub fn run_in<F, Fut>(delay: Duration, task: F) -> TimerHandle
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    TimerHandle {
        handle: tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task().await;
        }),
    }
}

/// Run a task repeatedly, first firing after one interval
pub fn run_every<F, Fut>(interval: Duration, task: F) -> TimerHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    TimerHandle {
        handle: tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // interval ticks immediately; skip the zeroth tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                task().await;
            }
        }),
    }
}

/// A slot holding at most one pending timer
///
/// Arming the slot cancels whatever was pending. This is the
/// cancel-and-restart pattern every app timer uses.
#[derive(Debug, Default)]
pub struct TimerSlot {
    inner: Mutex<Option<TimerHandle>>,
}

impl TimerSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot, canceling any pending timer
    pub fn arm(&self, handle: TimerHandle) {
        let mut slot = self.inner.lock().unwrap();
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        *slot = Some(handle);
    }

    /// Cancel and clear any pending timer
    pub fn cancel(&self) {
        if let Some(handle) = self.inner.lock().unwrap().take() {
            handle.cancel();
        }
    }

    /// Whether a timer is pending (armed and not yet fired)
    pub fn is_armed(&self) -> bool {
        self.inner
            .lock()
            .unwrap()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}
