//! Scheduler Interface
//!
//! Object-safe scheduling port, so consumers can hold an
//! `Arc<dyn Scheduler>` and tests can swap in their own implementation.

use std::future::Future;
use std::pin::Pin;

use crate::clock::Timestamp;
use crate::scheduler::{ActionHandle, ActionScheduler, ScheduledAction};

/// Future produced by a boxed callback.
pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Type-erased callback accepted by [`Scheduler::schedule_boxed`].
pub type ActionCallback = Box<dyn FnOnce() -> ActionFuture + Send>;

/// Boxes a callback for use through `dyn Scheduler`.
pub fn boxed_callback<F, Fut>(callback: F) -> ActionCallback
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Box::new(move || Box::pin(callback()) as ActionFuture)
}

// == Scheduler ==
/// Schedules callbacks for later execution.
pub trait Scheduler: Send + Sync {
    /// Schedules `callback` for `time`; `None` if `time` is not in the future.
    fn schedule_boxed(&self, time: Timestamp, callback: ActionCallback) -> Option<ActionHandle>;

    /// Removes `action`, returning whether it was still pending.
    fn unschedule(&self, action: &ScheduledAction) -> bool;
}

impl Scheduler for ActionScheduler {
    fn schedule_boxed(&self, time: Timestamp, callback: ActionCallback) -> Option<ActionHandle> {
        self.schedule(time, callback)
    }

    fn unschedule(&self, action: &ScheduledAction) -> bool {
        ActionScheduler::unschedule(self, action)
    }
}
