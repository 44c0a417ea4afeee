//! Action Scheduler Module
//!
//! Runs callbacks at absolute times, however far away, and keeps the set of
//! actions that have neither fired nor been cancelled.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock, Timestamp};
use crate::config::Config;
use crate::scheduler::delay::{cancellable_sleep, WaitOutcome, MAX_CHUNK};
use crate::scheduler::stats::SchedulerCounters;
use crate::scheduler::{ActionHandle, ActionId, ActionOutcome, ScheduledAction, SchedulerStats};

// == Action Scheduler ==
/// Schedules asynchronous callbacks for future execution.
///
/// Every accepted action runs in its own Tokio task. Dropping the scheduler
/// cancels every action still pending.
#[derive(Debug)]
pub struct ActionScheduler {
    inner: Arc<SchedulerInner>,
}

/// State shared between the scheduler, its tasks, and the action handles.
pub(crate) struct SchedulerInner {
    /// Active set, guarded by a single lock
    active: Mutex<HashMap<ActionId, ActionHandle>>,
    next_id: AtomicU64,
    max_chunk: Duration,
    clock: Arc<dyn Clock>,
    counters: SchedulerCounters,
}

impl ActionScheduler {
    // == Constructors ==
    /// Creates a scheduler on the system clock with the default chunk bound.
    pub fn new() -> Self {
        Self::with_clock(MAX_CHUNK, Arc::new(SystemClock))
    }

    /// Creates a scheduler whose waits never exceed `max_chunk`.
    pub fn with_max_chunk(max_chunk: Duration) -> Self {
        Self::with_clock(max_chunk, Arc::new(SystemClock))
    }

    /// Creates a scheduler that reads "now" from `clock`.
    ///
    /// The clock decides whether a time is in the future and how long to
    /// wait; the wait itself runs on the Tokio timer.
    pub fn with_clock(max_chunk: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                active: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                max_chunk,
                clock,
                counters: SchedulerCounters::default(),
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_max_chunk(config.max_chunk())
    }

    // == Schedule ==
    /// Schedules `callback` to run at `time`.
    ///
    /// Returns `None`, creating no state, when `time` is not strictly in the
    /// future, or when called outside a Tokio runtime. A callback error is
    /// not retried; it becomes the action's [`ActionOutcome::Failed`] outcome.
    pub fn schedule<F, Fut>(&self, time: Timestamp, callback: F) -> Option<ActionHandle>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let inner = &self.inner;
        let now = inner.clock.now();
        let delay = match (time - now).to_std() {
            Ok(delay) if !delay.is_zero() => delay,
            _ => {
                inner.counters.record_refused();
                debug!(%time, %now, "refusing to schedule action in the past");
                return None;
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            inner.counters.record_refused();
            warn!(%time, "refusing to schedule action outside a Tokio runtime");
            return None;
        };

        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        let action = Arc::new(ScheduledAction::new(id, time, Arc::downgrade(inner)));
        {
            // the task claims under this lock, so it cannot see a missing entry
            let mut active = inner.lock_active();
            active.insert(id, action.clone());
            runtime.spawn(run_action(inner.clone(), action.clone(), delay, callback));
        }
        inner.counters.record_scheduled();
        debug!(
            action_id = id,
            %time,
            delay_ms = delay.as_millis() as u64,
            "action scheduled"
        );

        Some(action)
    }

    // == Unschedule ==
    /// Cancels `action` and removes it from the active set.
    ///
    /// Returns `true` only if the action was still active. Safe to call any
    /// number of times; a callback that has already started is not interrupted.
    pub fn unschedule(&self, action: &ScheduledAction) -> bool {
        self.inner.unschedule(action)
    }

    /// Whether `action` is still in this scheduler's active set.
    pub fn is_scheduled(&self, action: &ScheduledAction) -> bool {
        action.belongs_to(&self.inner) && self.inner.lock_active().contains_key(&action.id())
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock_active().len()
    }

    pub fn max_chunk(&self) -> Duration {
        self.inner.max_chunk
    }

    // == Stats ==
    pub fn stats(&self) -> SchedulerStats {
        self.inner.counters.snapshot(self.pending_count())
    }

    // == Shutdown ==
    /// Cancels every pending action and returns how many were cancelled.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<ActionHandle> = self.inner.lock_active().drain().map(|(_, a)| a).collect();
        for action in &drained {
            action.request_cancel();
            if !action.is_firing() {
                self.inner.counters.record_cancelled();
            }
        }
        if !drained.is_empty() {
            info!(cancelled = drained.len(), "scheduler shut down with pending actions");
        }
        drained.len()
    }
}

impl Default for ActionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ActionScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl SchedulerInner {
    fn lock_active(&self) -> MutexGuard<'_, HashMap<ActionId, ActionHandle>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn unschedule(self: &Arc<Self>, action: &ScheduledAction) -> bool {
        if !action.belongs_to(self) {
            return false;
        }
        action.request_cancel();

        let removed = self.lock_active().remove(&action.id()).is_some();
        if removed && action.is_firing() {
            // the running callback still settles as fired or failed
            debug!(action_id = action.id(), "action unscheduled while firing");
        } else if removed {
            self.counters.record_cancelled();
            debug!(action_id = action.id(), "action unscheduled");
        }
        removed
    }

    /// Marks the action as firing if it is still present and not cancelled.
    fn claim(&self, action: &ScheduledAction) -> bool {
        let active = self.lock_active();
        let claimed = active.contains_key(&action.id()) && !action.is_cancelled();
        if claimed {
            action.mark_firing();
        }
        claimed
    }

    /// Removes the action from the active set and records how it ended.
    fn retire(&self, action: &ScheduledAction, outcome: ActionOutcome) {
        self.lock_active().remove(&action.id());
        match &outcome {
            ActionOutcome::Fired => self.counters.record_fired(),
            ActionOutcome::Failed(_) => self.counters.record_failed(),
            ActionOutcome::Cancelled => {}
        }
        action.finish(outcome);
    }
}

impl std::fmt::Debug for SchedulerInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerInner")
            .field("pending", &self.lock_active().len())
            .field("max_chunk", &self.max_chunk)
            .finish_non_exhaustive()
    }
}

// == Action Task ==
/// Waits out the delay, fires the callback, and retires the action.
///
/// The callback runs in its own task so that retirement happens whether it
/// succeeds, fails, or panics.
async fn run_action<F, Fut>(
    inner: Arc<SchedulerInner>,
    action: ActionHandle,
    delay: Duration,
    callback: F,
) where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let action_id = action.id();
    let mut cancel = action.cancel_signal();

    let waited = cancellable_sleep(delay, inner.max_chunk, &mut cancel).await;
    if waited == WaitOutcome::Cancelled || !inner.claim(&action) {
        debug!(action_id, "scheduled action cancelled before firing");
        inner.retire(&action, ActionOutcome::Cancelled);
        return;
    }

    debug!(action_id, "firing scheduled action");
    let outcome = match tokio::spawn(async move { callback().await }).await {
        Ok(Ok(())) => ActionOutcome::Fired,
        Ok(Err(err)) => {
            warn!(action_id, error = %err, "scheduled action failed");
            ActionOutcome::Failed(format!("{err:#}"))
        }
        Err(join_err) => {
            warn!(action_id, error = %join_err, "scheduled action aborted");
            ActionOutcome::Failed(join_failure(join_err))
        }
    };

    inner.retire(&action, outcome);
}

/// Describes a callback task that did not return, keeping any panic message.
fn join_failure(join_err: JoinError) -> String {
    if !join_err.is_panic() {
        return join_err.to_string();
    }
    let payload = join_err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match message {
        Some(message) => format!("callback panicked: {message}"),
        None => "callback panicked".to_string(),
    }
}
