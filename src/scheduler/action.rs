//! Scheduled Action Module
//!
//! The handle returned for one pending callback.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::watch;

use crate::clock::Timestamp;
use crate::error::{Error, Result};
use crate::scheduler::action_scheduler::SchedulerInner;

/// Identifier of an action, unique within its scheduler.
pub type ActionId = u64;

/// Shared handle to a scheduled action.
pub type ActionHandle = Arc<ScheduledAction>;

// == Action Outcome ==
/// Terminal state of a scheduled action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Callback ran and returned `Ok`
    Fired,
    /// Callback returned an error or panicked
    Failed(String),
    /// Unscheduled before the callback started
    Cancelled,
}

// == Scheduled Action ==
/// One pending future callback.
///
/// Owned by the scheduler's active set; callers only get to read the target
/// time, cancel, and observe how the action ended.
pub struct ScheduledAction {
    id: ActionId,
    target_time: Timestamp,
    cancel: watch::Sender<bool>,
    outcome: watch::Sender<Option<ActionOutcome>>,
    /// Set once the callback has been handed to its task
    firing: AtomicBool,
    /// Back-reference for bookkeeping only
    scheduler: Weak<SchedulerInner>,
}

impl ScheduledAction {
    pub(crate) fn new(id: ActionId, target_time: Timestamp, scheduler: Weak<SchedulerInner>) -> Self {
        Self {
            id,
            target_time,
            cancel: watch::Sender::new(false),
            outcome: watch::Sender::new(None),
            firing: AtomicBool::new(false),
            scheduler,
        }
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    /// Absolute time at which the callback is due.
    pub fn target_time(&self) -> Timestamp {
        self.target_time
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Whether the callback has started; cancelling no longer stops it.
    pub fn is_firing(&self) -> bool {
        self.firing.load(Ordering::Acquire)
    }

    // == Unschedule ==
    /// Removes this action from its scheduler.
    ///
    /// Same as `ActionScheduler::unschedule(&handle)`; returns `false` once the
    /// action has fired, was already unscheduled, or its scheduler is gone.
    pub fn unschedule(&self) -> bool {
        self.scheduler
            .upgrade()
            .is_some_and(|scheduler| scheduler.unschedule(self))
    }

    // == Outcome ==
    /// Returns the terminal state, or `None` while still pending.
    pub fn outcome(&self) -> Option<ActionOutcome> {
        self.outcome.borrow().clone()
    }

    /// Waits until the action fires or is cancelled.
    ///
    /// # Errors
    /// - `Error::Cancelled` if the action was unscheduled first
    /// - `Error::CallbackFailed` if the callback returned an error or panicked
    pub async fn completion(&self) -> Result<()> {
        let mut outcome = self.outcome.subscribe();
        let outcome = outcome
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|slot| (*slot).clone());

        match outcome {
            Some(ActionOutcome::Fired) => Ok(()),
            Some(ActionOutcome::Failed(message)) => Err(Error::CallbackFailed(message)),
            Some(ActionOutcome::Cancelled) | None => Err(Error::Cancelled),
        }
    }

    pub(crate) fn belongs_to(&self, scheduler: &Arc<SchedulerInner>) -> bool {
        std::ptr::eq(self.scheduler.as_ptr(), Arc::as_ptr(scheduler))
    }

    pub(crate) fn cancel_signal(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }

    pub(crate) fn mark_firing(&self) {
        self.firing.store(true, Ordering::Release);
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Records the terminal state; only the first call has any effect.
    pub(crate) fn finish(&self, outcome: ActionOutcome) {
        self.outcome.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        });
    }
}

impl fmt::Debug for ScheduledAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledAction")
            .field("id", &self.id)
            .field("target_time", &self.target_time)
            .field("cancelled", &self.is_cancelled())
            .field("outcome", &self.outcome())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn detached_action() -> ScheduledAction {
        ScheduledAction::new(7, Utc::now(), Weak::new())
    }

    #[test]
    fn test_new_action_is_pending() {
        let action = detached_action();
        assert_eq!(action.id(), 7);
        assert!(!action.is_cancelled());
        assert!(!action.is_firing());
        assert_eq!(action.outcome(), None);
    }

    #[test]
    fn test_finish_keeps_first_outcome() {
        let action = detached_action();
        action.finish(ActionOutcome::Fired);
        action.finish(ActionOutcome::Cancelled);
        assert_eq!(action.outcome(), Some(ActionOutcome::Fired));
    }

    #[test]
    fn test_unschedule_without_scheduler() {
        let action = detached_action();
        assert!(!action.unschedule());
    }

    #[test]
    fn test_completion_resolves_on_finish() {
        let action = detached_action();
        let mut completion = task::spawn(action.completion());
        assert_pending!(completion.poll());

        action.finish(ActionOutcome::Failed("boom".to_string()));

        assert!(completion.is_woken());
        assert_ready_eq!(
            completion.poll(),
            Err(Error::CallbackFailed("boom".to_string()))
        );
    }

    #[test]
    fn test_outcome_serialize() {
        let json = serde_json::to_value(ActionOutcome::Failed("boom".to_string())).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");

        let json = serde_json::to_value(ActionOutcome::Fired).unwrap();
        assert_eq!(json["status"], "fired");
    }
}
