//! Scheduler Module
//!
//! Fires asynchronous callbacks at absolute times, splitting long waits into
//! bounded chunks.
//!
//! # Components
//! - Delay chunking: bounded waits that sum to the requested delay
//! - Scheduled actions: handles for pending callbacks
//! - Action scheduler: owns the active set and the per-action tasks
//! - Scheduler trait: object-safe port over the action scheduler

mod action;
mod action_scheduler;
mod delay;
mod interface;
mod stats;

#[cfg(test)]
mod property_tests;

pub use action::{ActionHandle, ActionId, ActionOutcome, ScheduledAction};
pub use action_scheduler::ActionScheduler;
pub use delay::{delay_chunks, extended_sleep, DelayChunks, MAX_CHUNK};
pub use interface::{boxed_callback, ActionCallback, ActionFuture, Scheduler};
pub use stats::SchedulerStats;
