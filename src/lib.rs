//! Timekeep - temporal state primitives
//!
//! Provides an action scheduler that fires callbacks at arbitrarily distant
//! absolute times, and TTL entries and stores whose values expire lazily.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod scheduler;

pub use cache::{StoreStats, TtlEntry, TtlStore};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::Config;
pub use error::{Error, Result};
pub use scheduler::{
    ActionHandle, ActionOutcome, ActionScheduler, ScheduledAction, Scheduler, SchedulerStats,
};
