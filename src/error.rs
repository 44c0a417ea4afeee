//! Error types for the scheduler and TTL cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Timekeep Error Enum ==
/// Unified error type for the crate.
///
/// Refusing to schedule a past time and unscheduling a retired action are not
/// errors; they are reported through `None` and `false` respectively.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Key was never set or its value has outlived the store expiry
    #[error("Key expired: {0}")]
    Expired(String),

    /// Scheduled action was unscheduled before it fired
    #[error("Action cancelled")]
    Cancelled,

    /// Scheduled callback returned an error or panicked
    #[error("Callback failed: {0}")]
    CallbackFailed(String),

    /// Configuration value rejected
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;
