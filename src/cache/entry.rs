//! TTL Entry Module
//!
//! A single cached value together with the moment it was last set and a
//! fixed expiry. Expiry is evaluated lazily on every read.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::clock::{Clock, SystemClock, Timestamp};

// == Slot ==
/// Contents of an entry: nothing yet, or a value with its write time.
#[derive(Debug, Clone)]
enum Slot<V> {
    Unset,
    Set { value: V, updated_at: Timestamp },
}

// == TTL Entry ==
/// A value that goes stale `expiry` after its most recent `set`.
///
/// An entry that has never been set is always expired.
pub struct TtlEntry<V> {
    slot: RwLock<Slot<V>>,
    expiry: Duration,
    clock: Arc<dyn Clock>,
}

impl<V> TtlEntry<V> {
    // == Constructors ==
    /// Creates an entry with an optional initial value.
    ///
    /// # Arguments
    /// * `value` - Initial value, `None` leaves the entry unset
    /// * `last_updated` - When the initial value was produced, usually now
    /// * `expiry` - How long a value stays fresh
    pub fn new(value: Option<V>, last_updated: Timestamp, expiry: Duration) -> Self {
        Self::new_with_clock(value, last_updated, expiry, Arc::new(SystemClock))
    }

    pub fn new_with_clock(
        value: Option<V>,
        last_updated: Timestamp,
        expiry: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let slot = match value {
            Some(value) => Slot::Set {
                value,
                updated_at: last_updated,
            },
            None => Slot::Unset,
        };

        Self {
            slot: RwLock::new(slot),
            expiry,
            clock,
        }
    }

    /// Creates an entry with no value. It reports expired until the first `set`.
    pub fn empty(expiry: Duration) -> Self {
        Self::empty_with_clock(expiry, Arc::new(SystemClock))
    }

    pub fn empty_with_clock(expiry: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: RwLock::new(Slot::Unset),
            expiry,
            clock,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry holds no usable value.
    ///
    /// Boundary condition: a value is still fresh when exactly `expiry` has
    /// elapsed; it expires once the elapsed time is strictly greater.
    pub fn is_expired(&self) -> bool {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        self.slot_expired(&slot)
    }

    // == Set ==
    /// Replaces the value and restarts the expiry window from now.
    pub fn set(&self, value: V) {
        let updated_at = self.clock.now();
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Slot::Set { value, updated_at };
    }

    // == Accessors ==
    /// Time of the most recent `set`, or `None` if never set.
    pub fn last_updated(&self) -> Option<Timestamp> {
        match &*self.slot.read().unwrap_or_else(PoisonError::into_inner) {
            Slot::Set { updated_at, .. } => Some(*updated_at),
            Slot::Unset => None,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    // == Time To Live ==
    /// Returns how long the current value stays fresh.
    ///
    /// # Returns
    /// - `None` if the entry is expired or unset
    /// - `Some(remaining)` otherwise, `Duration::ZERO` right at the boundary
    pub fn remaining(&self) -> Option<Duration> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        match &*slot {
            Slot::Set { updated_at, .. } if !self.slot_expired(&slot) => {
                Some(self.expiry.saturating_sub(self.elapsed_since(*updated_at)))
            }
            _ => None,
        }
    }

    fn slot_expired(&self, slot: &Slot<V>) -> bool {
        match slot {
            Slot::Unset => true,
            Slot::Set { updated_at, .. } => self.elapsed_since(*updated_at) > self.expiry,
        }
    }

    /// A clock that moved backwards counts as no time elapsed.
    fn elapsed_since(&self, updated_at: Timestamp) -> Duration {
        (self.clock.now() - updated_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl<V: Clone> TtlEntry<V> {
    // == Try Get ==
    /// Returns the value if it has not expired.
    ///
    /// Reading never changes the entry.
    pub fn try_get(&self) -> Option<V> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        if self.slot_expired(&slot) {
            return None;
        }
        match &*slot {
            Slot::Set { value, .. } => Some(value.clone()),
            Slot::Unset => None,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for TtlEntry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("TtlEntry")
            .field("slot", &*slot)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}
