//! TTL Store Module
//!
//! Concurrent key to entry mapping. Every access vivifies the key, and every
//! entry shares the store's expiry.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::trace;

use crate::cache::stats::StoreCounters;
use crate::cache::{StoreStats, TtlEntry};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{Error, Result};

// == TTL Store ==
/// Key-value store whose values lazily expire.
///
/// There is no eviction: reading an unknown key inserts a permanent, expired
/// entry for it, so callers must bound the key space themselves.
pub struct TtlStore<K, V>
where
    K: Eq + Hash,
{
    /// Key to entry storage
    entries: DashMap<K, Arc<TtlEntry<V>>>,
    /// Expiry given to every entry created by this store
    expiry: Duration,
    clock: Arc<dyn Clock>,
    counters: StoreCounters,
}

impl<K, V> TtlStore<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty store using the system clock.
    ///
    /// # Arguments
    /// * `expiry` - Lifespan of every value set through this store
    pub fn new(expiry: Duration) -> Self {
        Self::with_clock(expiry, Arc::new(SystemClock))
    }

    pub fn with_clock(expiry: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            expiry,
            clock,
            counters: StoreCounters::default(),
        }
    }

    /// Creates an empty store with the configured default expiry.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_expiry())
    }

    // == Get Or Create ==
    /// Returns the entry for `key`, inserting an empty one on first reference.
    ///
    /// The lookup and insertion happen under the same shard lock, so
    /// concurrent callers asking for the same unseen key share one entry.
    pub fn get_or_create(&self, key: K) -> Arc<TtlEntry<V>> {
        self.entries
            .entry(key)
            .or_insert_with(|| Arc::new(TtlEntry::empty_with_clock(self.expiry, self.clock.clone())))
            .value()
            .clone()
    }

    // == Set ==
    /// Stores a value, restarting the key's expiry window.
    pub fn set_value(&self, key: K, value: V) {
        trace!(?key, "ttl store set");
        self.get_or_create(key).set(value);
    }

    // == Get ==
    /// Returns the fresh value for `key`, or `None` on a miss or expiry.
    pub fn get_value(&self, key: &K) -> Option<V> {
        self.try_get_value(key).ok()
    }

    // == Try Get ==
    /// Returns the fresh value for `key`.
    ///
    /// # Errors
    /// `Error::Expired` if the key was never set or its value is stale.
    pub fn try_get_value(&self, key: &K) -> Result<V> {
        match self.get_or_create(key.clone()).try_get() {
            Some(value) => {
                self.counters.record_hit();
                Ok(value)
            }
            None => {
                self.counters.record_miss();
                trace!(?key, "ttl store miss");
                Err(Error::Expired(format!("{key:?}")))
            }
        }
    }

    // == Stats ==
    /// Returns current store statistics.
    pub fn stats(&self) -> StoreStats {
        self.counters.snapshot(self.entries.len())
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    // == Length ==
    /// Returns the number of keys ever referenced.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> fmt::Debug for TtlStore<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlStore")
            .field("entries", &self.entries.len())
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}
