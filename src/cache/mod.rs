//! Cache Module
//!
//! Lazily expiring values: a single TTL entry and a store of entries keyed by
//! caller-chosen keys.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::TtlEntry;
pub use stats::StoreStats;
pub use store::TtlStore;
