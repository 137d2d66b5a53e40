//! Operation counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared between a store and its sweeper.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) gets: AtomicU64,
    pub(crate) puts: AtomicU64,
    pub(crate) deletes: AtomicU64,
    pub(crate) expired: AtomicU64,
    pub(crate) sweeps: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// A point-in-time view of a store's statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of keys currently stored
    pub keys: u64,
    /// Number of keys with a deadline
    pub tracked_expirations: u64,
    /// Total `get` calls
    pub gets: u64,
    /// Total successful `put` calls
    pub puts: u64,
    /// Total successful `delete` calls, including deletes of absent keys
    pub deletes: u64,
    /// Keys removed because their TTL elapsed
    pub expired: u64,
    /// Sweeps that removed at least one key
    pub sweeps: u64,
    /// Writes that were reapplied after losing a race
    pub update_retries: u64,
    /// Version of the current snapshot
    pub version: u64,
}
