//! Store Snapshots
//!
//! [`StoreState`] is one immutable, point-in-time value of the whole store:
//! the key/value map, the ordered expiration index, the default TTL and the
//! shutdown flag. Every write produces a new snapshot from the previous one;
//! published snapshots are never mutated.
//!
//! All collections are persistent (`im`): cloning a snapshot only bumps
//! reference counts, and an edit copies the O(log n) path it touches while
//! sharing the rest with the previous snapshot.
//!
//! ## Expiration Index
//!
//! ```text
//!   by_deadline (OrdMap, ascending)        deadlines (HashMap)
//!   ┌───────────────┬──────────────┐       ┌──────┬───────────────┐
//!   │ 1700000001000 │ {"a", "c"}   │       │ "a"  │ 1700000001000 │
//!   │ 1700000004500 │ {"b"}        │       │ "b"  │ 1700000004500 │
//!   └───────────────┴──────────────┘       │ "c"  │ 1700000001000 │
//!                                          └──────┴───────────────┘
//! ```
//!
//! The ordered side finds the earliest deadline in O(log n); the hashed
//! side lets a key's deadline be replaced or removed without a scan. Keys
//! only need `Hash + Eq`, never an ordering of their own.

use crate::storage::clock::deadline_after;
use im::{HashMap, HashSet, OrdMap};
use std::hash::Hash;
use std::time::Duration;

/// How a write should treat the key's expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Apply the store's default TTL. With no default, any deadline the key
    /// already has is left standing.
    Default,

    /// Explicitly no expiration; clears any previous deadline.
    Persist,

    /// Expire after the given duration. A zero duration behaves like
    /// [`Ttl::Persist`].
    After(Duration),
}

impl From<Option<Duration>> for Ttl {
    fn from(ttl: Option<Duration>) -> Self {
        match ttl {
            Some(ttl) if !ttl.is_zero() => Ttl::After(ttl),
            _ => Ttl::Persist,
        }
    }
}

/// Ordered mapping from key to absolute deadline (ms since the UNIX epoch).
#[derive(Clone)]
pub struct ExpirationIndex<K> {
    by_deadline: OrdMap<u64, HashSet<K>>,
    deadlines: HashMap<K, u64>,
}

impl<K: Hash + Eq + std::fmt::Debug> std::fmt::Debug for ExpirationIndex<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirationIndex")
            .field("by_deadline", &self.by_deadline)
            .field("deadlines", &self.deadlines)
            .finish()
    }
}

impl<K: Hash + Eq + Clone> Default for ExpirationIndex<K> {
    fn default() -> Self {
        Self {
            by_deadline: OrdMap::new(),
            deadlines: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> ExpirationIndex<K> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a deadline.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Returns `true` if no key has a deadline.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Returns the deadline of `key`, if it has one.
    pub fn deadline(&self, key: &K) -> Option<u64> {
        self.deadlines.get(key).copied()
    }

    /// Returns `true` if `key` has a deadline.
    pub fn contains(&self, key: &K) -> bool {
        self.deadlines.contains_key(key)
    }

    /// Returns the earliest deadline in the index.
    pub fn earliest(&self) -> Option<u64> {
        self.by_deadline.get_min().map(|(deadline, _)| *deadline)
    }

    /// Sets the deadline for `key`, replacing and returning any previous one.
    pub fn insert(&mut self, key: K, deadline: u64) -> Option<u64> {
        let previous = self.remove(&key);
        match self.by_deadline.get_mut(&deadline) {
            Some(bucket) => {
                bucket.insert(key.clone());
            }
            None => {
                self.by_deadline.insert(deadline, HashSet::unit(key.clone()));
            }
        }
        self.deadlines.insert(key, deadline);
        previous
    }

    /// Removes the deadline for `key`, returning it.
    pub fn remove(&mut self, key: &K) -> Option<u64> {
        let deadline = self.deadlines.remove(key)?;
        let now_empty = match self.by_deadline.get_mut(&deadline) {
            Some(bucket) => {
                bucket.remove(key);
                bucket.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.by_deadline.remove(&deadline);
        }
        Some(deadline)
    }

    /// Removes and returns every key whose deadline is `<= now`.
    ///
    /// Walks buckets in ascending order and stops at the first deadline in
    /// the future, so the cost is proportional to the expired keys only.
    pub fn pop_expired(&mut self, now: u64) -> Vec<K> {
        let mut expired = Vec::new();

        loop {
            let deadline = match self.by_deadline.get_min() {
                Some((deadline, _)) if *deadline <= now => *deadline,
                _ => break,
            };
            let Some(bucket) = self.by_deadline.remove(&deadline) else {
                break;
            };
            for key in bucket {
                self.deadlines.remove(&key);
                expired.push(key);
            }
        }

        expired
    }

    /// Iterates `(deadline, key)` pairs in ascending deadline order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &K)> {
        self.by_deadline
            .iter()
            .flat_map(|(deadline, keys)| keys.iter().map(move |key| (*deadline, key)))
    }
}

/// An immutable snapshot of the store's contents.
#[derive(Clone)]
pub struct StoreState<K, V> {
    data: HashMap<K, V>,
    expirations: ExpirationIndex<K>,
    default_ttl: Option<Duration>,
    shutdown: bool,
}

impl<K: Hash + Eq + std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for StoreState<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreState")
            .field("data", &self.data)
            .field("expirations", &self.expirations)
            .field("default_ttl", &self.default_ttl)
            .field("shutdown", &self.shutdown)
            .finish()
    }
}

impl<K, V> StoreState<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates an empty snapshot. A zero default TTL means "no expiration".
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            data: HashMap::new(),
            expirations: ExpirationIndex::new(),
            default_ttl: default_ttl.filter(|ttl| !ttl.is_zero()),
            shutdown: false,
        }
    }

    /// Returns the value stored at `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.data.get(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.contains_key(key)
    }

    /// Number of keys in the snapshot.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the snapshot holds no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The expiration index of this snapshot.
    pub fn expirations(&self) -> &ExpirationIndex<K> {
        &self.expirations
    }

    /// Returns the deadline of `key`, if it has one.
    pub fn deadline(&self, key: &K) -> Option<u64> {
        self.expirations.deadline(key)
    }

    /// The TTL applied to [`Ttl::Default`] writes.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Returns `true` once the store has been closed.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Iterates over all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.data.iter()
    }

    /// Returns a snapshot with `value` stored at `key`.
    pub fn with_entry(&self, key: K, value: V, ttl: Ttl, now: u64) -> Self {
        let mut next = self.clone();
        match ttl {
            Ttl::Default => {
                if let Some(ttl) = self.default_ttl {
                    next.expirations.insert(key.clone(), deadline_after(now, ttl));
                }
            }
            Ttl::Persist => {
                next.expirations.remove(&key);
            }
            Ttl::After(ttl) if ttl.is_zero() => {
                next.expirations.remove(&key);
            }
            Ttl::After(ttl) => {
                next.expirations.insert(key.clone(), deadline_after(now, ttl));
            }
        }
        next.data.insert(key, value);
        next
    }

    /// Returns a snapshot without `key`, and whether it was present.
    pub fn without_key(&self, key: &K) -> (Self, bool) {
        let mut next = self.clone();
        next.expirations.remove(key);
        let existed = next.data.remove(key).is_some();
        (next, existed)
    }

    /// Returns a snapshot where an existing `key` expires at `deadline`,
    /// and whether the key was present.
    pub fn with_deadline(&self, key: &K, deadline: u64) -> (Self, bool) {
        if !self.data.contains_key(key) {
            return (self.clone(), false);
        }
        let mut next = self.clone();
        next.expirations.insert(key.clone(), deadline);
        (next, true)
    }

    /// Returns a snapshot where `key` no longer expires, and whether a
    /// deadline was removed.
    pub fn without_deadline(&self, key: &K) -> (Self, bool) {
        let mut next = self.clone();
        let removed = next.expirations.remove(key).is_some();
        (next, removed)
    }

    /// Returns `true` if at least one deadline is `<= now`.
    #[inline]
    pub fn has_expired(&self, now: u64) -> bool {
        self.expirations
            .earliest()
            .is_some_and(|deadline| deadline <= now)
    }

    /// Returns a snapshot with every key whose deadline is `<= now` removed
    /// from both the data and the expiration index, plus the number removed.
    pub fn remove_expired(&self, now: u64) -> (Self, usize) {
        let mut next = self.clone();
        let expired = next.expirations.pop_expired(now);
        for key in &expired {
            next.data.remove(key);
        }
        (next, expired.len())
    }

    /// Returns a snapshot flagged as shut down.
    pub fn closed(&self) -> Self {
        let mut next = self.clone();
        next.shutdown = true;
        next
    }
}
