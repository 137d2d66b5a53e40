//! Snapshot Store with Expiry Support
//!
//! This module implements [`Store`], the public face of SnapKV. A store
//! owns one [`AtomicCell`] of [`StoreState`] snapshots and one background
//! expiry sweeper task bound to it.
//!
//! ## Concurrency Model
//!
//! ```text
//!   get ──────────> load() ──> Arc<StoreState> ──> lookup
//!
//!   put / delete ─┐
//!   expire        ├──> try_update(f) ──> publish new snapshot
//!   sweeper ──────┘        ▲        │
//!                          └─retry──┘  (another writer won the race)
//! ```
//!
//! Reads never wait on writers. Writes serialize through the cell's
//! version check, so no write is lost and none is ever partially visible.
//!
//! ## Closing
//!
//! [`Store::close`] stops the sweeper and rejects later writes with
//! [`StoreError::Closed`]. Reads keep working on the last snapshot. Dropping
//! every handle without closing also stops the sweeper, at its next wait.

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::storage::cell::AtomicCell;
use crate::storage::clock::{deadline_after, now_millis};
use crate::storage::expiry::{sweep, ExpirySweeper};
use crate::storage::state::{StoreState, Ttl};
use crate::storage::stats::{Counters, StoreStats};
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info};

struct StoreInner<K, V> {
    cell: Arc<AtomicCell<StoreState<K, V>>>,
    counters: Arc<Counters>,
    sweeper: ExpirySweeper,
    closed: AtomicBool,
    config: StoreConfig,
}

/// A thread-safe, in-process key-value store with per-key TTL.
///
/// Cloning a `Store` is cheap and yields another handle to the same store.
///
/// # Example
///
/// ```
/// use snapkv::Store;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), snapkv::StoreError> {
/// // Keys expire after 2s by default; sweep once a second
/// let store = Store::create(2000, 1000)?;
///
/// store.put("name", "alice")?;
/// assert_eq!(store.get(&"name"), Some("alice"));
///
/// store.delete(&"name")?;
/// assert_eq!(store.get(&"name"), None);
///
/// store.close();
/// # Ok(())
/// # }
/// ```
pub struct Store<K, V> {
    inner: Arc<StoreInner<K, V>>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> std::fmt::Debug for Store<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("version", &self.inner.cell.version())
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .field("config", &self.inner.config)
            .finish()
    }
}

impl<K, V> Store<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a store and starts its expiry sweeper.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRuntime`] when called outside of a Tokio
    /// runtime, since the sweeper needs one to run on.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| StoreError::NoRuntime)?;

        let cell = Arc::new(AtomicCell::new(StoreState::new(config.default_ttl)));
        let counters = Arc::new(Counters::default());
        let sweeper = ExpirySweeper::start(
            &runtime,
            Arc::clone(&cell),
            Arc::clone(&counters),
            config.sweep_interval,
        );

        info!(
            default_ttl_ms = config.default_ttl.map(|ttl| ttl.as_millis() as u64),
            sweep_interval_ms = config.sweep_interval.as_millis() as u64,
            "Store created"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                cell,
                counters,
                sweeper,
                closed: AtomicBool::new(false),
                config,
            }),
        })
    }

    /// Creates a store from raw millisecond settings.
    ///
    /// A `default_expiration_millis` of zero or below means keys only expire
    /// when given an explicit TTL. `expiration_interval_millis` sets the
    /// sweep cadence; non-positive values fall back to one second.
    pub fn create(default_expiration_millis: i64, expiration_interval_millis: i64) -> Result<Self> {
        Self::new(StoreConfig::from_millis(
            default_expiration_millis,
            expiration_interval_millis,
        ))
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key was never set, was deleted, or has been
    /// swept. Deadlines are not checked here: an expired key stays readable
    /// until the next sweep removes it.
    pub fn get(&self, key: &K) -> Option<V> {
        Counters::bump(&self.inner.counters.gets);
        self.inner.cell.load().get(key).cloned()
    }

    /// Sets a key-value pair using the store's default TTL.
    ///
    /// With a default TTL the key's deadline is reset to `now + ttl`.
    /// Without one, any deadline the key already had is left in place.
    pub fn put(&self, key: K, value: V) -> Result<()> {
        self.write(key, value, Ttl::Default)
    }

    /// Sets a key-value pair with an explicit TTL.
    ///
    /// `Some(ttl)` replaces any previous deadline with `now + ttl`. `None`
    /// (or a zero duration) means "no expiration" and clears any previous
    /// deadline.
    pub fn put_with_ttl(&self, key: K, value: V, ttl: Option<Duration>) -> Result<()> {
        self.write(key, value, Ttl::from(ttl))
    }

    fn write(&self, key: K, value: V, ttl: Ttl) -> Result<()> {
        let now = now_millis();
        self.inner.cell.try_update(|state| {
            if state.is_shutdown() {
                return Err(StoreError::Closed);
            }
            Ok((state.with_entry(key.clone(), value.clone(), ttl, now), ()))
        })?;
        Counters::bump(&self.inner.counters.puts);
        Ok(())
    }

    /// Deletes a key and its deadline.
    ///
    /// Deleting an absent key is not an error.
    ///
    /// # Returns
    ///
    /// Returns `true` if the key was deleted, `false` if it didn't exist.
    pub fn delete(&self, key: &K) -> Result<bool> {
        let existed = self.inner.cell.try_update(|state| {
            if state.is_shutdown() {
                return Err(StoreError::Closed);
            }
            Ok(state.without_key(key))
        })?;
        Counters::bump(&self.inner.counters.deletes);
        Ok(existed)
    }

    /// Sets a deadline of `now + ttl` on an existing key.
    ///
    /// # Returns
    ///
    /// Returns `true` if the key exists and the deadline was set.
    pub fn expire(&self, key: &K, ttl: Duration) -> Result<bool> {
        let deadline = deadline_after(now_millis(), ttl);
        self.inner.cell.try_update(|state| {
            if state.is_shutdown() {
                return Err(StoreError::Closed);
            }
            Ok(state.with_deadline(key, deadline))
        })
    }

    /// Removes the deadline from a key so it never expires.
    ///
    /// # Returns
    ///
    /// Returns `true` if a deadline was removed.
    pub fn persist(&self, key: &K) -> Result<bool> {
        self.inner.cell.try_update(|state| {
            if state.is_shutdown() {
                return Err(StoreError::Closed);
            }
            Ok(state.without_deadline(key))
        })
    }

    /// Returns the remaining TTL of a key.
    ///
    /// - `None`: the key does not exist
    /// - `Some(None)`: the key exists and never expires
    /// - `Some(Some(remaining))`: time left, zero once the deadline passed
    pub fn ttl(&self, key: &K) -> Option<Option<Duration>> {
        let state = self.inner.cell.load();
        if !state.contains_key(key) {
            return None;
        }
        let now = now_millis();
        Some(
            state
                .deadline(key)
                .map(|deadline| Duration::from_millis(deadline.saturating_sub(now))),
        )
    }

    /// Checks if a key exists.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.cell.load().contains_key(key)
    }

    /// Returns the number of keys in the store.
    pub fn len(&self) -> usize {
        self.inner.cell.load().len()
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current snapshot.
    ///
    /// The snapshot is immutable; later writes do not affect it.
    pub fn snapshot(&self) -> Arc<StoreState<K, V>> {
        self.inner.cell.load()
    }

    /// Runs one expiry sweep immediately.
    ///
    /// Returns the number of keys removed.
    pub fn cleanup_expired(&self) -> usize {
        let expired = sweep(&self.inner.cell, now_millis());
        if expired > 0 {
            Counters::add(&self.inner.counters.expired, expired as u64);
            Counters::bump(&self.inner.counters.sweeps);
        }
        expired
    }

    /// Returns the store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Returns statistics about the store.
    pub fn stats(&self) -> StoreStats {
        let state = self.inner.cell.load();
        let counters = &self.inner.counters;
        StoreStats {
            keys: state.len() as u64,
            tracked_expirations: state.expirations().len() as u64,
            gets: Counters::read(&counters.gets),
            puts: Counters::read(&counters.puts),
            deletes: Counters::read(&counters.deletes),
            expired: Counters::read(&counters.expired),
            sweeps: Counters::read(&counters.sweeps),
            update_retries: self.inner.cell.retries(),
            version: self.inner.cell.version(),
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Closes the store.
    ///
    /// The sweeper is signalled to stop at its next wait and later writes
    /// fail with [`StoreError::Closed`]. Reads are unaffected. Calling
    /// `close` again does nothing.
    pub fn close(&self) {
        if self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Store already closed");
            return;
        }

        self.inner.cell.update(|state| state.closed());
        self.inner.sweeper.stop();
        info!("Store closed");
    }

    /// Closes the store and waits for the sweeper task to finish.
    pub async fn shutdown(&self) {
        self.close();
        self.inner.sweeper.join().await;
    }
}
