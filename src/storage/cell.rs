//! Atomic Snapshot Cell
//!
//! [`AtomicCell`] holds the current immutable snapshot of some state and
//! publishes replacements with an optimistic, version-checked protocol:
//!
//! ```text
//!   writer                              slot (RwLock)
//!   ──────                              ─────────────
//!   1. read (version, snapshot)  ────>  { version: 7, value: Arc<T> }
//!   2. next = f(&snapshot)              (no lock held)
//!   3. lock, version still 7?    ────>  { version: 8, value: Arc<next> }
//!      otherwise retry from 1.
//! ```
//!
//! Readers only ever clone the `Arc` out of the slot, so they wait at most
//! for a pointer swap, never for a writer's transformation. Because the
//! transformation may run several times under contention it must be pure.

use parking_lot::RwLock;
use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct Slot<T> {
    version: u64,
    value: Arc<T>,
}

/// A shared cell holding an immutable, versioned snapshot.
pub struct AtomicCell<T> {
    slot: RwLock<Slot<T>>,

    /// Number of times a transformation lost a race and was reapplied
    retries: AtomicU64,
}

impl<T: fmt::Debug> fmt::Debug for AtomicCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.read();
        f.debug_struct("AtomicCell")
            .field("version", &slot.version)
            .field("value", &slot.value)
            .field("retries", &self.retries.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T> AtomicCell<T> {
    /// Creates a cell holding `value` as version 0.
    pub fn new(value: T) -> Self {
        Self {
            slot: RwLock::new(Slot {
                version: 0,
                value: Arc::new(value),
            }),
            retries: AtomicU64::new(0),
        }
    }

    /// Returns the current snapshot.
    #[inline]
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.slot.read().value)
    }

    /// Returns the version of the current snapshot.
    ///
    /// The version increases by one on every published update.
    pub fn version(&self) -> u64 {
        self.slot.read().version
    }

    /// Returns how many transformations were reapplied after losing a race.
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    #[inline]
    fn load_versioned(&self) -> (u64, Arc<T>) {
        let slot = self.slot.read();
        (slot.version, Arc::clone(&slot.value))
    }

    /// Applies a fallible transformation to the current snapshot.
    ///
    /// On `Ok((next, out))` the new snapshot is published and `out` returned,
    /// provided no other writer published in the meantime; if one did, `f`
    /// is applied again to the newer snapshot. On `Err` nothing is published
    /// and the error is returned as is.
    pub fn try_update<R, E, F>(&self, mut f: F) -> Result<R, E>
    where
        F: FnMut(&T) -> Result<(T, R), E>,
    {
        loop {
            let (version, current) = self.load_versioned();
            let (next, out) = f(&current)?;
            drop(current);

            let mut slot = self.slot.write();
            if slot.version == version {
                slot.version = version.wrapping_add(1);
                let previous = std::mem::replace(&mut slot.value, Arc::new(next));
                drop(slot);
                // Release the old snapshot outside the lock.
                drop(previous);
                return Ok(out);
            }
            drop(slot);

            self.retries.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Applies a transformation that also yields a result.
    pub fn update_with<R, F>(&self, mut f: F) -> R
    where
        F: FnMut(&T) -> (T, R),
    {
        match self.try_update(|current| Ok::<_, Infallible>(f(current))) {
            Ok(out) => out,
            Err(never) => match never {},
        }
    }

    /// Replaces the snapshot with `f(current)`.
    pub fn update<F>(&self, mut f: F)
    where
        F: FnMut(&T) -> T,
    {
        self.update_with(|current| (f(current), ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_load_and_update() {
        let cell = AtomicCell::new(1u64);
        assert_eq!(*cell.load(), 1);
        assert_eq!(cell.version(), 0);

        cell.update(|n| n + 1);
        assert_eq!(*cell.load(), 2);
        assert_eq!(cell.version(), 1);
    }

    #[test]
    fn test_old_snapshot_is_unchanged() {
        let cell = AtomicCell::new(vec![1, 2, 3]);
        let before = cell.load();

        cell.update(|v| {
            let mut v = v.clone();
            v.push(4);
            v
        });

        assert_eq!(*before, vec![1, 2, 3]);
        assert_eq!(*cell.load(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_update_with_returns_value() {
        let cell = AtomicCell::new(10i32);
        let previous = cell.update_with(|n| (n * 2, *n));
        assert_eq!(previous, 10);
        assert_eq!(*cell.load(), 20);
    }

    #[test]
    fn test_try_update_error_publishes_nothing() {
        let cell = AtomicCell::new(5i32);
        let result: Result<(), &str> = cell.try_update(|_| Err("rejected"));
        assert_eq!(result, Err("rejected"));
        assert_eq!(*cell.load(), 5);
        assert_eq!(cell.version(), 0);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let cell = Arc::new(AtomicCell::new(0u64));
        let mut handles = vec![];

        for _ in 0..8 {
            let cell = Arc::clone(&cell);
            handles.push(thread::spawn(move || {
                for _ in 0..500 {
                    cell.update(|n| n + 1);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*cell.load(), 4000);
        assert_eq!(cell.version(), 4000);
    }
}
