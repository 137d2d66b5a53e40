//! Background Expiry Sweeper
//!
//! Reads never check deadlines themselves; a key stays visible until a sweep
//! removes it. This module runs those sweeps on a Tokio task, one per store.
//!
//! ## Design
//!
//! The sweeper loops over a two-way race:
//! 1. The sweep interval elapses: run one [`sweep`] and wait again
//! 2. The shutdown channel changes: stop if the store was closed (or every
//!    sender is gone), otherwise treat it as a spurious wakeup
//!
//! A sweep is a single update through the store's [`AtomicCell`], so it
//! is atomic relative to concurrent writes and is never interrupted halfway.

use crate::storage::cell::AtomicCell;
use crate::storage::clock::now_millis;
use crate::storage::state::StoreState;
use crate::storage::stats::Counters;
use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Removes every key of `cell` whose deadline is `<= now`.
///
/// Returns the number of keys removed. Nothing is published when no key
/// has expired.
pub(crate) fn sweep<K, V>(cell: &AtomicCell<StoreState<K, V>>, now: u64) -> usize
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    cell.try_update(|state| {
        if state.has_expired(now) {
            Ok(state.remove_expired(now))
        } else {
            Err(())
        }
    })
    .unwrap_or(0)
}

/// Handle to a store's running sweeper task.
#[derive(Debug)]
pub(crate) struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,

    task: Mutex<Option<JoinHandle<()>>>,
}

impl ExpirySweeper {
    /// Spawns the sweeper for `cell` onto `runtime`.
    pub(crate) fn start<K, V>(
        runtime: &Handle,
        cell: Arc<AtomicCell<StoreState<K, V>>>,
        counters: Arc<Counters>,
        interval: Duration,
    ) -> Self
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = runtime.spawn(sweeper_loop(cell, counters, interval, shutdown_rx));

        info!(
            interval_ms = interval.as_millis() as u64,
            "Background expiry sweeper started"
        );

        Self {
            shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Signals the sweeper to stop at its next wait. Never blocks.
    pub(crate) fn stop(&self) {
        // send_replace succeeds even if the task already exited
        self.shutdown_tx.send_replace(true);
        info!("Background expiry sweeper stop requested");
    }

    /// Waits for the sweeper task to finish. Returns immediately if it was
    /// already awaited.
    pub(crate) async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Expiry sweeper task failed");
            }
        }
    }
}

/// The main sweeper loop.
async fn sweeper_loop<K, V>(
    cell: Arc<AtomicCell<StoreState<K, V>>>,
    counters: Arc<Counters>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    K: Hash + Eq + Clone,
    V: Clone,
{
    loop {
        // Wait for the interval or shutdown signal
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    break;
                }
                continue;
            }
        }

        let expired = sweep(&cell, now_millis());

        if expired > 0 {
            Counters::add(&counters.expired, expired as u64);
            Counters::bump(&counters.sweeps);
            debug!(
                expired = expired,
                keys_remaining = cell.load().len(),
                "Expired keys cleaned up"
            );
        } else {
            trace!("Sweep found no expired keys");
        }
    }

    info!("Background expiry sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::state::Ttl;

    fn tracked_cell() -> Arc<AtomicCell<StoreState<String, &'static str>>> {
        Arc::new(AtomicCell::new(StoreState::new(None)))
    }

    /// Log sink shared between a test and its subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_sweep_without_expired_publishes_nothing() {
        let cell = tracked_cell();
        cell.update(|s| {
            s.with_entry("a".into(), "v", Ttl::After(Duration::from_secs(60)), 1_000)
        });
        let version = cell.version();

        assert_eq!(sweep(&cell, 2_000), 0);
        assert_eq!(cell.version(), version);
    }

    #[test]
    fn test_sweep_removes_expired() {
        let cell = tracked_cell();
        cell.update(|s| {
            s.with_entry("a".into(), "v", Ttl::After(Duration::from_millis(10)), 1_000)
        });
        cell.update(|s| s.with_entry("b".into(), "v", Ttl::Persist, 1_000));

        assert_eq!(sweep(&cell, 1_010), 1);
        let state = cell.load();
        assert!(state.get(&"a".to_string()).is_none());
        assert_eq!(state.get(&"b".to_string()), Some(&"v"));
    }

    #[tokio::test]
    async fn test_sweeper_cleans_expired_keys() {
        let cell = tracked_cell();
        let counters = Arc::new(Counters::default());
        let now = now_millis();

        for i in 0..10 {
            cell.update(|s| {
                s.with_entry(
                    format!("key{}", i),
                    "value",
                    Ttl::After(Duration::from_millis(50)),
                    now,
                )
            });
        }
        cell.update(|s| s.with_entry("persistent".into(), "value", Ttl::Persist, now));
        assert_eq!(cell.load().len(), 11);

        let sweeper = ExpirySweeper::start(
            &Handle::current(),
            Arc::clone(&cell),
            Arc::clone(&counters),
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cell.load().len(), 1);
        assert!(cell.load().contains_key(&"persistent".to_string()));
        assert_eq!(Counters::read(&counters.expired), 10);

        sweeper.stop();
        sweeper.join().await;
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_signal() {
        let cell = tracked_cell();
        let sweeper = ExpirySweeper::start(
            &Handle::current(),
            Arc::clone(&cell),
            Arc::new(Counters::default()),
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        sweeper.stop();
        sweeper.join().await;

        // Keys added after stop are never swept
        let now = now_millis();
        cell.update(|s| {
            s.with_entry("key".into(), "value", Ttl::After(Duration::from_millis(10)), now)
        });
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cell.load().contains_key(&"key".to_string()));
    }

    #[tokio::test]
    async fn test_stopped_is_logged_only_once_the_loop_exits() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        // Current-thread runtime: the sweeper task logs on this thread
        let _guard = tracing::subscriber::set_default(subscriber);

        let sweeper = ExpirySweeper::start(
            &Handle::current(),
            tracked_cell(),
            Arc::new(Counters::default()),
            Duration::from_secs(3600),
        );

        sweeper.stop();
        let before_join = logs.contents();
        assert!(before_join.contains("Background expiry sweeper stop requested"));
        assert!(!before_join.contains("Background expiry sweeper stopped"));

        sweeper.join().await;
        assert!(logs.contents().contains("Background expiry sweeper stopped"));
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_sender_dropped() {
        let cell = tracked_cell();
        let sweeper = ExpirySweeper::start(
            &Handle::current(),
            Arc::clone(&cell),
            Arc::new(Counters::default()),
            Duration::from_secs(3600),
        );

        let task = sweeper.task.lock().take().unwrap();
        drop(sweeper);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("sweeper should exit once its sender is gone")
            .unwrap();
    }
}
