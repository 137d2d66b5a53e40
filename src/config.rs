//! Store Configuration
//!
//! A store takes exactly two knobs: the TTL applied to writes that don't
//! name one, and how often the background sweeper looks for expired keys.
//! The sweep interval controls cadence only; a key may stay readable for up
//! to one interval past its deadline.

use std::time::Duration;
use tracing::warn;

/// Sweep interval used when none (or a non-positive one) is configured.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for a [`Store`](crate::storage::Store).
///
/// # Example
///
/// ```
/// use snapkv::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_default_ttl(Duration::from_secs(30))
///     .with_sweep_interval(Duration::from_millis(500));
///
/// assert_eq!(config.default_ttl, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// TTL applied by `put` (default: none, keys never expire)
    pub default_ttl: Option<Duration>,

    /// Interval between expiry sweeps (default: 1s)
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from raw millisecond values.
    ///
    /// A `default_expiration_millis` of zero or below disables the default
    /// TTL. A non-positive `expiration_interval_millis` falls back to
    /// [`DEFAULT_SWEEP_INTERVAL`].
    pub fn from_millis(default_expiration_millis: i64, expiration_interval_millis: i64) -> Self {
        let default_ttl = positive_millis(default_expiration_millis);
        let sweep_interval = match positive_millis(expiration_interval_millis) {
            Some(interval) => interval,
            None => {
                warn!(
                    interval_ms = expiration_interval_millis,
                    fallback_ms = DEFAULT_SWEEP_INTERVAL.as_millis() as u64,
                    "Non-positive sweep interval, using default"
                );
                DEFAULT_SWEEP_INTERVAL
            }
        };

        Self {
            default_ttl,
            sweep_interval,
        }
    }

    /// Sets the TTL applied to writes without an explicit one.
    ///
    /// A zero duration disables the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = (!ttl.is_zero()).then_some(ttl);
        self
    }

    /// Sets the interval between expiry sweeps.
    ///
    /// A zero duration is replaced by [`DEFAULT_SWEEP_INTERVAL`].
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = if interval.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            interval
        };
        self
    }
}

fn positive_millis(millis: i64) -> Option<Duration> {
    u64::try_from(millis)
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.default_ttl, None);
        assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
    }

    #[test]
    fn test_from_millis() {
        let config = StoreConfig::from_millis(2000, 1000);
        assert_eq!(config.default_ttl, Some(Duration::from_millis(2000)));
        assert_eq!(config.sweep_interval, Duration::from_millis(1000));
    }

    #[test]
    fn test_from_millis_disables_ttl() {
        assert_eq!(StoreConfig::from_millis(0, 1000).default_ttl, None);
        assert_eq!(StoreConfig::from_millis(-5, 1000).default_ttl, None);
    }

    #[test]
    fn test_from_millis_bad_interval() {
        assert_eq!(
            StoreConfig::from_millis(0, 0).sweep_interval,
            DEFAULT_SWEEP_INTERVAL
        );
        assert_eq!(
            StoreConfig::from_millis(0, -10).sweep_interval,
            DEFAULT_SWEEP_INTERVAL
        );
    }

    #[test]
    fn test_builder_chaining() {
        let config = StoreConfig::new()
            .with_default_ttl(Duration::from_secs(5))
            .with_sweep_interval(Duration::from_millis(250));
        assert_eq!(config.default_ttl, Some(Duration::from_secs(5)));
        assert_eq!(config.sweep_interval, Duration::from_millis(250));

        let config = config
            .with_default_ttl(Duration::ZERO)
            .with_sweep_interval(Duration::ZERO);
        assert_eq!(config.default_ttl, None);
        assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
    }
}
