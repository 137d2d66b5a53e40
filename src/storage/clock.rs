//! Wall-clock helpers.
//!
//! Deadlines are stored as absolute milliseconds since the UNIX epoch so a
//! snapshot can be inspected without knowing when the process started.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the UNIX epoch, saturating at zero for clocks set
/// before 1970.
#[inline]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Computes the deadline `ttl` after `now`.
#[inline]
pub fn deadline_after(now: u64, ttl: Duration) -> u64 {
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    now.saturating_add(ttl_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_monotonic_enough() {
        let a = now_millis();
        let b = now_millis();
        assert!(a > 0);
        assert!(b >= a);
    }

    #[test]
    fn test_deadline_saturates() {
        assert_eq!(deadline_after(100, Duration::from_millis(50)), 150);
        assert_eq!(deadline_after(u64::MAX - 1, Duration::from_secs(10)), u64::MAX);
        assert_eq!(deadline_after(5, Duration::MAX), u64::MAX);
    }
}
