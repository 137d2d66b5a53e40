//! Error Types
//!
//! The store has a deliberately narrow failure surface: there is no I/O,
//! no parsing and no capacity limit. The only errors are misuse of a
//! closed store and constructing a store without a runtime to host its
//! sweeper.

use thiserror::Error;

/// Errors returned by [`Store`](crate::storage::Store) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A write was attempted after the store was closed
    #[error("store is closed")]
    Closed,

    /// The store was constructed outside of a Tokio runtime
    #[error("no Tokio runtime available to run the expiry sweeper")]
    NoRuntime,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(StoreError::Closed.to_string(), "store is closed");
        assert!(StoreError::NoRuntime.to_string().contains("Tokio runtime"));
    }
}
