//! Storage Engine Module
//!
//! This module provides the core storage functionality for SnapKV: an
//! immutable-snapshot key-value store with TTL support and a background
//! expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                               │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │ AtomicCell<StoreState>                                │  │
//! │  │   version ──> Arc { data, expirations, default_ttl }  │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ remove_expired
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Snapshots**: readers clone an `Arc` and never wait on writers
//! - **Optimistic Updates**: writers retry against the newest snapshot
//! - **TTL Support**: keys can carry an absolute deadline
//! - **Active Expiry**: the sweeper removes expired keys every interval
//!
//! ## Example
//!
//! ```
//! use snapkv::storage::Store;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), snapkv::StoreError> {
//! let store = Store::create(0, 1000)?;
//!
//! store.put("name", "alice")?;
//! assert_eq!(store.get(&"name"), Some("alice"));
//!
//! // Set with TTL
//! store.put_with_ttl("session", "token123", Some(Duration::from_secs(3600)))?;
//!
//! store.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod cell;
pub mod clock;
pub mod engine;
pub(crate) mod expiry;
pub mod state;
pub mod stats;

// Re-export commonly used types
pub use cell::AtomicCell;
pub use engine::Store;
pub use state::{ExpirationIndex, StoreState, Ttl};
pub use stats::StoreStats;
