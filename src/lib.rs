//! # SnapKV - An In-Process Key-Value Store with TTL
//!
//! SnapKV is a thread-safe, in-memory key-value store for programs that want
//! fast concurrent reads and safe concurrent writes without running an
//! external cache service.
//!
//! ## Features
//!
//! - **Non-Blocking Reads**: readers work on immutable snapshots
//! - **No Lost Writes**: updates are published with a version check and
//!   retried when another writer got there first
//! - **TTL Support**: keys can have expiry times with background cleanup
//! - **Explicit Lifecycle**: [`Store::close`] stops the sweeper
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              SnapKV                                     │
//! │                                                                         │
//! │   get ─────────┐            ┌───────────────────────────────────────┐   │
//! │   put ─────────┤            │         AtomicCell<StoreState>        │   │
//! │   delete ──────┼──────────> │  ┌──────────────┐  ┌───────────────┐  │   │
//! │   expire ──────┤            │  │ data HashMap │  │ expirations   │  │   │
//! │   close ───────┘            │  │              │  │ (by deadline) │  │   │
//! │                             │  └──────────────┘  └───────────────┘  │   │
//! │                             └───────────────────────────────────────┘   │
//! │                                               ▲                         │
//! │                                               │                         │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │           ExpirySweeper                         │ │
//! │                     │      (Background Tokio Task)                    │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use snapkv::Store;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snapkv::StoreError> {
//!     // Keys expire after 2s unless told otherwise; sweep every second
//!     let store = Store::create(2000, 1000)?;
//!
//!     store.put("foo", 42)?;
//!     assert_eq!(store.get(&"foo"), Some(42));
//!
//!     // This one never expires
//!     store.put_with_ttl("bar", 7, None)?;
//!
//!     // Stop the sweeper and wait for it
//!     store.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: snapshot store, atomic cell and expiry sweeper
//! - [`config`]: store configuration
//! - [`error`]: error types
//!
//! ## Design Highlights
//!
//! ### Snapshot Updates
//!
//! The whole store state lives in one immutable snapshot. A write builds the
//! next snapshot from the current one and publishes it only if nobody else
//! published in between, otherwise it tries again. Readers never see a
//! half-applied write.
//!
//! ### Swept Expiry
//!
//! Reads don't check deadlines. A background task removes expired keys
//! once per sweep interval, so a key may remain readable for up to one
//! interval past its deadline.

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{StoreConfig, DEFAULT_SWEEP_INTERVAL};
pub use error::{Result, StoreError};
pub use storage::{AtomicCell, Store, StoreState, StoreStats, Ttl};

/// Version of SnapKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
