// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sessionkv Storage Backend Abstraction
//
// This crate defines the expiring key-value contract the session adapter
// runs against. The `KvBackend` trait mirrors the small command set a
// Redis-style store exposes (GET, SET, SETEX, DEL, EXPIRE) so that a real
// client can be wrapped without the adapter knowing which engine sits
// underneath.
//
// # Modules
//
// - [`backend`] -- The `KvBackend` trait defining the command set.
// - [`error`] -- The `StorageError` enum covering backend failure modes.
// - [`events`] -- Connection state tracking and connect/disconnect events.
// - [`memory`] -- An in-memory backend with real per-key expiry, for tests
//   and single-process deployments.
// - [`metrics`] -- A transparent wrapper that counts issued commands.
//
// # Example
//
// ```rust
// use std::num::NonZeroU64;
// use sessionkv_storage::backend::KvBackend;
// use sessionkv_storage::memory::InMemoryBackend;
// use sessionkv_storage::metrics::MetricsBackend;
//
// # tokio_test::block_on(async {
// let metered = MetricsBackend::new(InMemoryBackend::new());
//
// let ttl = NonZeroU64::new(60).unwrap();
// metered.set_ex("sess:abc", b"{}", ttl).await.unwrap();
// assert_eq!(metered.get("sess:abc").await.unwrap(), Some(b"{}".to_vec()));
//
// let stats = metered.stats().await;
// assert_eq!(stats.set_ex_count, 1);
// assert_eq!(stats.get_count, 1);
// # });
// ```

pub mod backend;
pub mod error;
pub mod events;
pub mod memory;
pub mod metrics;

// Re-export the most commonly used types at the crate root for convenience.
pub use backend::KvBackend;
pub use error::StorageError;
pub use events::{ConnectionEvent, ConnectionMonitor, ConnectionState};
pub use memory::InMemoryBackend;
pub use metrics::{BackendStats, MetricsBackend};
