// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core backend trait for sessionkv.
//
// Defines the `KvBackend` trait every key-value engine wrapper must satisfy.
// The command set is deliberately small: one read, two writes (with and
// without expiry), a delete and an expiry refresh. Backends are expected to
// be thread-safe (`Send + Sync`) and fully asynchronous, and to report
// connectivity changes through a broadcast channel.

use std::num::NonZeroU64;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::StorageError;
use crate::events::{ConnectionEvent, ConnectionState};

/// A key-value storage engine with per-key expiry.
///
/// Keys are UTF-8 strings; values are opaque byte strings. Each method maps
/// to exactly one command against the engine and must not retry on its own:
/// a failure is reported once, as a [`StorageError`].
///
/// Implementations must be safe to share across threads and tokio tasks.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// `GET key`.
    ///
    /// Returns `Ok(None)` if the key does not exist or has expired, rather
    /// than an error.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// `SET key value`.
    ///
    /// Overwrites any previous value and clears any expiry the key had.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// `SETEX key ttl value`: store a value that expires after `ttl_secs`.
    async fn set_ex(&self, key: &str, value: &[u8], ttl_secs: NonZeroU64)
        -> Result<(), StorageError>;

    /// `DEL key`.
    ///
    /// Returns `Ok(true)` if the key existed and was removed, `Ok(false)` if
    /// it was not present. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// `EXPIRE key ttl`: reset the expiry of an existing key without
    /// touching its value.
    ///
    /// Returns `Ok(false)` if the key does not exist.
    async fn expire(&self, key: &str, ttl_secs: NonZeroU64) -> Result<bool, StorageError>;

    /// A human-readable name for this backend, used in logging.
    fn name(&self) -> &str;

    /// Subscribe to connect/disconnect notifications.
    ///
    /// Only transitions that happen after the call are delivered; use
    /// [`KvBackend::connection_state`] for the current state.
    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent>;

    /// The most recently observed connection state.
    fn connection_state(&self) -> ConnectionState;
}
