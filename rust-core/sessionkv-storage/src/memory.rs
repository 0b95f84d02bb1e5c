// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory expiring backend for sessionkv.
//
// Uses a `BTreeMap` wrapped in a tokio `RwLock` and stores an optional
// deadline next to each value. Expired entries are invisible to every command;
// a write replaces its own key and every `SWEEP_INTERVAL`th write sweeps the
// rest of the map. Deadlines use `tokio::time::Instant`, so
// tests can drive expiry with `tokio::time::pause` / `advance`.

use std::collections::BTreeMap;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tokio::time::Instant;

use crate::backend::KvBackend;
use crate::error::StorageError;
use crate::events::{ConnectionEvent, ConnectionMonitor, ConnectionState};

/// Number of writes between sweeps of expired entries.
const SWEEP_INTERVAL: u64 = 1024;

/// A stored value and its optional expiry deadline.
#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }
}

/// An in-memory backend with per-key expiry.
///
/// All data lives in process memory and is lost on drop. Clones share the
/// same map, availability flag and connection monitor, which makes it easy to
/// point several session stores at "the same server" in tests.
///
/// # Example
///
/// ```rust
/// use sessionkv_storage::backend::KvBackend;
/// use sessionkv_storage::memory::InMemoryBackend;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryBackend::new();
/// store.set("hello", b"world").await.unwrap();
/// assert_eq!(store.get("hello").await.unwrap(), Some(b"world".to_vec()));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    /// The underlying sorted map, protected by a read-write lock.
    data: Arc<RwLock<BTreeMap<String, Entry>>>,
    /// When false every command fails with `BackendUnavailable`.
    available: Arc<AtomicBool>,
    /// Writes since creation, for scheduling sweeps.
    writes: Arc<AtomicU64>,
    monitor: Arc<ConnectionMonitor>,
}

impl InMemoryBackend {
    /// Create a new, empty, reachable in-memory backend.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            available: Arc::new(AtomicBool::new(true)),
            writes: Arc::new(AtomicU64::new(0)),
            monitor: Arc::new(ConnectionMonitor::new(
                "in-memory",
                ConnectionState::Connected,
            )),
        }
    }

    /// Return the number of live (unexpired) keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let map = self.data.read().await;
        map.values().filter(|entry| entry.is_live(now)).count()
    }

    /// Return true if the store holds no live keys.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remaining time before `key` expires.
    ///
    /// Returns `None` if the key is missing, expired, or has no expiry.
    pub async fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let map = self.data.read().await;
        let entry = map.get(key).filter(|entry| entry.is_live(now))?;
        entry.expires_at.map(|deadline| deadline - now)
    }

    /// True if `key` holds a live value with no expiry.
    pub async fn is_persistent(&self, key: &str) -> bool {
        let now = Instant::now();
        let map = self.data.read().await;
        map.get(key)
            .map_or(false, |entry| entry.is_live(now) && entry.expires_at.is_none())
    }

    /// Simulate the server going away (`false`) or coming back (`true`).
    ///
    /// While unavailable every command fails with
    /// [`StorageError::BackendUnavailable`]. Transitions are published through
    /// the connection monitor.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        if available {
            self.monitor.mark_connected();
        } else {
            self.monitor.mark_disconnected(StorageError::BackendUnavailable(
                "in-memory backend taken offline".to_string(),
            ));
        }
    }

    fn ensure_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::BackendUnavailable(
                "in-memory backend is offline".to_string(),
            ))
        }
    }

    /// Number of stored entries, expired ones included.
    pub async fn stored_entries(&self) -> usize {
        self.data.read().await.len()
    }

    async fn insert(&self, key: &str, value: &[u8], expires_at: Option<Instant>) {
        let sweep = (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0;
        let mut map = self.data.write().await;
        if sweep {
            let now = Instant::now();
            map.retain(|_, entry| entry.is_live(now));
        }
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
    }
}

/// The instant `ttl_secs` after `now`, rejecting TTLs the clock cannot
/// represent the way Redis answers "invalid expire time".
fn deadline_after(now: Instant, ttl_secs: NonZeroU64) -> Result<Instant, StorageError> {
    now.checked_add(Duration::from_secs(ttl_secs.get()))
        .ok_or_else(|| {
            StorageError::Protocol(format!("invalid expire time in SETEX/EXPIRE: {ttl_secs}"))
        })
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.ensure_available()?;
        let now = Instant::now();
        let map = self.data.read().await;
        Ok(map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.ensure_available()?;
        self.insert(key, value, None).await;
        Ok(())
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &[u8],
        ttl_secs: NonZeroU64,
    ) -> Result<(), StorageError> {
        self.ensure_available()?;
        let deadline = deadline_after(Instant::now(), ttl_secs)?;
        self.insert(key, value, Some(deadline)).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.ensure_available()?;
        let now = Instant::now();
        let mut map = self.data.write().await;
        Ok(map.remove(key).map_or(false, |entry| entry.is_live(now)))
    }

    async fn expire(&self, key: &str, ttl_secs: NonZeroU64) -> Result<bool, StorageError> {
        self.ensure_available()?;
        let now = Instant::now();
        let mut map = self.data.write().await;
        match map.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = Some(deadline_after(now, ttl_secs)?);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "in-memory"
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.monitor.subscribe()
    }

    fn connection_state(&self) -> ConnectionState {
        self.monitor.state()
    }
}
