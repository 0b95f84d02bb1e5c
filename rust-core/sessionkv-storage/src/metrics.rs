// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics-collecting wrapper for sessionkv backends.
//
// Wraps any `KvBackend` and transparently counts issued commands, failures,
// latency sums and byte transfer totals. Besides feeding dashboards, the
// per-command counters let tests assert how many round trips a session
// operation costs.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use crate::backend::KvBackend;
use crate::error::StorageError;
use crate::events::{ConnectionEvent, ConnectionState};

/// Accumulated statistics for a backend.
///
/// All counters are monotonically increasing for the lifetime of the
/// [`MetricsBackend`] that owns them, until [`MetricsBackend::reset_stats`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendStats {
    /// Number of `GET` commands issued.
    pub get_count: u64,
    /// Number of plain `SET` commands issued.
    pub set_count: u64,
    /// Number of `SETEX` commands issued.
    pub set_ex_count: u64,
    /// Number of `DEL` commands issued.
    pub delete_count: u64,
    /// Number of `EXPIRE` commands issued.
    pub expire_count: u64,
    /// Number of commands that returned an error.
    pub error_count: u64,
    /// Cumulative wall-clock latency of all reads, in milliseconds.
    pub read_latency_sum_ms: f64,
    /// Cumulative wall-clock latency of all writes (`SET`/`SETEX`), in
    /// milliseconds.
    pub write_latency_sum_ms: f64,
    /// Total value bytes returned by `GET`.
    pub total_bytes_read: u64,
    /// Total value bytes accepted by `SET`/`SETEX`.
    pub total_bytes_written: u64,
}

impl BackendStats {
    /// Total number of commands issued, of any kind.
    pub fn total_commands(&self) -> u64 {
        self.get_count + self.set_count + self.set_ex_count + self.delete_count + self.expire_count
    }
}

/// A backend wrapper that collects command metrics.
///
/// Delegates every command to an inner backend while measuring wall-clock
/// latency and counting invocations. Statistics are available via
/// [`MetricsBackend::stats`].
///
/// # Example
///
/// ```rust
/// use sessionkv_storage::backend::KvBackend;
/// use sessionkv_storage::memory::InMemoryBackend;
/// use sessionkv_storage::metrics::MetricsBackend;
///
/// # tokio_test::block_on(async {
/// let metered = MetricsBackend::new(InMemoryBackend::new());
///
/// metered.set("key", b"value").await.unwrap();
/// metered.get("key").await.unwrap();
///
/// let stats = metered.stats().await;
/// assert_eq!(stats.set_count, 1);
/// assert_eq!(stats.get_count, 1);
/// # });
/// ```
pub struct MetricsBackend<B: KvBackend> {
    /// The wrapped backend that performs the actual commands.
    inner: B,
    /// Shared, mutable statistics accumulator.
    stats: Arc<RwLock<BackendStats>>,
}

impl<B: KvBackend> MetricsBackend<B> {
    /// Wrap `inner` with metrics collection.
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            stats: Arc::new(RwLock::new(BackendStats::default())),
        }
    }

    /// Return a snapshot of the current statistics.
    pub async fn stats(&self) -> BackendStats {
        self.stats.read().await.clone()
    }

    /// Reset all statistics to zero.
    pub async fn reset_stats(&self) {
        let mut s = self.stats.write().await;
        *s = BackendStats::default();
    }

    /// Return a reference to the inner backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    async fn record_write<T>(
        &self,
        start: Instant,
        result: &Result<T, StorageError>,
        bytes: usize,
    ) {
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let mut s = self.stats.write().await;
        s.write_latency_sum_ms += elapsed_ms;
        match result {
            Ok(_) => s.total_bytes_written += bytes as u64,
            Err(_) => s.error_count += 1,
        }
    }
}

#[async_trait]
impl<B: KvBackend> KvBackend for MetricsBackend<B> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let start = Instant::now();
        let result = self.inner.get(key).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut s = self.stats.write().await;
        s.get_count += 1;
        s.read_latency_sum_ms += elapsed_ms;
        match result {
            Ok(Some(ref val)) => s.total_bytes_read += val.len() as u64,
            Ok(None) => {}
            Err(_) => s.error_count += 1,
        }

        result
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.stats.write().await.set_count += 1;
        let start = Instant::now();
        let result = self.inner.set(key, value).await;
        self.record_write(start, &result, value.len()).await;
        result
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &[u8],
        ttl_secs: NonZeroU64,
    ) -> Result<(), StorageError> {
        self.stats.write().await.set_ex_count += 1;
        let start = Instant::now();
        let result = self.inner.set_ex(key, value, ttl_secs).await;
        self.record_write(start, &result, value.len()).await;
        result
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut s = self.stats.write().await;
        s.delete_count += 1;
        drop(s); // Release lock before the potentially slow operation.
        let result = self.inner.delete(key).await;
        if result.is_err() {
            self.stats.write().await.error_count += 1;
        }
        result
    }

    async fn expire(&self, key: &str, ttl_secs: NonZeroU64) -> Result<bool, StorageError> {
        let mut s = self.stats.write().await;
        s.expire_count += 1;
        drop(s);
        let result = self.inner.expire(key, ttl_secs).await;
        if result.is_err() {
            self.stats.write().await.error_count += 1;
        }
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.subscribe()
    }

    fn connection_state(&self) -> ConnectionState {
        self.inner.connection_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;

    fn secs(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_get_increments_count_and_bytes() {
        let metered = MetricsBackend::new(InMemoryBackend::new());

        metered.set("k", b"value").await.unwrap();
        metered.get("k").await.unwrap();
        metered.get("k").await.unwrap();
        metered.get("missing").await.unwrap();

        let stats = metered.stats().await;
        assert_eq!(stats.get_count, 3);
        assert_eq!(stats.set_count, 1);
        // Two hits of 5 bytes each; the miss contributes nothing.
        assert_eq!(stats.total_bytes_read, 10);
    }

    #[tokio::test]
    async fn test_writes_are_counted_by_kind() {
        let metered = MetricsBackend::new(InMemoryBackend::new());

        metered.set("a", b"hello").await.unwrap(); // 5 bytes
        metered.set_ex("b", b"world!", secs(30)).await.unwrap(); // 6 bytes

        let stats = metered.stats().await;
        assert_eq!(stats.set_count, 1);
        assert_eq!(stats.set_ex_count, 1);
        assert_eq!(stats.total_bytes_written, 11);
        assert_eq!(stats.total_commands(), 2);
    }

    #[tokio::test]
    async fn test_delete_and_expire_counts() {
        let metered = MetricsBackend::new(InMemoryBackend::new());

        metered.set("k", b"v").await.unwrap();
        assert!(metered.expire("k", secs(10)).await.unwrap());
        assert!(!metered.expire("nope", secs(10)).await.unwrap());
        metered.delete("k").await.unwrap();
        metered.delete("nope").await.unwrap();

        let stats = metered.stats().await;
        assert_eq!(stats.expire_count, 2);
        assert_eq!(stats.delete_count, 2);
        assert_eq!(stats.error_count, 0);
    }

    #[tokio::test]
    async fn test_errors_are_counted() {
        let inner = InMemoryBackend::new();
        let metered = MetricsBackend::new(inner.clone());
        inner.set_available(false);

        assert!(metered.get("k").await.is_err());
        assert!(metered.set("k", b"v").await.is_err());
        assert!(metered.delete("k").await.is_err());

        let stats = metered.stats().await;
        assert_eq!(stats.error_count, 3);
        assert_eq!(stats.total_bytes_written, 0);
    }

    #[tokio::test]
    async fn test_latency_is_recorded() {
        let metered = MetricsBackend::new(InMemoryBackend::new());

        metered.set("k", b"v").await.unwrap();
        metered.get("k").await.unwrap();

        let stats = metered.stats().await;
        // Latency should be non-negative (it might be very small).
        assert!(stats.read_latency_sum_ms >= 0.0);
        assert!(stats.write_latency_sum_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_reset_stats() {
        let metered = MetricsBackend::new(InMemoryBackend::new());

        metered.set("a", b"1").await.unwrap();
        metered.get("a").await.unwrap();
        assert_eq!(metered.stats().await.total_commands(), 2);

        metered.reset_stats().await;

        assert_eq!(metered.stats().await, BackendStats::default());
    }

    #[tokio::test]
    async fn test_name_and_events_delegate_to_inner() {
        let inner = InMemoryBackend::new();
        let metered = MetricsBackend::new(inner.clone());
        assert_eq!(metered.name(), "in-memory");

        let mut rx = metered.subscribe();
        inner.set_available(false);
        assert!(matches!(
            rx.recv().await.unwrap(),
            ConnectionEvent::Disconnected(_)
        ));
        assert!(!metered.connection_state().is_connected());
    }
}
