// SPDX-License-Identifier: PMPL-1.0-or-later
//! Contract tests for `KvBackend` implementations
//!
//! The same scenarios run against the bare in-memory backend and against it
//! wrapped in `MetricsBackend`, which must be transparent.

use std::num::NonZeroU64;
use std::time::Duration;

use sessionkv_storage::{ConnectionEvent, InMemoryBackend, KvBackend, MetricsBackend};

fn secs(n: u64) -> NonZeroU64 {
    NonZeroU64::new(n).unwrap()
}

async fn check_missing_keys<B: KvBackend>(backend: &B) {
    assert_eq!(backend.get("absent").await.unwrap(), None);
    assert!(!backend.delete("absent").await.unwrap());
    assert!(!backend.expire("absent", secs(10)).await.unwrap());
}

async fn check_overwrite<B: KvBackend>(backend: &B) {
    backend.set_ex("k", b"first", secs(60)).await.unwrap();
    backend.set_ex("k", b"second", secs(60)).await.unwrap();
    assert_eq!(backend.get("k").await.unwrap(), Some(b"second".to_vec()));
    assert!(backend.delete("k").await.unwrap());
    assert_eq!(backend.get("k").await.unwrap(), None);
}

async fn check_expiry<B: KvBackend>(backend: &B) {
    backend.set_ex("short", b"v", secs(5)).await.unwrap();
    backend.set("forever", b"v").await.unwrap();

    tokio::time::advance(Duration::from_secs(4)).await;
    assert!(backend.expire("short", secs(5)).await.unwrap());

    tokio::time::advance(Duration::from_secs(4)).await;
    assert!(backend.get("short").await.unwrap().is_some());

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(backend.get("short").await.unwrap(), None);
    assert!(!backend.expire("short", secs(5)).await.unwrap());
    assert!(backend.get("forever").await.unwrap().is_some());
}

#[tokio::test]
async fn test_missing_keys() {
    check_missing_keys(&InMemoryBackend::new()).await;
    check_missing_keys(&MetricsBackend::new(InMemoryBackend::new())).await;
}

#[tokio::test]
async fn test_overwrite_and_delete() {
    check_overwrite(&InMemoryBackend::new()).await;
    check_overwrite(&MetricsBackend::new(InMemoryBackend::new())).await;
}

#[tokio::test(start_paused = true)]
async fn test_expiry_and_refresh() {
    check_expiry(&InMemoryBackend::new()).await;
    check_expiry(&MetricsBackend::new(InMemoryBackend::new())).await;
}

#[tokio::test(start_paused = true)]
async fn test_set_clears_previous_expiry() {
    let backend = InMemoryBackend::new();
    backend.set_ex("k", b"v", secs(2)).await.unwrap();
    backend.set("k", b"v").await.unwrap();

    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(backend.is_persistent("k").await);
    assert_eq!(backend.remaining_ttl("k").await, None);
}

#[tokio::test]
async fn test_metrics_wrapper_forwards_connection_events() {
    let backend = InMemoryBackend::new();
    let metered = MetricsBackend::new(backend.clone());
    let mut events = metered.subscribe();

    backend.set_available(false);
    assert!(matches!(
        events.recv().await.unwrap(),
        ConnectionEvent::Disconnected(_)
    ));
    assert!(metered.get("k").await.unwrap_err().to_string().contains("offline"));
    assert!(!metered.connection_state().is_connected());

    // Repeated outages are one transition.
    backend.set_available(false);
    backend.set_available(true);
    assert!(matches!(events.recv().await.unwrap(), ConnectionEvent::Connected));
    assert!(events.try_recv().is_err());

    let stats = metered.stats().await;
    assert_eq!(stats.get_count, 1);
    assert_eq!(stats.error_count, 1);
}
