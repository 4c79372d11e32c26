//! GateCache Failover Integration Tests
//!
//! End-to-end exercises of the tiered read/write/delete protocol against
//! controllable in-memory collaborators:
//! - backoff window behavior across operations
//! - fallback-store consultation and reconciliation
//! - idempotent delete and local-only mode

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use gatecache::adapters::{InMemoryRemoteStore, InMemorySharedState, RecordingEventSink};
use gatecache::{CacheConfig, Endpoint, SharedEntry, SharedState, TieredCache};

const PRIMARY: &str = "primary.internal:11211";
const BACKUP: &str = "backup.internal:11211";

struct Harness {
    store: Arc<InMemoryRemoteStore>,
    state: Arc<InMemorySharedState>,
    events: Arc<RecordingEventSink>,
    cache: TieredCache,
}

fn harness(config: CacheConfig) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let store = Arc::new(InMemoryRemoteStore::new());
    let state = Arc::new(InMemorySharedState::new());
    let events = Arc::new(RecordingEventSink::new());
    let cache =
        TieredCache::with_event_sink(config, store.clone(), state.clone(), events.clone());
    Harness {
        store,
        state,
        events,
        cache,
    }
}

fn both_servers(backoff: Duration) -> CacheConfig {
    let mut config = CacheConfig::with_servers(Some(PRIMARY), Some(BACKUP)).unwrap();
    config.primary_backoff = backoff;
    config
}

fn primary_endpoint() -> Endpoint {
    Endpoint::parse(PRIMARY).unwrap()
}

fn backup_endpoint() -> Endpoint {
    Endpoint::parse(BACKUP).unwrap()
}

// =============================================================================
// Backoff Window Behavior
// =============================================================================

mod backoff_tests {
    use super::*;

    #[tokio::test]
    async fn test_backoff_respects_window_across_operations() {
        let h = harness(both_servers(Duration::from_millis(300)));
        let primary = h.store.server(&primary_endpoint());
        primary.refuse_connections(true);

        // First call pays the connect failure and opens the window.
        h.cache.get("k").await;
        assert_eq!(primary.connect_attempts(), 1);

        // Within the window no operation may dial primary, whatever its kind.
        h.cache.get("k").await;
        h.cache
            .set("k", "v", Duration::from_secs(60), 0)
            .await
            .unwrap();
        h.cache.delete("k").await.unwrap();
        assert_eq!(primary.connect_attempts(), 1);

        // Once the window has elapsed primary is dialed again.
        tokio::time::sleep(Duration::from_millis(400)).await;
        h.cache.get("k").await;
        assert_eq!(primary.connect_attempts(), 2);
    }

    #[tokio::test]
    async fn test_backoff_clears_on_reachable_miss() {
        let h = harness(both_servers(Duration::from_millis(100)));
        let primary = h.store.server(&primary_endpoint());

        primary.refuse_connections(true);
        h.cache.get("k").await;
        assert_eq!(h.events.events_of_type("PrimaryMarkedDown").len(), 1);

        // Primary comes back; let the window lapse.
        primary.refuse_connections(false);
        tokio::time::sleep(Duration::from_millis(150)).await;

        // A single miss over a live connection clears the marker...
        assert_eq!(h.cache.get("missing").await, None);
        assert_eq!(h.events.events_of_type("PrimaryRecovered").len(), 1);

        // ...so the next call goes straight to primary without recovery
        // ceremony.
        h.cache.get("missing").await;
        assert_eq!(h.events.events_of_type("PrimaryRecovered").len(), 1);
        assert_eq!(primary.connect_attempts(), 3);
    }

    #[tokio::test]
    async fn test_backoff_survives_across_cache_instances() {
        // The marker lives in shared process state: a second facade over the
        // same state inherits the window.
        let config = both_servers(Duration::from_secs(30));
        let h = harness(config.clone());
        h.store
            .server(&primary_endpoint())
            .refuse_connections(true);
        h.cache.get("k").await;
        assert_eq!(h.store.server(&primary_endpoint()).connect_attempts(), 1);

        let second = TieredCache::with_event_sink(
            config,
            h.store.clone(),
            h.state.clone(),
            Arc::new(RecordingEventSink::new()),
        );
        second.get("k").await;
        assert_eq!(h.store.server(&primary_endpoint()).connect_attempts(), 1);
    }
}

// =============================================================================
// Read Path
// =============================================================================

mod read_path_tests {
    use super::*;

    #[tokio::test]
    async fn test_clean_miss_is_not_masked_by_fallback() {
        let h = harness(both_servers(Duration::from_secs(10)));

        // A fallback entry exists for the key...
        h.state
            .set(
                "memc_fallback/k",
                SharedEntry::new("stale", 1),
                Duration::ZERO,
            )
            .unwrap();

        // ...but primary is reachable and says not-found, which is final.
        assert_eq!(h.cache.get("k").await, None);
        assert!(h.events.events_of_type("FallbackServed").is_empty());
    }

    #[tokio::test]
    async fn test_backup_serves_when_primary_down() {
        let h = harness(both_servers(Duration::from_secs(10)));
        h.store
            .server(&primary_endpoint())
            .refuse_connections(true);
        h.store.server(&backup_endpoint()).insert(
            "crowdsec:captcha:k",
            Bytes::from_static(b"from-backup"),
            6,
        );

        let (value, flags) = h.cache.get("k").await.unwrap();
        assert_eq!(value.as_ref(), b"from-backup");
        assert_eq!(flags, 6);
    }

    #[tokio::test]
    async fn test_total_outage_serves_fallback() {
        let h = harness(both_servers(Duration::from_secs(10)));
        h.store
            .server(&primary_endpoint())
            .refuse_connections(true);
        h.store.server(&backup_endpoint()).refuse_connections(true);

        h.state
            .set(
                "memc_fallback/k",
                SharedEntry::new("local-copy", 8),
                Duration::ZERO,
            )
            .unwrap();

        let (value, flags) = h.cache.get("k").await.unwrap();
        assert_eq!(value.as_ref(), b"local-copy");
        assert_eq!(flags, 8);
        assert_eq!(h.events.events_of_type("FallbackServed").len(), 1);
    }
}

// =============================================================================
// Write Path Reconciliation
// =============================================================================

mod write_path_tests {
    use super::*;

    #[tokio::test]
    async fn test_fallback_reconciliation_full_cycle() {
        let h = harness(both_servers(Duration::from_millis(50)));
        let primary = h.store.server(&primary_endpoint());
        let backup = h.store.server(&backup_endpoint());

        // Total outage: the write lands in the local fallback store.
        primary.refuse_connections(true);
        backup.refuse_connections(true);
        h.cache
            .set("k", "v1", Duration::from_secs(60), 3)
            .await
            .unwrap();

        let (value, flags) = h.cache.get("k").await.unwrap();
        assert_eq!(value.as_ref(), b"v1");
        assert_eq!(flags, 3);

        // Remote recovers; a successful remote set must delete the local
        // copy.
        primary.refuse_connections(false);
        backup.refuse_connections(false);
        tokio::time::sleep(Duration::from_millis(80)).await;
        h.cache
            .set("k", "v2", Duration::from_secs(60), 3)
            .await
            .unwrap();
        assert!(primary.contains("crowdsec:captcha:k"));
        assert!(h.state.get("memc_fallback/k").is_none());

        // A later outage must not resurrect v1 from the fallback store.
        primary.refuse_connections(true);
        backup.refuse_connections(true);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(h.cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_fallback_entry_expires_with_caller_ttl() {
        let h = harness(both_servers(Duration::from_secs(10)));
        h.store
            .server(&primary_endpoint())
            .refuse_connections(true);
        h.store.server(&backup_endpoint()).refuse_connections(true);

        h.cache
            .set("k", "v", Duration::from_millis(60), 0)
            .await
            .unwrap();
        assert!(h.cache.get("k").await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_fallback_write_failure_surfaces_error() {
        // A shared-state backend that refuses writes: the one condition
        // that surfaces a true failure to the caller, and only for set.
        #[derive(Debug)]
        struct ReadOnlyState(InMemorySharedState);

        impl SharedState for ReadOnlyState {
            fn get(&self, key: &str) -> Option<SharedEntry> {
                self.0.get(key)
            }
            fn set(
                &self,
                _key: &str,
                _entry: SharedEntry,
                _ttl: Duration,
            ) -> gatecache::Result<()> {
                Err(gatecache::Error::SharedState("region full".to_string()))
            }
            fn delete(&self, key: &str) {
                self.0.delete(key)
            }
        }

        let config = both_servers(Duration::from_secs(10));
        let store = Arc::new(InMemoryRemoteStore::new());
        store
            .server(&primary_endpoint())
            .refuse_connections(true);
        store.server(&backup_endpoint()).refuse_connections(true);

        let cache = TieredCache::new(
            config,
            store.clone(),
            Arc::new(ReadOnlyState(InMemorySharedState::new())),
        );

        let err = cache
            .set("k", "v", Duration::from_secs(60), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, gatecache::Error::SharedState(_)));
    }
}

// =============================================================================
// Delete Semantics
// =============================================================================

mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_absent_everywhere_is_success() {
        let h = harness(both_servers(Duration::from_secs(10)));
        h.cache.delete("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_clears_both_remote_and_fallback() {
        let h = harness(both_servers(Duration::from_secs(10)));
        let primary = h.store.server(&primary_endpoint());
        primary.insert("crowdsec:captcha:k", Bytes::from_static(b"v"), 0);
        h.state
            .set(
                "memc_fallback/k",
                SharedEntry::new("v", 0),
                Duration::ZERO,
            )
            .unwrap();

        h.cache.delete("k").await.unwrap();

        assert!(!primary.contains("crowdsec:captcha:k"));
        assert!(h.state.get("memc_fallback/k").is_none());
        assert_eq!(h.cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_delete_during_outage_still_clears_fallback() {
        let h = harness(both_servers(Duration::from_secs(10)));
        h.store
            .server(&primary_endpoint())
            .refuse_connections(true);
        h.store.server(&backup_endpoint()).refuse_connections(true);

        h.cache
            .set("k", "v", Duration::from_secs(60), 0)
            .await
            .unwrap();
        assert!(h.cache.get("k").await.is_some());

        h.cache.delete("k").await.unwrap();
        assert_eq!(h.cache.get("k").await, None);
    }
}

// =============================================================================
// No-Servers Mode
// =============================================================================

mod no_servers_tests {
    use super::*;

    #[tokio::test]
    async fn test_all_operations_stay_local() {
        let h = harness(CacheConfig::default());

        h.cache
            .set("k", "v", Duration::from_secs(60), 9)
            .await
            .unwrap();
        let (value, flags) = h.cache.get("k").await.unwrap();
        assert_eq!(value.as_ref(), b"v");
        assert_eq!(flags, 9);

        h.cache.delete("k").await.unwrap();
        assert_eq!(h.cache.get("k").await, None);

        // Never a network attempt.
        assert_eq!(h.store.total_connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_local_write_uses_fallback_ttl() {
        let mut config = CacheConfig::default();
        config.fallback_ttl = Duration::from_millis(60);
        let h = harness(config);

        h.cache.set("k", "v", Duration::ZERO, 0).await.unwrap();
        assert!(h.cache.get("k").await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.cache.get("k").await, None);
    }
}
