//! Public Cache Facade
//!
//! The get/set/delete surface callers use. Delegates tier selection to the
//! [`TieredExecutor`] and reconciles the local fallback store around it:
//! fallback copies are populated only when no remote tier is reachable and
//! removed the moment a remote write succeeds, so a stale local copy can
//! never mask a recovered remote store.
//!
//! The overriding contract is fail-open: remote-cache unavailability must
//! never fail the caller's request. Reads degrade to absent, writes degrade
//! to the local store, and the only error a caller can see from `set` is
//! the local store itself refusing the fallback write.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::adapters::TracingEventSink;
use crate::config::CacheConfig;
use crate::domain::events::CacheEvent;
use crate::domain::ports::{EventSink, RemoteStore, SharedEntry, SharedState, Tier};
use crate::error::{Error, Result};
use crate::executor::{RemoteOp, RemoteOutcome, RemoteReply, TieredExecutor};

/// Client-side tiered cache with primary/backup failover and local
/// fallback.
///
/// One instance fronts one logical remote cache; all concurrent request
/// workers on a host share the same [`SharedState`] handle so backoff
/// decisions and fallback entries are visible host-wide.
pub struct TieredCache {
    config: Arc<CacheConfig>,
    executor: TieredExecutor,
    state: Arc<dyn SharedState>,
    events: Arc<dyn EventSink>,
}

impl TieredCache {
    /// Create a cache with the default tracing event sink.
    pub fn new(
        config: CacheConfig,
        store: Arc<dyn RemoteStore>,
        state: Arc<dyn SharedState>,
    ) -> Self {
        Self::with_event_sink(config, store, state, Arc::new(TracingEventSink::new()))
    }

    /// Create a cache with a custom event sink.
    pub fn with_event_sink(
        config: CacheConfig,
        store: Arc<dyn RemoteStore>,
        state: Arc<dyn SharedState>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        if !config.has_remote() {
            warn!("no remote cache servers configured, operating on the local fallback store only");
        }

        let config = Arc::new(config);
        let executor = TieredExecutor::new(
            config.clone(),
            store,
            state.clone(),
            events.clone(),
        );
        Self {
            config,
            executor,
            state,
            events,
        }
    }

    /// Fetch a value and its flags.
    ///
    /// A clean remote miss is authoritative and returns `None` even when a
    /// fallback copy exists. The fallback store is consulted only when no
    /// remote tier could be reached at all. Remote operation errors degrade
    /// to `None`: a cache miss is always safe for the gate this cache
    /// serves.
    pub async fn get(&self, key: &str) -> Option<(Bytes, u32)> {
        let remote_key = self.config.remote_key(key);
        match self.executor.run(RemoteOp::Get { key: &remote_key }).await {
            RemoteOutcome::Served {
                reply: RemoteReply::Value { value, flags },
                ..
            } => Some((value, flags)),
            RemoteOutcome::Served {
                reply: RemoteReply::Done,
                ..
            }
            | RemoteOutcome::Miss { .. } => None,
            RemoteOutcome::Failed { tier, error } => {
                debug!(%key, %tier, %error, "remote get failed, treating as miss");
                None
            }
            RemoteOutcome::Unreachable { .. } => self.read_fallback(key),
        }
    }

    /// Store a value with a TTL (zero = no expiry) and flags.
    ///
    /// On remote success the fallback copy is deleted so it cannot
    /// resurface after a later outage. When no remote tier is reachable the
    /// value is written to the local fallback store instead, with the
    /// caller's TTL if positive or the configured fallback TTL otherwise;
    /// only a failure of that local write surfaces as an error.
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Bytes>,
        ttl: Duration,
        flags: u32,
    ) -> Result<()> {
        let value = value.into();
        let remote_key = self.config.remote_key(key);
        let outcome = self
            .executor
            .run(RemoteOp::Set {
                key: &remote_key,
                value: value.clone(),
                ttl,
                flags,
            })
            .await;

        match outcome {
            RemoteOutcome::Served { .. } | RemoteOutcome::Miss { .. } => {
                // Remote tier is authoritative now; a stale local copy must
                // not resurface during a later outage.
                self.state.delete(&self.config.fallback_key(key));
                Ok(())
            }
            RemoteOutcome::Failed { error, .. } => Err(error),
            RemoteOutcome::Unreachable { error } => self.write_fallback(key, value, ttl, flags, &error),
        }
    }

    /// Delete a key. Idempotent: a key absent from every tier is a
    /// successful delete.
    ///
    /// The fallback copy is removed unconditionally, even when the remote
    /// path failed or was never populated; leaving stale fallback data
    /// behind is never acceptable and the extra delete is cheap.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let remote_key = self.config.remote_key(key);
        let outcome = self.executor.run(RemoteOp::Delete { key: &remote_key }).await;

        self.state.delete(&self.config.fallback_key(key));

        match outcome {
            RemoteOutcome::Served { .. } | RemoteOutcome::Miss { .. } => Ok(()),
            // No remote tier reachable: the local copy is gone, which is
            // all a degraded delete can promise.
            RemoteOutcome::Unreachable { .. } => Ok(()),
            RemoteOutcome::Failed { error, .. } => Err(error),
        }
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn read_fallback(&self, key: &str) -> Option<(Bytes, u32)> {
        let fallback_key = self.config.fallback_key(key);
        match self.state.get(&fallback_key) {
            Some(entry) => {
                debug!(%key, tier = %Tier::LocalFallback, "serving read from local fallback store");
                self.events.emit(CacheEvent::fallback_served(key));
                Some((entry.value, entry.flags))
            }
            None => None,
        }
    }

    fn write_fallback(
        &self,
        key: &str,
        value: Bytes,
        ttl: Duration,
        flags: u32,
        remote_error: &Error,
    ) -> Result<()> {
        let ttl = if ttl > Duration::ZERO {
            ttl
        } else {
            self.config.fallback_ttl
        };
        let fallback_key = self.config.fallback_key(key);

        warn!(%key, error = %remote_error, "remote cache unreachable, writing local fallback");
        self.events.emit(CacheEvent::fallback_write(key, ttl));

        self.state
            .set(&fallback_key, SharedEntry::new(value, flags), ttl)
    }
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("primary", &self.config.primary)
            .field("backup", &self.config.backup)
            .field("key_prefix", &self.config.key_prefix)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
