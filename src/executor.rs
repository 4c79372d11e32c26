//! Tiered Operation Executor
//!
//! Drives the primary → backup decision tree shared by get, set, and
//! delete. The executor owns all backoff bookkeeping; callers only see
//! which tier answered and with what.
//!
//! # Decision tree
//!
//! ```text
//! primary configured and eligible?
//!   ├─ connect ok ──→ clear backoff, run op, release session, done
//!   └─ connect fail ─→ mark primary down ─┐
//! primary backed off / not configured ────┤
//!                                         ▼
//! backup configured?
//!   ├─ connect ok ──→ run op, release session, done
//!   └─ connect fail ─→ remote unavailable
//! no backup ─────────→ remote unavailable (no servers at all: reported
//!                      without any network attempt)
//! ```
//!
//! Two asymmetries are load-bearing:
//! - Only a *connect* failure to primary triggers backoff and a backup
//!   attempt. A reachable-but-erroring primary ends the call: it is no
//!   evidence backup would do better, and a second attempt doubles latency
//!   on a path budgeted in tens of milliseconds.
//! - Backup failures never touch the backoff tracker; the backoff window is
//!   a primary-only optimization.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::backoff::BackoffTracker;
use crate::config::{CacheConfig, Endpoint};
use crate::domain::events::CacheEvent;
use crate::domain::ports::{EventSink, RemoteSession, RemoteStore, SharedState, Tier};
use crate::error::Error;

/// One remote operation, shaped for the shared decision tree.
#[derive(Debug)]
pub enum RemoteOp<'a> {
    /// Fetch a value and flags.
    Get { key: &'a str },
    /// Store a value with TTL and flags.
    Set {
        key: &'a str,
        value: Bytes,
        ttl: Duration,
        flags: u32,
    },
    /// Delete a key (idempotent: not-found counts as success).
    Delete { key: &'a str },
}

impl RemoteOp<'_> {
    /// Operation name for logs and events.
    pub fn name(&self) -> &'static str {
        match self {
            RemoteOp::Get { .. } => "get",
            RemoteOp::Set { .. } => "set",
            RemoteOp::Delete { .. } => "delete",
        }
    }
}

/// What a remote tier answered.
#[derive(Debug)]
pub enum RemoteReply {
    /// A value with its flags (get).
    Value { value: Bytes, flags: u32 },
    /// The operation completed with nothing to return (set, delete).
    Done,
}

/// Aggregate outcome of one pass through the decision tree.
#[derive(Debug)]
pub enum RemoteOutcome {
    /// A remote tier served the operation.
    Served { tier: Tier, reply: RemoteReply },
    /// A remote tier answered with an authoritative "not found" (get only;
    /// delete maps not-found to `Served`).
    Miss { tier: Tier },
    /// A tier was reached but the operation failed. Terminal for the call:
    /// no further tier is attempted.
    Failed { tier: Tier, error: Error },
    /// No remote tier could be reached. The caller may consult the local
    /// fallback store.
    Unreachable { error: Error },
}

/// Executes one operation against the remote tiers, recording and clearing
/// primary failure state as it goes.
pub struct TieredExecutor {
    config: Arc<CacheConfig>,
    store: Arc<dyn RemoteStore>,
    backoff: BackoffTracker,
    events: Arc<dyn EventSink>,
}

impl TieredExecutor {
    /// Create an executor. The backoff tracker lives in the given shared
    /// state under the configured marker key.
    pub fn new(
        config: Arc<CacheConfig>,
        store: Arc<dyn RemoteStore>,
        state: Arc<dyn SharedState>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let backoff = BackoffTracker::new(
            state,
            config.down_marker_key.clone(),
            config.primary_backoff,
        );
        Self {
            config,
            store,
            backoff,
            events,
        }
    }

    /// Access to the backoff tracker (shared with tests and diagnostics).
    pub fn backoff(&self) -> &BackoffTracker {
        &self.backoff
    }

    /// Run one operation through the primary → backup decision tree.
    pub async fn run(&self, op: RemoteOp<'_>) -> RemoteOutcome {
        let now = Utc::now();

        if let Some(primary) = &self.config.primary {
            if self.backoff.is_primary_eligible(now) {
                match self.store.connect(primary, self.config.timeout).await {
                    Ok(session) => {
                        self.note_primary_alive(primary);
                        return self.operate(session, primary, Tier::Primary, op).await;
                    }
                    Err(e) => {
                        let down_until = self.backoff.mark_down(now);
                        warn!(
                            endpoint = %primary,
                            error = %e,
                            down_until = %down_until,
                            "primary connect failed, backing off"
                        );
                        self.events
                            .emit(CacheEvent::primary_marked_down(primary.to_string(), down_until));
                    }
                }
            } else {
                debug!(endpoint = %primary, "primary in backoff window, skipping");
            }
        }

        if let Some(backup) = &self.config.backup {
            match self.store.connect(backup, self.config.timeout).await {
                Ok(session) => return self.operate(session, backup, Tier::Backup, op).await,
                Err(e) => {
                    warn!(endpoint = %backup, error = %e, "backup connect failed");
                    self.events
                        .emit(CacheEvent::remote_unavailable(op.name(), e.to_string()));
                    return RemoteOutcome::Unreachable {
                        error: Error::RemoteUnavailable {
                            cause: e.to_string(),
                        },
                    };
                }
            }
        }

        if self.config.primary.is_none() {
            // Nothing configured at all: report without touching the network.
            debug!(op = op.name(), tier = %Tier::None, "no remote servers configured");
            self.events
                .emit(CacheEvent::no_servers_configured(op.name()));
            return RemoteOutcome::Unreachable {
                error: Error::NoServersConfigured,
            };
        }

        // Primary-only deployment with primary down or backed off.
        let cause = "primary unreachable and no backup configured".to_string();
        self.events
            .emit(CacheEvent::remote_unavailable(op.name(), cause.clone()));
        RemoteOutcome::Unreachable {
            error: Error::RemoteUnavailable { cause },
        }
    }

    /// Run the operation on an established session and return the session
    /// to the keepalive pool.
    async fn operate(
        &self,
        mut session: Box<dyn RemoteSession>,
        endpoint: &Endpoint,
        tier: Tier,
        op: RemoteOp<'_>,
    ) -> RemoteOutcome {
        let op_name = op.name();
        let absent_is_success = matches!(op, RemoteOp::Delete { .. });
        let result = match op {
            RemoteOp::Get { key } => session
                .get(key)
                .await
                .map(|(value, flags)| RemoteReply::Value { value, flags }),
            RemoteOp::Set {
                key,
                value,
                ttl,
                flags,
            } => session
                .set(key, value, ttl, flags)
                .await
                .map(|_| RemoteReply::Done),
            RemoteOp::Delete { key } => session.delete(key).await.map(|_| RemoteReply::Done),
        };

        if let Err(e) = session
            .release(self.config.keepalive, self.config.pool_size)
            .await
        {
            debug!(endpoint = %endpoint, error = %e, "failed to return session to keepalive pool");
        }

        match result {
            Ok(reply) => RemoteOutcome::Served { tier, reply },
            // Idempotent delete: a missing key is a completed delete.
            Err(e) if e.is_not_found() && absent_is_success => RemoteOutcome::Served {
                tier,
                reply: RemoteReply::Done,
            },
            Err(e) if e.is_not_found() => RemoteOutcome::Miss { tier },
            Err(e) => {
                warn!(endpoint = %endpoint, op = op_name, error = %e, "remote operation failed");
                RemoteOutcome::Failed { tier, error: e }
            }
        }
    }

    /// A live session to primary is proof of health: drop any down marker.
    fn note_primary_alive(&self, endpoint: &Endpoint) {
        if self.backoff.is_marked() {
            self.backoff.clear();
            info!(endpoint = %endpoint, "primary reachable again, clearing backoff");
            self.events
                .emit(CacheEvent::primary_recovered(endpoint.to_string()));
        }
    }
}

impl std::fmt::Debug for TieredExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredExecutor")
            .field("primary", &self.config.primary)
            .field("backup", &self.config.backup)
            .field("timeout", &self.config.timeout)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
