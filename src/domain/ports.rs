//! Domain Ports (Port/Adapter Pattern)
//!
//! Core abstractions the failover engine depends on. Infrastructure
//! adapters implement these traits so the decision logic can be exercised
//! against in-memory doubles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Cache Core                              │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Ports (Traits)                      │    │
//! │  │  RemoteStore │ RemoteSession │ SharedState │ Events  │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │  MemcachedStore │ InMemorySharedState │ TracingSink  │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::Endpoint;
use crate::domain::events::CacheEvent;
use crate::error::Result;

// =============================================================================
// Value Objects
// =============================================================================

/// Which storage layer ultimately served an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Primary remote endpoint
    Primary,
    /// Backup remote endpoint
    Backup,
    /// Host-shared local fallback store
    LocalFallback,
    /// No layer served the operation
    None,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Primary => write!(f, "primary"),
            Tier::Backup => write!(f, "backup"),
            Tier::LocalFallback => write!(f, "local-fallback"),
            Tier::None => write!(f, "none"),
        }
    }
}

/// A value stored in shared local state: opaque bytes plus the caller's
/// flags bitfield, both returned verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedEntry {
    /// Opaque value bytes
    pub value: Bytes,
    /// Caller-defined flags, stored and returned verbatim
    pub flags: u32,
}

impl SharedEntry {
    /// Create an entry from anything convertible to bytes.
    pub fn new(value: impl Into<Bytes>, flags: u32) -> Self {
        Self {
            value: value.into(),
            flags,
        }
    }
}

// =============================================================================
// Remote Store Port
// =============================================================================

/// Port for opening sessions against a remote cache server.
///
/// One session is opened per attempt against a specific endpoint; the
/// executor never retries an endpoint within a single call.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Open a session to the given endpoint, bounded by `timeout`.
    ///
    /// Implementations return [`crate::Error::ConnectFailure`] when the
    /// session cannot be established within the timeout.
    async fn connect(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>>;
}

/// An established session against one remote endpoint.
///
/// Error convention: operations return [`crate::Error::NotFound`] for a
/// clean miss and [`crate::Error::OperationFailure`] for anything else, so
/// the executor can branch on kind without rewrapping.
#[async_trait]
pub trait RemoteSession: Send {
    /// Fetch a value and its flags.
    async fn get(&mut self, key: &str) -> Result<(Bytes, u32)>;

    /// Store a value with a TTL (zero = no expiry, at the server's
    /// discretion) and flags.
    async fn set(&mut self, key: &str, value: Bytes, ttl: Duration, flags: u32) -> Result<()>;

    /// Delete a key. Returns `NotFound` when the key was absent.
    async fn delete(&mut self, key: &str) -> Result<()>;

    /// Return the connection to a keepalive pool sized and timed by
    /// configuration. Best-effort: failures are logged, never surfaced.
    async fn release(self: Box<Self>, keepalive: Duration, pool_size: usize) -> Result<()>;
}

// =============================================================================
// Shared Process State Port
// =============================================================================

/// Port for the process/host-wide key/value region shared by all workers.
///
/// Used for two unrelated purposes, isolated by key namespace: the
/// primary-down-until marker, and fallback copies of cached values when no
/// remote tier is reachable. Created once at process start and passed in
/// explicitly, never a hidden global.
///
/// Access is expected to be short and non-blocking; implementations must be
/// safe under concurrent use from many request workers. Lost updates are
/// tolerated by design.
pub trait SharedState: Send + Sync {
    /// Read an entry, honoring expiry.
    fn get(&self, key: &str) -> Option<SharedEntry>;

    /// Write an entry with a TTL (zero = no expiry).
    fn set(&self, key: &str, entry: SharedEntry, ttl: Duration) -> Result<()>;

    /// Remove an entry. Removing an absent key is not an error.
    fn delete(&self, key: &str);
}

// =============================================================================
// Event Sink Port
// =============================================================================

/// Port for structured decision events.
///
/// The executor and facade emit events at well-defined decision points
/// (primary marked down, primary recovered, fallback write, remote total
/// failure) instead of sprinkling logging side calls through control flow.
/// Emission is infallible: an event sink must never influence the outcome
/// of a cache operation.
pub trait EventSink: Send + Sync {
    /// Emit one event.
    fn emit(&self, event: CacheEvent);
}

// =============================================================================
// Tests
// =============================================================================
