//! Cache Decision Events
//!
//! Immutable records of the failover engine's significant decisions. Each
//! event corresponds to one well-defined decision point; the executor and
//! facade emit them through the [`EventSink`](super::ports::EventSink) port
//! instead of embedding logging side calls in control flow.
//!
//! # Example
//!
//! ```ignore
//! let event = CacheEvent::fallback_write("captcha_1.2.3.4", Duration::from_secs(120));
//! sink.emit(event);
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A significant decision made by the failover engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CacheEvent {
    /// A connect attempt to primary failed; primary is skipped until
    /// `down_until`.
    PrimaryMarkedDown {
        endpoint: String,
        down_until: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// A live session to primary was established while a down marker was
    /// present; the marker was cleared.
    PrimaryRecovered {
        endpoint: String,
        timestamp: DateTime<Utc>,
    },

    /// No remote tier could be reached for an operation.
    RemoteUnavailable {
        operation: String,
        cause: String,
        timestamp: DateTime<Utc>,
    },

    /// A value was written to the local fallback store because no remote
    /// tier accepted the write.
    FallbackWrite {
        key: String,
        ttl_seconds: u64,
        timestamp: DateTime<Utc>,
    },

    /// A read was served from the local fallback store.
    FallbackServed {
        key: String,
        timestamp: DateTime<Utc>,
    },

    /// An operation ran with no remote endpoints configured at all.
    NoServersConfigured {
        operation: String,
        timestamp: DateTime<Utc>,
    },
}

impl CacheEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CacheEvent::PrimaryMarkedDown { timestamp, .. } => *timestamp,
            CacheEvent::PrimaryRecovered { timestamp, .. } => *timestamp,
            CacheEvent::RemoteUnavailable { timestamp, .. } => *timestamp,
            CacheEvent::FallbackWrite { timestamp, .. } => *timestamp,
            CacheEvent::FallbackServed { timestamp, .. } => *timestamp,
            CacheEvent::NoServersConfigured { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::PrimaryMarkedDown { .. } => "PrimaryMarkedDown",
            CacheEvent::PrimaryRecovered { .. } => "PrimaryRecovered",
            CacheEvent::RemoteUnavailable { .. } => "RemoteUnavailable",
            CacheEvent::FallbackWrite { .. } => "FallbackWrite",
            CacheEvent::FallbackServed { .. } => "FallbackServed",
            CacheEvent::NoServersConfigured { .. } => "NoServersConfigured",
        }
    }
}

// =============================================================================
// Event Builders
// =============================================================================

impl CacheEvent {
    /// Create a PrimaryMarkedDown event.
    pub fn primary_marked_down(endpoint: impl Into<String>, down_until: DateTime<Utc>) -> Self {
        CacheEvent::PrimaryMarkedDown {
            endpoint: endpoint.into(),
            down_until,
            timestamp: Utc::now(),
        }
    }

    /// Create a PrimaryRecovered event.
    pub fn primary_recovered(endpoint: impl Into<String>) -> Self {
        CacheEvent::PrimaryRecovered {
            endpoint: endpoint.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a RemoteUnavailable event.
    pub fn remote_unavailable(operation: impl Into<String>, cause: impl Into<String>) -> Self {
        CacheEvent::RemoteUnavailable {
            operation: operation.into(),
            cause: cause.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a FallbackWrite event.
    pub fn fallback_write(key: impl Into<String>, ttl: Duration) -> Self {
        CacheEvent::FallbackWrite {
            key: key.into(),
            ttl_seconds: ttl.as_secs(),
            timestamp: Utc::now(),
        }
    }

    /// Create a FallbackServed event.
    pub fn fallback_served(key: impl Into<String>) -> Self {
        CacheEvent::FallbackServed {
            key: key.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a NoServersConfigured event.
    pub fn no_servers_configured(operation: impl Into<String>) -> Self {
        CacheEvent::NoServersConfigured {
            operation: operation.into(),
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
