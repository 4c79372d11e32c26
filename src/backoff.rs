//! Primary Backoff Tracker
//!
//! Remembers "primary looked down until time T" across requests by storing
//! an absolute epoch-seconds timestamp in shared process state, so every
//! worker on the host skips the dead primary instead of each paying the
//! connect timeout.
//!
//! The tracker itself never errors: if the shared-state backend is broken,
//! eligibility defaults to "eligible" and marking/clearing degrade to
//! best-effort no-ops. The window only exists to avoid repeated connect
//! timeouts; failing open costs one extra timeout, never correctness.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::ports::{SharedEntry, SharedState};

/// Extra lifetime on the marker entry beyond the window itself, so a
/// crashed or restarted shared-state backend self-heals.
const MARKER_TTL_SLACK: Duration = Duration::from_secs(10);

/// Tracks the primary-down-until marker in shared process state.
///
/// At most one window is active at a time: the marker is a single scalar,
/// and concurrent writers simply race to the last value. A lost update at
/// worst costs one request an extra connect timeout.
#[derive(Clone)]
pub struct BackoffTracker {
    state: Arc<dyn SharedState>,
    marker_key: String,
    window: Duration,
}

impl BackoffTracker {
    /// Create a tracker over the given shared state.
    pub fn new(state: Arc<dyn SharedState>, marker_key: impl Into<String>, window: Duration) -> Self {
        Self {
            state,
            marker_key: marker_key.into(),
            window,
        }
    }

    /// True iff no down-until marker exists or the stored timestamp is
    /// `<= now`. An unreadable marker counts as absent (fail-open).
    pub fn is_primary_eligible(&self, now: DateTime<Utc>) -> bool {
        match self.read_marker() {
            Some(down_until) => down_until <= now.timestamp(),
            None => true,
        }
    }

    /// True when a marker is currently stored, regardless of its value.
    /// Used to decide whether clearing is a recovery worth reporting.
    pub fn is_marked(&self) -> bool {
        self.state.get(&self.marker_key).is_some()
    }

    /// Record a primary connect failure: write `now + window` as the
    /// down-until timestamp. Best-effort; returns the window end for
    /// logging and event emission.
    pub fn mark_down(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let down_until = now + chrono::Duration::seconds(self.window.as_secs() as i64);
        let marker = SharedEntry::new(down_until.timestamp().to_string(), 0);

        if let Err(e) = self
            .state
            .set(&self.marker_key, marker, self.window + MARKER_TTL_SLACK)
        {
            debug!(error = %e, "failed to store primary down marker");
        }
        down_until
    }

    /// Remove the marker. Best-effort.
    pub fn clear(&self) {
        self.state.delete(&self.marker_key);
    }

    /// The configured backoff window.
    pub fn window(&self) -> Duration {
        self.window
    }

    fn read_marker(&self) -> Option<i64> {
        let entry = self.state.get(&self.marker_key)?;
        match std::str::from_utf8(&entry.value).ok().and_then(|s| s.trim().parse::<i64>().ok()) {
            Some(ts) => Some(ts),
            None => {
                debug!("unreadable primary down marker, treating primary as eligible");
                None
            }
        }
    }
}

impl std::fmt::Debug for BackoffTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackoffTracker")
            .field("marker_key", &self.marker_key)
            .field("window", &self.window)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
