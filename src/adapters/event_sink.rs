//! Event Sink Adapters
//!
//! Implements the `EventSink` port with tracing and in-memory backends.

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::events::CacheEvent;
use crate::domain::ports::EventSink;

/// Tracing-based event sink.
///
/// Emits cache decision events to the tracing/logging system with the
/// serialized event as a structured field. This is the default sink.
#[derive(Debug, Clone, Default)]
pub struct TracingEventSink {
    /// Whether to log events at info level (true) or debug level (false)
    info_level: bool,
}

impl TracingEventSink {
    /// Create a new tracing event sink (debug level).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that logs at info level.
    pub fn info_level() -> Self {
        Self { info_level: true }
    }

    /// Create a sink that logs at debug level.
    pub fn debug_level() -> Self {
        Self { info_level: false }
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: CacheEvent) {
        let event_type = event.event_type();
        let json = serde_json::to_string(&event).unwrap_or_else(|_| format!("{event:?}"));

        if self.info_level {
            info!(event_type = %event_type, event = %json, "Cache event");
        } else {
            debug!(event_type = %event_type, event = %json, "Cache event");
        }
    }
}

/// In-memory event collector for testing.
///
/// Collects events in memory for later inspection during tests.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: RwLock<Vec<CacheEvent>>,
}

impl RecordingEventSink {
    /// Create a new recording event sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events.
    pub fn events(&self) -> Vec<CacheEvent> {
        self.events.read().clone()
    }

    /// Get the count of collected events.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Check if there are no events.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clear all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Get events of a specific type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<CacheEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .cloned()
            .collect()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: CacheEvent) {
        self.events.write().push(event);
    }
}
