//! Domain layer: ports and events.
//!
//! The ports define the capabilities the cache core depends on (remote
//! store sessions, the host-shared local state, the event sink).
//! Infrastructure adapters implement them, which keeps the failover engine
//! testable against in-memory doubles.

pub mod events;
pub mod ports;

pub use events::CacheEvent;
pub use ports::{EventSink, RemoteSession, RemoteStore, SharedEntry, SharedState, Tier};
