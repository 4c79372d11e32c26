//! Infrastructure adapters implementing the domain ports.
//!
//! - [`MemcachedStore`] - production remote store over the memcached wire
//!   protocol, with per-endpoint keepalive pooling
//! - [`InMemorySharedState`] - DashMap-based host-shared state, usable both
//!   as the real process-wide store and as a test double
//! - [`InMemoryRemoteStore`] - controllable in-memory remote server pair
//!   for exercising the failover paths in tests
//! - [`TracingEventSink`] / [`RecordingEventSink`] - event sink adapters

mod event_sink;
mod memcached;
mod memory_remote;
mod shared_state;

pub use event_sink::{RecordingEventSink, TracingEventSink};
pub use memcached::MemcachedStore;
pub use memory_remote::{InMemoryRemoteStore, ServerState};
pub use shared_state::{InMemorySharedState, SharedStateStats};
