//! GateCache - Client-Side Tiered Cache Access Layer
//!
//! Fronts a remote key/value cache service (memcached-compatible) with
//! automatic failover between a primary and a backup instance, degrading to
//! a local, host-shared cache when neither remote is reachable. Built for
//! the request path of a latency-sensitive gate (e.g. a bot-mitigation
//! challenge check): remote-cache unavailability must never add unbounded
//! latency or fail a request.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         TieredCache (facade)                          │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                      TieredExecutor (decision tree)                   │
//! │                                                                       │
//! │   Primary (remote)  ──fail──▶  Backup (remote)  ──fail──▶  Fallback  │
//! │   ┌──────────────┐            ┌──────────────┐         ┌───────────┐ │
//! │   │ memcached    │            │ memcached    │         │ shared    │ │
//! │   │ + keepalive  │            │ + keepalive  │         │ process   │ │
//! │   │   pool       │            │   pool       │         │ state     │ │
//! │   └──────────────┘            └──────────────┘         └───────────┘ │
//! │          ▲                                                   ▲       │
//! │          └──── BackoffTracker (primary-down-until marker) ───┘       │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - Fail open: a cache miss is always safe; no caller request ever fails
//!   because the cache is unavailable
//! - One bounded connect per endpoint per operation; a down primary is
//!   skipped host-wide for a backoff window instead of re-dialed
//! - A clean remote "not found" is authoritative and never masked by a
//!   stale local fallback copy
//! - Collaborators (remote store, shared state, event sink) are explicit
//!   capabilities behind ports, injectable for tests
//!
//! # Modules
//!
//! - [`adapters`] - Infrastructure adapters implementing domain ports
//! - [`backoff`] - Primary-down-until tracking in shared state
//! - [`config`] - Endpoints, timeouts, namespaces
//! - [`domain`] - Ports and decision events
//! - [`error`] - Error types
//! - [`executor`] - The primary → backup decision tree
//! - [`facade`] - The public get/set/delete surface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use gatecache::{CacheConfig, MemcachedStore, InMemorySharedState, TieredCache};
//!
//! let config = CacheConfig::with_servers(
//!     Some("cache-1.internal:11211"),
//!     Some("cache-2.internal:11211"),
//! )?;
//! let cache = TieredCache::new(
//!     config,
//!     Arc::new(MemcachedStore::new()),
//!     Arc::new(InMemorySharedState::new()),
//! );
//!
//! cache.set("captcha_1.2.3.4", "ok", Duration::from_secs(120), 0).await?;
//! let state = cache.get("captcha_1.2.3.4").await;
//! ```

pub mod adapters;
pub mod backoff;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod facade;

// Re-export commonly used types
pub use adapters::{InMemoryRemoteStore, InMemorySharedState, MemcachedStore, TracingEventSink};
pub use backoff::BackoffTracker;
pub use config::{CacheConfig, Endpoint};
pub use domain::events::CacheEvent;
pub use domain::ports::{EventSink, RemoteSession, RemoteStore, SharedEntry, SharedState, Tier};
pub use error::{Error, Result};
pub use executor::TieredExecutor;
pub use facade::TieredCache;
