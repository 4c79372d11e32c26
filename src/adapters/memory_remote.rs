//! In-Memory Remote Store (for testing)
//!
//! A controllable pair of "remote servers" living in process memory, used
//! to exercise every branch of the failover decision tree without a
//! network: connections can be refused per endpoint, operations can be
//! forced to fail, and connect/release attempts are counted.
//!
//! TTLs are accepted but not enforced; expiry behavior belongs to the real
//! server, not to the failover logic under test.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::config::Endpoint;
use crate::domain::ports::{RemoteSession, RemoteStore};
use crate::error::{Error, Result};

/// State of one simulated server endpoint.
#[derive(Debug, Default)]
pub struct ServerState {
    data: DashMap<String, (Bytes, u32)>,
    refuse_connections: AtomicBool,
    fail_operations: AtomicBool,
    connect_attempts: AtomicU64,
    released_sessions: AtomicU64,
}

impl ServerState {
    /// Refuse (or stop refusing) new connections.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse_connections.store(refuse, Ordering::SeqCst);
    }

    /// Make every operation fail (or stop failing) while sessions still
    /// connect fine.
    pub fn fail_operations(&self, fail: bool) {
        self.fail_operations.store(fail, Ordering::SeqCst);
    }

    /// Number of connect attempts seen, refused ones included.
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Number of sessions returned to the (simulated) keepalive pool.
    pub fn released_sessions(&self) -> u64 {
        self.released_sessions.load(Ordering::SeqCst)
    }

    /// Seed a value directly into the server.
    pub fn insert(&self, key: impl Into<String>, value: Bytes, flags: u32) {
        self.data.insert(key.into(), (value, flags));
    }

    /// Check whether the server holds a key.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Remove a key directly.
    pub fn remove(&self, key: &str) {
        self.data.remove(key);
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the server holds no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// In-memory `RemoteStore` with one [`ServerState`] per endpoint.
#[derive(Debug, Default)]
pub struct InMemoryRemoteStore {
    servers: DashMap<String, Arc<ServerState>>,
}

impl InMemoryRemoteStore {
    /// Create a store with no servers yet; endpoints materialize on first
    /// access.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the state behind an endpoint.
    pub fn server(&self, endpoint: &Endpoint) -> Arc<ServerState> {
        self.servers
            .entry(endpoint.to_string())
            .or_default()
            .clone()
    }

    /// Connect attempts across every endpoint.
    pub fn total_connect_attempts(&self) -> u64 {
        self.servers
            .iter()
            .map(|s| s.connect_attempts.load(Ordering::SeqCst))
            .sum()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        _timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>> {
        let server = self.server(endpoint);
        server.connect_attempts.fetch_add(1, Ordering::SeqCst);

        if server.refuse_connections.load(Ordering::SeqCst) {
            return Err(Error::connect_failure(
                endpoint.to_string(),
                "connection refused",
            ));
        }

        Ok(Box::new(InMemorySession {
            server,
            endpoint: endpoint.to_string(),
        }))
    }
}

/// One simulated session against one endpoint.
struct InMemorySession {
    server: Arc<ServerState>,
    endpoint: String,
}

impl InMemorySession {
    fn check_healthy(&self, op: &'static str) -> Result<()> {
        if self.server.fail_operations.load(Ordering::SeqCst) {
            return Err(Error::operation_failure(
                self.endpoint.clone(),
                op,
                "simulated server error",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSession for InMemorySession {
    async fn get(&mut self, key: &str) -> Result<(Bytes, u32)> {
        self.check_healthy("get")?;
        match self.server.data.get(key) {
            Some(stored) => Ok(stored.value().clone()),
            None => Err(Error::NotFound),
        }
    }

    async fn set(&mut self, key: &str, value: Bytes, _ttl: Duration, flags: u32) -> Result<()> {
        self.check_healthy("set")?;
        self.server.data.insert(key.to_string(), (value, flags));
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> Result<()> {
        self.check_healthy("delete")?;
        match self.server.data.remove(key) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound),
        }
    }

    async fn release(self: Box<Self>, _keepalive: Duration, _pool_size: usize) -> Result<()> {
        self.server.released_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
