//! Memcached Remote Store Adapter
//!
//! Implements the `RemoteStore` port over the memcached wire protocol using
//! the `memcache` client crate, with a per-endpoint keepalive pool: a
//! released session parks its connection with an expiry deadline, and a
//! later connect reuses the freshest parked connection instead of dialing.
//!
//! The client library does not expose memcached's flags field for raw
//! values, so flags travel in a 4-byte big-endian prefix of the stored
//! value. Both sides of the prefix are private to this adapter; the rest of
//! the crate only ever sees `(Bytes, u32)`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::Endpoint;
use crate::domain::ports::{RemoteSession, RemoteStore};
use crate::error::{Error, Result};

/// Length of the flags prefix carried inside stored values.
const FLAGS_PREFIX_LEN: usize = 4;

/// A parked connection with its keepalive deadline.
struct IdleConn {
    client: memcache::Client,
    expires_at: Instant,
}

type Pool = Arc<Mutex<Vec<IdleConn>>>;

/// Production remote store speaking the memcached protocol.
///
/// Holds one keepalive pool per endpoint. Connect checks the pool first
/// (dropping connections past their deadline), and only dials when nothing
/// reusable is parked. Dialing runs on the blocking pool and is bounded by
/// the caller's timeout; a dial that outlives the bound is abandoned.
#[derive(Default)]
pub struct MemcachedStore {
    pools: DashMap<String, Pool>,
}

impl MemcachedStore {
    /// Create a store with empty pools.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently parked connections for an endpoint.
    pub fn idle_connections(&self, endpoint: &Endpoint) -> usize {
        self.pools
            .get(&endpoint.to_string())
            .map(|pool| pool.lock().len())
            .unwrap_or(0)
    }

    fn pool_for(&self, addr: &str) -> Pool {
        self.pools.entry(addr.to_string()).or_default().clone()
    }

    /// Take the freshest reusable parked connection, discarding expired
    /// ones along the way.
    fn checkout(pool: &Pool) -> Option<memcache::Client> {
        let now = Instant::now();
        let mut idle = pool.lock();
        while let Some(conn) = idle.pop() {
            if conn.expires_at > now {
                return Some(conn.client);
            }
            trace!("discarding idle connection past keepalive deadline");
        }
        None
    }

    async fn dial(addr: String, timeout: Duration) -> Result<memcache::Client> {
        let url = format!("memcache://{addr}?protocol=ascii");
        let dial_addr = addr.clone();
        let handle = tokio::task::spawn_blocking(move || memcache::connect(url.as_str()));

        let client = match tokio::time::timeout(timeout, handle).await {
            Err(_) => {
                return Err(Error::connect_failure(
                    addr,
                    format!("connect timed out after {timeout:?}"),
                ))
            }
            Ok(Err(join_err)) => return Err(Error::connect_failure(addr, join_err)),
            Ok(Ok(Err(e))) => return Err(Error::connect_failure(addr, e)),
            Ok(Ok(Ok(client))) => client,
        };

        // Bound the per-operation latency the same way as the dial.
        if let Err(e) = client.set_read_timeout(Some(timeout)) {
            debug!(endpoint = %dial_addr, error = %e, "failed to set read timeout");
        }
        if let Err(e) = client.set_write_timeout(Some(timeout)) {
            debug!(endpoint = %dial_addr, error = %e, "failed to set write timeout");
        }
        Ok(client)
    }
}

#[async_trait]
impl RemoteStore for MemcachedStore {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>> {
        let addr = endpoint.to_string();
        let pool = self.pool_for(&addr);

        let client = match Self::checkout(&pool) {
            Some(client) => client,
            None => Self::dial(addr.clone(), timeout).await?,
        };

        Ok(Box::new(MemcachedSession {
            client,
            endpoint: addr,
            pool,
        }))
    }
}

impl std::fmt::Debug for MemcachedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcachedStore")
            .field("endpoints", &self.pools.len())
            .finish()
    }
}

/// One checked-out memcached connection.
struct MemcachedSession {
    client: memcache::Client,
    endpoint: String,
    pool: Pool,
}

#[async_trait]
impl RemoteSession for MemcachedSession {
    async fn get(&mut self, key: &str) -> Result<(Bytes, u32)> {
        match self.client.get::<Vec<u8>>(key) {
            Ok(Some(raw)) => decode_value(&self.endpoint, raw),
            Ok(None) => Err(Error::NotFound),
            Err(e) => Err(Error::operation_failure(self.endpoint.clone(), "get", e)),
        }
    }

    async fn set(&mut self, key: &str, value: Bytes, ttl: Duration, flags: u32) -> Result<()> {
        let encoded = encode_value(&value, flags);
        self.client
            .set(key, encoded.as_slice(), ttl.as_secs() as u32)
            .map_err(|e| Error::operation_failure(self.endpoint.clone(), "set", e))
    }

    async fn delete(&mut self, key: &str) -> Result<()> {
        match self.client.delete(key) {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::NotFound),
            Err(e) => Err(Error::operation_failure(self.endpoint.clone(), "delete", e)),
        }
    }

    async fn release(self: Box<Self>, keepalive: Duration, pool_size: usize) -> Result<()> {
        let MemcachedSession {
            client,
            endpoint,
            pool,
        } = *self;

        let mut idle = pool.lock();
        if idle.len() >= pool_size {
            trace!(endpoint = %endpoint, "keepalive pool full, dropping connection");
            return Ok(());
        }
        idle.push(IdleConn {
            client,
            expires_at: Instant::now() + keepalive,
        });
        Ok(())
    }
}

/// Prepend the flags prefix to a value.
fn encode_value(value: &Bytes, flags: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(FLAGS_PREFIX_LEN + value.len());
    buf.extend_from_slice(&flags.to_be_bytes());
    buf.extend_from_slice(value);
    buf
}

/// Split a raw stored value into flags and payload.
fn decode_value(endpoint: &str, raw: Vec<u8>) -> Result<(Bytes, u32)> {
    if raw.len() < FLAGS_PREFIX_LEN {
        return Err(Error::operation_failure(
            endpoint,
            "get",
            "stored value shorter than flags prefix",
        ));
    }
    let flags = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let value = Bytes::from(raw).slice(FLAGS_PREFIX_LEN..);
    Ok((value, flags))
}

// =============================================================================
// Tests
// =============================================================================
