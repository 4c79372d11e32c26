//! In-Memory Shared Process State
//!
//! DashMap-based implementation of the `SharedState` port. Created once at
//! process start and shared by all request workers via `Arc`; also serves
//! as the test double for the failover engine.
//!
//! Expiry is lazy: entries past their deadline are dropped on the read that
//! finds them, plus whatever an explicit [`purge`](InMemorySharedState::purge)
//! sweep removes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::domain::ports::{SharedEntry, SharedState};
use crate::error::Result;

/// One stored entry plus its expiry deadline (None = no expiry).
#[derive(Debug, Clone)]
struct StoredEntry {
    entry: SharedEntry,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if deadline <= now)
    }
}

/// Process-wide key/value region shared by all workers.
#[derive(Debug, Default)]
pub struct InMemorySharedState {
    entries: DashMap<String, StoredEntry>,
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
}

impl InMemorySharedState {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    /// Check if the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sweep out every expired entry. Returns the number removed.
    pub fn purge(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| !stored.is_expired(now));
        before - self.entries.len()
    }

    /// Get operation counters.
    pub fn stats(&self) -> SharedStateStats {
        SharedStateStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }
}

impl SharedState for InMemorySharedState {
    fn get(&self, key: &str) -> Option<SharedEntry> {
        self.reads.fetch_add(1, Ordering::Relaxed);

        let expired = match self.entries.get(key) {
            Some(stored) => {
                if !stored.is_expired(Instant::now()) {
                    return Some(stored.entry.clone());
                }
                true
            }
            None => false,
        };

        if expired {
            // Lazy expiry: drop the dead entry outside the read guard.
            self.entries
                .remove_if(key, |_, stored| stored.is_expired(Instant::now()));
        }
        None
    }

    fn set(&self, key: &str, entry: SharedEntry, ttl: Duration) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);

        let expires_at = if ttl > Duration::ZERO {
            Some(Instant::now() + ttl)
        } else {
            None
        };
        self.entries
            .insert(key.to_string(), StoredEntry { entry, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.entries.remove(key);
    }
}

/// Shared-state operation counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedStateStats {
    /// Read operations
    pub reads: u64,
    /// Write operations
    pub writes: u64,
    /// Delete operations
    pub deletes: u64,
}

// =============================================================================
// Tests
// =============================================================================
