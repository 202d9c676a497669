//! Cache store contract and an in-memory implementation.
//!
//! The cache middleware only relies on "a successful `get` after a successful `set`
//! with an unexpired TTL returns the same bytes". Retention and eviction belong to
//! the store.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use derive_more::{Display, Error};

/// Errors reported by a [`CacheStore`].
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum StoreError {
    /// No entry (or an expired one) for the key.
    #[display("cache entry not found")]
    NotFound,

    /// The store could not be read.
    #[display("cache store unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),

    /// The entry could not be written.
    #[display("cache write failed: {_0}")]
    WriteFailed(#[error(not(source))] String),
}

/// Key/value store backing [`crate::middleware::CacheLayer`].
///
/// Implementations must tolerate concurrent `get`/`set` from many in-flight calls.
pub trait CacheStore: Send + Sync + 'static {
    /// Read the bytes stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Bytes, StoreError>> + Send;

    /// Store `body` under `key` for `ttl`.
    fn set(
        &self,
        key: &str,
        ttl: Duration,
        body: Bytes,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<S: CacheStore> CacheStore for Arc<S> {
    fn get(&self, key: &str) -> impl Future<Output = Result<Bytes, StoreError>> + Send {
        (**self).get(key)
    }

    fn set(
        &self,
        key: &str,
        ttl: Duration,
        body: Bytes,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).set(key, ttl, body)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    body: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Writes between two sweeps of expired entries.
const SWEEP_INTERVAL: usize = 64;

/// Process-local store with per-entry TTL.
///
/// Expired entries are reported as [`StoreError::NotFound`] and dropped on read.
/// Every 64th write also drops all expired entries, so keys that are
/// never read again do not accumulate. A zero TTL stores the entry until overwritten.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if a live entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(Instant::now()))
    }

    /// Insert an entry directly, bypassing the async contract.
    pub fn insert(&self, key: impl Into<String>, body: impl Into<Bytes>) {
        self.entries.insert(
            key.into(),
            Entry {
                body: body.into(),
                expires_at: None,
            },
        );
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }

    fn read(&self, key: &str) -> Result<Bytes, StoreError> {
        let now = Instant::now();
        let body = {
            let entry = self.entries.get(key).ok_or(StoreError::NotFound)?;
            if entry.is_expired(now) {
                None
            } else {
                Some(entry.body.clone())
            }
        };

        body.ok_or_else(|| {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
            StoreError::NotFound
        })
    }
}

impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        self.read(key)
    }

    async fn set(&self, key: &str, ttl: Duration, body: Bytes) -> Result<(), StoreError> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(
                Instant::now()
                    .checked_add(ttl)
                    .ok_or_else(|| StoreError::WriteFailed(format!("ttl overflow: {ttl:?}")))?,
            )
        };

        self.entries
            .insert(key.to_string(), Entry { body, expires_at });

        let writes = self.writes.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if writes.is_multiple_of(SWEEP_INTERVAL) {
            self.purge_expired();
        }
        Ok(())
    }
}
