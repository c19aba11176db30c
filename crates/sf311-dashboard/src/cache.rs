//! Time-bounded cache of query results
//!
//! Entries are keyed by query name plus filter and expire after the configured
//! TTL. [`QueryCache::invalidate`] drops everything at once; that is the
//! manual refresh trigger.

use crate::error::Result;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct Entry {
    stored_at: Instant,
    value: Arc<dyn Any + Send + Sync>,
}

pub struct QueryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fresh value for `key`, if one of type `T` is cached
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = self.entries();
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    pub fn insert<T>(&self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        if self.ttl.is_zero() {
            return;
        }
        self.entries().insert(
            key.into(),
            Entry {
                stored_at: Instant::now(),
                value: Arc::new(value),
            },
        );
    }

    /// Return the cached value or run `load` and cache its result.
    ///
    /// Errors are returned as-is and never cached.
    pub async fn get_or_load<T, F, Fut>(&self, key: &str, load: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.get::<T>(key) {
            debug!(key, "cache hit");
            return Ok(hit);
        }

        debug!(key, "cache miss");
        let value = load().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Drop every entry
    pub fn invalidate(&self) {
        let mut entries = self.entries();
        debug!(entries = entries.len(), "cache invalidated");
        entries.clear();
    }

    /// Drop expired entries; returns how many remain
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut entries = self.entries();
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
