// src/cache/memory.rs

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::cache::ResultCache;
use crate::cache::entry::{CacheEntry, CacheTable};
use crate::errors::Result;
use crate::task::Value;

/// Stores results in memory only.
#[derive(Debug, Default)]
pub struct MemoryCache {
    table: Mutex<CacheTable>,
    default_ttl: Option<Duration>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries stored through [`ResultCache::put`] expire after `ttl`.
    pub fn with_default_ttl(ttl: Duration) -> Self {
        Self {
            table: Mutex::new(CacheTable::default()),
            default_ttl: Some(ttl),
        }
    }

    fn table(&self) -> MutexGuard<'_, CacheTable> {
        match self.table.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Store with an explicit TTL; `None` falls back to the default TTL.
    pub fn put_with_ttl(&self, task: &str, value: &Value, ttl: Option<Duration>) {
        let ttl = ttl.or(self.default_ttl);
        self.table().insert(task, CacheEntry::new(value.clone(), ttl));
        debug!(task = %task, ttl_secs = ?ttl.map(|d| d.as_secs_f64()), "stored task result (memory)");
    }

    pub fn delete(&self, task: &str) -> bool {
        self.table().remove(task)
    }

    pub fn clear(&self) {
        self.table().clear();
    }

    /// All live entries.
    pub fn entries(&self) -> BTreeMap<String, Value> {
        self.table().live_values(Utc::now())
    }

    pub fn invalidate_expired(&self) -> Vec<String> {
        let expired = self.table().invalidate_expired(Utc::now());
        if !expired.is_empty() {
            info!(removed = expired.len(), "invalidated expired task results (memory)");
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, task: &str) -> Result<Option<Value>> {
        let (value, _expired) = self.table().get(task, Utc::now());
        Ok(value)
    }

    fn put(&self, task: &str, value: &Value) -> Result<()> {
        self.put_with_ttl(task, value, None);
        Ok(())
    }
}
