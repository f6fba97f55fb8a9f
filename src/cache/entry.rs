// src/cache/entry.rs

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Value;

/// One cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    pub stored_at: DateTime<Utc>,
    /// `None` never expires.
    #[serde(default)]
    pub ttl_secs: Option<f64>,
}

impl CacheEntry {
    pub fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            stored_at: Utc::now(),
            ttl_secs: ttl.map(|d| d.as_secs_f64()),
        }
    }

    /// Time since the entry was stored. Clock skew into the future counts as
    /// zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or_default()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.ttl_secs {
            Some(ttl) => self.age(now).as_secs_f64() > ttl,
            None => false,
        }
    }
}

/// The entry table both caches are built on.
#[derive(Debug, Clone, Default)]
pub struct CacheTable {
    entries: BTreeMap<String, CacheEntry>,
}

impl CacheTable {
    pub fn from_entries(entries: BTreeMap<String, CacheEntry>) -> Self {
        Self { entries }
    }

    pub fn as_entries(&self) -> &BTreeMap<String, CacheEntry> {
        &self.entries
    }

    /// Look up a live entry. An expired entry is removed; the flag reports
    /// whether that happened.
    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> (Option<Value>, bool) {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove(key);
                (None, true)
            }
            Some(entry) => (Some(entry.value.clone()), false),
            None => (None, false),
        }
    }

    pub fn insert(&mut self, key: &str, entry: CacheEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every expired entry and return their keys.
    pub fn invalidate_expired(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.entries.remove(key);
        }
        expired
    }

    /// Values of all live entries.
    pub fn live_values(&self, now: DateTime<Utc>) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
