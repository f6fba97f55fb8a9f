// src/cache/file.rs

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::ResultCache;
use crate::cache::entry::{CacheEntry, CacheTable};
use crate::errors::Result;
use crate::task::Value;

/// On-disk format version.
pub const CACHE_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    version: String,
    saved_at: DateTime<Utc>,
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
}

/// Stores results in a JSON file, rewritten after every change.
///
/// The file is read once when the cache is opened. A missing file starts an
/// empty cache; an unreadable or corrupt one is logged and ignored.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    table: Mutex<CacheTable>,
    default_ttl: Option<Duration>,
}

impl FileCache {
    pub fn open(path: impl Into<PathBuf>, default_ttl: Option<Duration>) -> Result<Self> {
        let path = path.into();
        let mut table = load_table(&path);

        let expired = table.invalidate_expired(Utc::now());
        let cache = Self {
            path,
            table: Mutex::new(table),
            default_ttl,
        };
        if !expired.is_empty() {
            info!(removed = expired.len(), "dropped expired task results on load");
            cache.save(&cache.table())?;
        }
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn table(&self) -> MutexGuard<'_, CacheTable> {
        match self.table.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Store with an explicit TTL; `None` falls back to the default TTL.
    pub fn put_with_ttl(&self, task: &str, value: &Value, ttl: Option<Duration>) -> Result<()> {
        let ttl = ttl.or(self.default_ttl);
        let mut table = self.table();
        table.insert(task, CacheEntry::new(value.clone(), ttl));
        self.save(&table)?;
        debug!(task = %task, path = %self.path.display(), "stored task result (file)");
        Ok(())
    }

    pub fn delete(&self, task: &str) -> Result<bool> {
        let mut table = self.table();
        let removed = table.remove(task);
        if removed {
            self.save(&table)?;
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<()> {
        let mut table = self.table();
        table.clear();
        self.save(&table)
    }

    /// All live entries.
    pub fn entries(&self) -> BTreeMap<String, Value> {
        self.table().live_values(Utc::now())
    }

    pub fn invalidate_expired(&self) -> Result<Vec<String>> {
        let mut table = self.table();
        let expired = table.invalidate_expired(Utc::now());
        if !expired.is_empty() {
            self.save(&table)?;
            info!(removed = expired.len(), "invalidated expired task results (file)");
        }
        Ok(expired)
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    fn save(&self, table: &CacheTable) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating cache directory at {:?}", parent))?;
            }
        }

        let doc = CacheDocument {
            version: CACHE_FORMAT_VERSION.to_string(),
            saved_at: Utc::now(),
            entries: table.as_entries().clone(),
        };

        let file = File::create(&self.path)
            .with_context(|| format!("creating cache file at {:?}", self.path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &doc).map_err(std::io::Error::from)?;
        writer.flush()?;
        Ok(())
    }
}

fn load_table(path: &Path) -> CacheTable {
    if !path.exists() {
        return CacheTable::default();
    }

    let parsed = fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|s| serde_json::from_str::<CacheDocument>(&s).map_err(anyhow::Error::from));

    match parsed {
        Ok(doc) => {
            if doc.version != CACHE_FORMAT_VERSION {
                warn!(
                    path = %path.display(),
                    version = %doc.version,
                    "unexpected cache file version; loading anyway"
                );
            }
            debug!(path = %path.display(), entries = doc.entries.len(), "loaded cache file");
            CacheTable::from_entries(doc.entries)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not load cache file; starting empty");
            CacheTable::default()
        }
    }
}

impl ResultCache for FileCache {
    fn get(&self, task: &str) -> Result<Option<Value>> {
        let mut table = self.table();
        let (value, expired) = table.get(task, Utc::now());
        if expired {
            self.save(&table)?;
        }
        Ok(value)
    }

    fn put(&self, task: &str, value: &Value) -> Result<()> {
        self.put_with_ttl(task, value, None)
    }
}
