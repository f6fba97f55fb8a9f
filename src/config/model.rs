// src/config/model.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::{FileCache, MemoryCache, ResultCache, inputs_key};
use crate::cli::{LogFormat, LogLevel};
use crate::engine::RunOptions;
use crate::errors::{Result, TaskgraphError};
use crate::types::{ExecutorKind, MaxWorkers};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [run]
/// name = "etl"
/// max_workers = 4        # or "default"
/// executor = "thread"    # or "process"
///
/// [cache]
/// mode = "file"          # "memory" | "file" | "none"
/// path = ".taskgraph/cache.json"
/// ttl_secs = 3600
/// key = "inputs"         # or "name"
///
/// [logging]
/// level = "info"
/// format = "text"        # or "json"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Run name used in lifecycle events. If `None`, the pipeline's own name
    /// (or `"workflow"` for a bare graph) is used.
    #[serde(default)]
    pub name: Option<String>,

    /// Pool capacity: a positive integer or `"default"`.
    #[serde(default)]
    pub max_workers: MaxWorkers,

    #[serde(default)]
    pub executor: ExecutorKind,
}

/// Where task results are cached between (or within) runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    #[default]
    None,
    Memory,
    File,
}

/// What a cached result is keyed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKeyMode {
    /// Task name only; a stored result is reused whatever the inputs.
    #[default]
    Name,
    /// Task name and injected inputs.
    Inputs,
}

/// `[cache]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    #[serde(default)]
    pub mode: CacheMode,

    /// Cache file; required for `mode = "file"`. Relative paths are resolved
    /// against the directory of the config file.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Default time-to-live of cached results. Absent means never expire.
    #[serde(default)]
    pub ttl_secs: Option<u64>,

    #[serde(default)]
    pub key: CacheKeyMode,
}

impl CacheSection {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// If `None`, `TASKGRAPH_LOG` or `info` applies.
    #[serde(default)]
    pub level: Option<LogLevel>,

    #[serde(default)]
    pub format: LogFormat,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (or `Default`), so the
/// cache settings are known to be usable.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub run: RunSection,
    pub cache: CacheSection,
    pub logging: LoggingSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        run: RunSection,
        cache: CacheSection,
        logging: LoggingSection,
    ) -> Self {
        Self {
            run,
            cache,
            logging,
        }
    }

    /// Open the configured cache, if any.
    pub fn build_cache(&self) -> Result<Option<Arc<dyn ResultCache>>> {
        let ttl = self.cache.ttl();
        match self.cache.mode {
            CacheMode::None => Ok(None),
            CacheMode::Memory => {
                let cache: Arc<dyn ResultCache> = match ttl {
                    Some(ttl) => Arc::new(MemoryCache::with_default_ttl(ttl)),
                    None => Arc::new(MemoryCache::new()),
                };
                Ok(Some(cache))
            }
            CacheMode::File => {
                let path = self.cache.path.clone().ok_or_else(|| {
                    TaskgraphError::Config("[cache].path is required for mode = \"file\"".to_string())
                })?;
                let cache: Arc<dyn ResultCache> = Arc::new(FileCache::open(path, ttl)?);
                Ok(Some(cache))
            }
        }
    }

    /// Run options for this configuration, with the default sink, sleeper
    /// and worker command.
    pub fn run_options(&self) -> Result<RunOptions> {
        let mut options = RunOptions::default()
            .with_max_workers(self.run.max_workers)
            .with_executor(self.run.executor);
        if let Some(name) = &self.run.name {
            options.name = name.clone();
        }
        options.cache = self.build_cache()?;
        if self.cache.key == CacheKeyMode::Inputs {
            options = options.with_cache_key(inputs_key);
        }
        Ok(options)
    }
}
