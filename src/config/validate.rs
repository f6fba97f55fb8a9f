// src/config/validate.rs

use crate::config::model::{CacheMode, ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskgraphError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskgraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.run, raw.cache, raw.logging))
    }
}

/// Semantic checks that deserialization alone does not cover.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_run_section(cfg)?;
    validate_cache_section(cfg)?;
    Ok(())
}

fn validate_run_section(cfg: &RawConfigFile) -> Result<()> {
    // max_workers and executor are strongly typed and validated during
    // deserialization.
    if cfg.run.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(TaskgraphError::Config(
            "[run].name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_cache_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.cache.mode == CacheMode::File && cfg.cache.path.is_none() {
        return Err(TaskgraphError::Config(
            "[cache].path is required when [cache].mode = \"file\"".to_string(),
        ));
    }

    if cfg.cache.ttl_secs == Some(0) {
        return Err(TaskgraphError::Config(
            "[cache].ttl_secs must be >= 1 (got 0); omit it to never expire".to_string(),
        ));
    }

    if cfg.cache.mode == CacheMode::None && (cfg.cache.path.is_some() || cfg.cache.ttl_secs.is_some()) {
        tracing::warn!("[cache] settings are ignored because [cache].mode = \"none\"");
    }

    Ok(())
}
