// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run basic validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks section invariants (see [`crate::config::validate_config`]).
/// - Resolves a relative cache path against the config file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let mut config = ConfigFile::try_from(raw_config)?;

    if let Some(cache_path) = config.cache.path.take() {
        config.cache.path = Some(resolve_relative(path, cache_path));
    }

    debug!(path = %path.display(), run = ?config.run.name, "configuration loaded");
    Ok(config)
}

/// Load `path` if given, else [`default_config_path`] if it exists, else the
/// built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<ConfigFile> {
    match path {
        Some(p) => load_and_validate(p),
        None => {
            let default = default_config_path();
            if default.exists() {
                load_and_validate(&default)
            } else {
                debug!("no config file found; using defaults");
                Ok(ConfigFile::default())
            }
        }
    }
}

/// `Taskgraph.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Taskgraph.toml")
}

/// - If the config path has a non-empty parent (e.g. "configs/Taskgraph.toml"),
///   relative paths are taken from that directory.
/// - If it's just a bare filename, they stay relative to the working
///   directory.
fn resolve_relative(config_path: &Path, target: PathBuf) -> PathBuf {
    if target.is_absolute() {
        return target;
    }
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(target),
        _ => target,
    }
}
