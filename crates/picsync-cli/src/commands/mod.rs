//! CLI command implementations
//!
//! Each command wires the adapters it needs itself; there is no shared
//! application state between invocations.

pub mod auth;
pub mod config;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use picsync_core::config::Config;

/// Path of the config file the command operates on
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(Config::default_path, Path::to_path_buf)
}

/// Loads the configuration
///
/// An explicit `--config` file must exist; the default location falls back
/// to built-in defaults when absent.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::load_or_default(&Config::default_path())),
    }
}
