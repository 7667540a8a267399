use std::env;
use std::path::{Path, PathBuf};

use crate::config::{Config, ConfigError};

pub const CONFIG_FILE: &str = "releasegraph.toml";
pub const CONFIG_ENV: &str = "RELEASEGRAPH_CONFIG";

/// Picks the config file to read: an explicit path, then
/// `$RELEASEGRAPH_CONFIG`, then `releasegraph.toml` under `cwd`.
/// `None` means run with defaults.
pub fn resolve_config_path(explicit: Option<PathBuf>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }

    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let local = cwd.join(CONFIG_FILE);
    local.is_file().then_some(local)
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
    }

    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}
