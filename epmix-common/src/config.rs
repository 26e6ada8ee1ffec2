//! Configuration file discovery and cache folder resolution
//!
//! Both resolvers follow the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file value (cache folder only)
//! 4. OS-dependent default (fallback)

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "EPMIX_CONFIG";

/// Environment variable naming the sample cache folder
pub const CACHE_DIR_ENV_VAR: &str = "EPMIX_CACHE_DIR";

const APP_DIR_NAME: &str = "epmix";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Locate the TOML config file, if any.
///
/// An explicitly named file (CLI or environment) is returned even when it
/// does not exist so that loading reports a clear error. The platform
/// default location is only returned when the file is present.
pub fn resolve_config_file(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    let default_path = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
    match default_path {
        Some(path) if path.exists() => Some(path),
        _ => {
            debug!("No config file found, using built-in defaults");
            None
        }
    }
}

/// Resolve the sample cache folder.
pub fn resolve_cache_dir(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config_value: Option<&Path>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = config_value {
        return path.to_path_buf();
    }

    // Priority 4: OS-dependent default
    default_cache_dir()
}

/// Read and deserialize a TOML file.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
}

fn default_cache_dir() -> PathBuf {
    // ~/.cache/epmix on Linux, ~/Library/Caches/epmix on macOS,
    // %LOCALAPPDATA%\epmix on Windows
    dirs::cache_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./epmix_cache"))
}
