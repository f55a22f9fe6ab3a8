//! Path utilities for vidlearn
//!
//! Respects XDG Base Directory Specification

use crate::error::Result;
use std::env;
use std::path::PathBuf;
use tokio::fs;

const APP_NAME: &str = "vidlearn";

/// `$<var>/vidlearn`, else the platform default, else `~/<fallback>/vidlearn`
fn app_dir(var: &str, platform: Option<PathBuf>, fallback: &str) -> PathBuf {
    let base = env::var_os(var)
        .map(PathBuf::from)
        .or(platform)
        .unwrap_or_else(|| PathBuf::from(env::var("HOME").unwrap_or_default()).join(fallback));
    base.join(APP_NAME)
}

/// Respects XDG_CONFIG_HOME, defaults to ~/.config/vidlearn
pub fn get_config_dir() -> PathBuf {
    app_dir("XDG_CONFIG_HOME", dirs::config_dir(), ".config")
}

/// Respects XDG_CACHE_HOME, defaults to ~/.cache/vidlearn
pub fn get_cache_dir() -> PathBuf {
    app_dir("XDG_CACHE_HOME", dirs::cache_dir(), ".cache")
}

/// Notes and progress live here. Respects XDG_DATA_HOME.
pub fn get_data_dir() -> PathBuf {
    app_dir("XDG_DATA_HOME", dirs::data_dir(), ".local/share")
}

pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.json")
}

/// Ensure a directory exists
pub async fn ensure_dir(path: &std::path::Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    Ok(())
}

/// Ensure all required app directories exist
pub async fn ensure_app_dirs() -> Result<()> {
    ensure_dir(&get_config_dir()).await?;
    ensure_dir(&get_cache_dir()).await?;
    ensure_dir(&get_data_dir()).await?;
    Ok(())
}
