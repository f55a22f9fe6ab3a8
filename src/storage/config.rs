//! Configuration management

use crate::error::{Result, VidlearnError};
use crate::types::Config;
use crate::utils::paths::{ensure_dir, get_config_path};
use std::path::Path;
use tokio::fs;
use tokio::process::Command;

/// Reject values the player cannot work with
pub fn validate(config: &Config) -> Result<()> {
    if url::Url::parse(&config.api_base_url).is_err() {
        return Err(VidlearnError::InvalidConfig(format!(
            "api_base_url is not a URL: {}",
            config.api_base_url
        )));
    }
    if config.poll_interval_ms == 0 {
        return Err(VidlearnError::InvalidConfig(
            "poll_interval_ms must be positive".into(),
        ));
    }
    if !(config.seek_step > 0.0 && config.seek_step.is_finite()) {
        return Err(VidlearnError::InvalidConfig(
            "seek_step must be a positive number of seconds".into(),
        ));
    }
    if !(config.volume_step > 0.0 && config.volume_step <= 1.0) {
        return Err(VidlearnError::InvalidConfig(
            "volume_step must be in (0, 1]".into(),
        ));
    }
    Ok(())
}

/// Load configuration from a file, merging with defaults
pub async fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).await?;
    // Missing fields fall back to defaults through #[serde(default)]
    let mut config: Config = serde_json::from_str(&content)?;
    if config.user_id.trim().is_empty() {
        config.user_id = Config::default().user_id;
    }
    config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();

    validate(&config)?;
    Ok(config)
}

pub async fn load_config() -> Result<Config> {
    load_config_from(&get_config_path()).await
}

pub async fn save_config_to(path: &Path, config: &Config) -> Result<()> {
    validate(config)?;
    if let Some(dir) = path.parent() {
        ensure_dir(dir).await?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).await?;
    Ok(())
}

/// Save configuration to file
pub async fn save_config(config: &Config) -> Result<()> {
    save_config_to(&get_config_path(), config).await
}

/// Open config file in editor
pub async fn edit_config(editor: &str) -> Result<()> {
    let config_path = get_config_path();

    // Ensure config file exists
    if !config_path.exists() {
        save_config(&Config::default()).await?;
    }

    Command::new(editor).arg(&config_path).status().await?;

    Ok(())
}
