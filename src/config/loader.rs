// src/config/loader.rs

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable that overrides `[server].access_token`.
pub const ACCESS_TOKEN_ENV: &str = "PINCHY_ACCESS_TOKEN";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// Only TOML deserialization happens here. Use [`load_and_validate`] for the
/// checked form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path, validate it and apply environment
/// overrides.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(with_env_overrides(config))
}

/// Like [`load_and_validate`], but a missing file yields the defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if path.exists() {
        info!(path = %path.display(), "loading config");
        return load_and_validate(path);
    }

    debug!(path = %path.display(), "config file not found; using defaults");
    let config = ConfigFile::try_from(RawConfigFile::default())?;
    Ok(with_env_overrides(config))
}

fn with_env_overrides(mut config: ConfigFile) -> ConfigFile {
    if let Ok(token) = env::var(ACCESS_TOKEN_ENV) {
        if !token.trim().is_empty() {
            debug!("access token taken from {ACCESS_TOKEN_ENV}");
            config.server.access_token = Some(token);
        }
    }
    config
}

/// Default config file in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("pinchy-live.toml")
}
