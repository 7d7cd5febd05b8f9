// src/config/mod.rs

//! Configuration loading and validation for pinchy-live.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate and convert raw values (`validate.rs`, `duration.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{
    ACCESS_TOKEN_ENV, default_config_path, load_and_validate, load_from_path, load_or_default,
};
pub use model::{
    ChannelConfig, ConfigFile, DedupSection, LogViewConfig, RawConfigFile, ServerConfig,
    TimersConfig,
};
