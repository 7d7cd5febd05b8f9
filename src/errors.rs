// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiveError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Session is no longer authenticated")]
    Unauthorized,

    #[error("Malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LiveError {
    /// Whether this failure means the authenticated session is over.
    pub fn ends_session(&self) -> bool {
        matches!(self, LiveError::Unauthorized)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, LiveError>;
