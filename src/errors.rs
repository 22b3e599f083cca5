// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RigError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Image build failed: {0}")]
    BuildFailure(String),

    #[error("Container launch failed: {0}")]
    LaunchFailure(String),

    #[error("Verification failed: {0}")]
    VerificationFailure(String),

    #[error("Address space exhausted: {0}")]
    AddressExhaustion(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RigError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        RigError::ConfigError(msg.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RigError>;
