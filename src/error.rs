//! Error types for the few fallible entry points.
//!
//! Editing is total: out-of-range input is clamped and unknown ids are
//! ignored. Only decoding stored text can fail, and only when the text is
//! not the right format at all.

use thiserror::Error;

/// Failure to decode persisted clip or lane data
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to parse stored data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u64),
}

/// Failure to load a [`Config`](crate::config::Config)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error while reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}
