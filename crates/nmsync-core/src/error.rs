//! Core error types for nmsync-core

use nmsync_client::ClientError;
use thiserror::Error;

/// Errors that abort a synchronization run
#[derive(Error, Debug)]
pub enum SyncError {
    /// The monitoring service or the transport failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Configuration is incomplete or invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration errors, raised before any remote call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required option is absent
    #[error("missing required option: {0}")]
    Missing(&'static str),

    /// A regex filter does not compile
    #[error("invalid regex filter `{pattern}`: {message}")]
    InvalidPattern {
        /// Pattern as configured
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// The API endpoint is not a usable base URL
    #[error("invalid api_endpoint: {0}")]
    InvalidEndpoint(String),

    /// The configuration file could not be read
    #[error("cannot read configuration: {0}")]
    Io(String),

    /// The configuration file could not be parsed
    #[error("cannot parse configuration: {0}")]
    Parse(String),
}

/// Cache store failures; always recovered by rebuilding
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The entry could not be read or written
    #[error("cache I/O error: {0}")]
    Io(String),

    /// The stored entry does not decode as a snapshot
    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Corrupt(err.to_string())
    }
}
