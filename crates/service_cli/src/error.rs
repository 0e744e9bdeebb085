//! CLI error types

use infra_store::StoreError;
use rng_source::SourceError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors reported by `rngstream` commands
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No QRNG webservice binding is linked into this build")]
    MissingBinding,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid restore point: {0}")]
    RestorePoint(#[from] serde_json::Error),
}

/// Result type for CLI commands
pub type Result<T> = std::result::Result<T, CliError>;
