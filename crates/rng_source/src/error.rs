//! Error types for providers and random sources.

use std::path::PathBuf;

use infra_store::StoreError;
use rng_core::LayoutError;
use thiserror::Error;

/// Failure reported by a [`Provider`](crate::Provider).
///
/// Provider failures are never fatal to a source: the affected block is
/// marked invalid and nothing is persisted.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The backend returned a code other than the success code.
    #[error("Provider returned code {0}")]
    ReturnCode(i32),

    /// The backend returned fewer values than requested.
    #[error("Provider filled {received} of {requested} values")]
    ShortFill {
        /// Number of values requested.
        requested: usize,
        /// Number of values received.
        received: usize,
    },

    /// A fill was attempted without a connection.
    #[error("Provider is not connected")]
    NotConnected,

    /// The backend is unreachable for another reason.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced to the consumer of a random source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// `next_value` was called before any initialisation.
    #[error("Random source is not initialised")]
    NotInitialised,

    /// The source was disconnected and must be re-initialised.
    #[error("Random source is disconnected")]
    Disconnected,

    /// Sequence id outside the configured pool.
    #[error("Invalid sequence id {sequence_id}: must be in range [0, {max_sequence_id}]")]
    InvalidSequenceId {
        /// Requested id.
        sequence_id: u32,
        /// Largest valid id.
        max_sequence_id: u32,
    },

    /// Persisting a freshly generated block failed.
    #[error("Block storage failed: {0}")]
    Store(#[from] StoreError),

    /// Invalid block layout parameters.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The background loader could not be started.
    #[error("Failed to spawn background loader: {0}")]
    Spawn(#[source] std::io::Error),

    /// The background loader panicked; the source is unusable.
    #[error("Background loader panicked")]
    LoaderPanicked,

    /// A file-backed source points at a file that does not exist.
    #[error("{} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// A file-backed source read nothing twice in a row.
    #[error("Can't read values from {}", .0.display())]
    Exhausted(PathBuf),

    /// Reading a random file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A text random file contains a token that is not a number.
    #[error("Invalid value '{token}' in {}", .path.display())]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Offending token.
        token: String,
    },
}

/// Result type for random source operations.
pub type SourceResult<T> = Result<T, SourceError>;
