//! Error types for block storage.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting blocks.
///
/// Load failures never surface as errors; they degrade to a missing block.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O operation on a sequence file or the data directory failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file does not end where the block has to be written.
    #[error(
        "Block {block_number} of sequence {sequence_id} cannot be appended: file holds {file_len} bytes, expected {expected}"
    )]
    Misaligned {
        /// Target sequence id.
        sequence_id: u32,
        /// Target block number within the file.
        block_number: u64,
        /// Current file length in bytes.
        file_len: u64,
        /// Byte offset the block belongs at.
        expected: u64,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::io(
            "/tmp/RngSequence3",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("RngSequence3"));
        assert!(message.contains("denied"));

        let err = StoreError::Misaligned {
            sequence_id: 2,
            block_number: 5,
            file_len: 32,
            expected: 160,
        };
        assert!(err.to_string().contains("Block 5 of sequence 2"));
    }
}
