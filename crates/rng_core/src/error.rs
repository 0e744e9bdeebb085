//! Error types for sequence layout validation.

use thiserror::Error;

/// Errors raised when a [`SequenceLayout`](crate::SequenceLayout) is built
/// from invalid parameters.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Block size must hold at least one value.
    #[error("Invalid block size {0}: must be at least 1")]
    InvalidBlockSize(usize),

    /// A file must be able to hold at least one full block.
    #[error(
        "Invalid file capacity {max_values_per_file}: must be at least the block size ({block_size})"
    )]
    FileTooSmall {
        /// Configured maximum number of values per file.
        max_values_per_file: u64,
        /// Configured block size.
        block_size: usize,
    },
}

/// Result type for layout construction.
pub type LayoutResult<T> = Result<T, LayoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_error_display() {
        let err = LayoutError::InvalidBlockSize(0);
        assert!(err.to_string().contains("Invalid block size 0"));

        let err = LayoutError::FileTooSmall {
            max_values_per_file: 10,
            block_size: 16,
        };
        let message = err.to_string();
        assert!(message.contains("10"));
        assert!(message.contains("16"));
    }
}
