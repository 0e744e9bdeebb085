//! Restore points for resuming a stream at an exact position.
//!
//! Each source variant owns one restore-point kind. A source handed a kind
//! that is not its own leaves its state untouched; callers are responsible
//! for pairing restore points with the source that produced them.

use serde::{Deserialize, Serialize};

/// Immutable snapshot of a consumer's position in a random stream.
///
/// # Examples
///
/// ```rust
/// use rng_core::RestorePoint;
///
/// let point = RestorePoint::buffered(3, 150_000);
/// assert_eq!(point.position(), 150_000);
/// assert_eq!(point.sequence_id(), Some(3));
///
/// let file_point = RestorePoint::file(42);
/// assert_eq!(file_point.sequence_id(), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RestorePoint {
    /// Position within a persisted, block-buffered stream.
    Buffered {
        /// Sequence id the stream was started from.
        sequence_id: u32,
        /// Values produced since the stream was started.
        position: u64,
    },

    /// Position within a user-supplied random file.
    File {
        /// Values consumed from the start of the file.
        position: u64,
    },
}

impl RestorePoint {
    /// Creates a restore point for a buffered stream.
    #[inline]
    pub fn buffered(sequence_id: u32, position: u64) -> Self {
        Self::Buffered {
            sequence_id,
            position,
        }
    }

    /// Creates a restore point for a file-backed stream.
    #[inline]
    pub fn file(position: u64) -> Self {
        Self::File { position }
    }

    /// Flat position recorded in the snapshot.
    #[inline]
    pub fn position(&self) -> u64 {
        match *self {
            Self::Buffered { position, .. } | Self::File { position } => position,
        }
    }

    /// Starting sequence id, for kinds that have one.
    #[inline]
    pub fn sequence_id(&self) -> Option<u32> {
        match *self {
            Self::Buffered { sequence_id, .. } => Some(sequence_id),
            Self::File { .. } => None,
        }
    }
}
