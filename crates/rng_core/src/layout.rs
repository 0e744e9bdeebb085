//! Position arithmetic for block-structured, file-capped random streams.
//!
//! A logical stream starts at some sequence id and is stored as a run of
//! files, each holding at most `max_values_per_file` values grouped in blocks
//! of `block_size`. When a file is full the stream continues under the next
//! sequence id, wrapping after `max_sequence_id`.

use crate::error::{LayoutError, LayoutResult};

/// Size in bytes of one persisted value.
pub const VALUE_SIZE: usize = std::mem::size_of::<f64>();

/// Number of values fetched from a provider per block.
pub const DEFAULT_BLOCK_SIZE: usize = 100_000;

/// Maximum number of values stored in a single sequence file.
pub const DEFAULT_MAX_VALUES_PER_FILE: u64 = 64_000_000;

/// Largest sequence id; ids wrap to 0 after it.
pub const DEFAULT_MAX_SEQUENCE_ID: u32 = 9;

/// Where a flat stream position lives on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamLocation {
    /// Sequence id of the file holding the value.
    pub sequence_id: u32,
    /// Block number within that file.
    pub block_number: u64,
    /// Offset of the value inside the block.
    pub index: usize,
}

/// Immutable description of how a stream is split into blocks and files.
///
/// # Examples
///
/// ```rust
/// use rng_core::SequenceLayout;
///
/// let layout = SequenceLayout::new(4, 8, 9).unwrap();
/// assert_eq!(layout.blocks_per_file(), 2);
/// assert!(!layout.needs_rollover(1));
/// assert!(layout.needs_rollover(2));
/// assert_eq!(layout.next_sequence_id(9), 0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceLayout {
    block_size: usize,
    max_values_per_file: u64,
    max_sequence_id: u32,
}

impl SequenceLayout {
    /// Creates a layout after validating its parameters.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] if `block_size` is zero or a file cannot hold
    /// a single block.
    pub fn new(
        block_size: usize,
        max_values_per_file: u64,
        max_sequence_id: u32,
    ) -> LayoutResult<Self> {
        if block_size == 0 {
            return Err(LayoutError::InvalidBlockSize(block_size));
        }
        if max_values_per_file < block_size as u64 {
            return Err(LayoutError::FileTooSmall {
                max_values_per_file,
                block_size,
            });
        }
        Ok(Self {
            block_size,
            max_values_per_file,
            max_sequence_id,
        })
    }

    /// Number of values per block.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Maximum number of values per sequence file.
    #[inline]
    pub fn max_values_per_file(&self) -> u64 {
        self.max_values_per_file
    }

    /// Largest sequence id before wrapping to 0.
    #[inline]
    pub fn max_sequence_id(&self) -> u32 {
        self.max_sequence_id
    }

    /// Number of distinct sequence ids in the pool.
    #[inline]
    pub fn sequence_count(&self) -> u64 {
        u64::from(self.max_sequence_id) + 1
    }

    /// Number of whole blocks a single file can hold.
    #[inline]
    pub fn blocks_per_file(&self) -> u64 {
        self.max_values_per_file / self.block_size as u64
    }

    /// Block size in bytes.
    #[inline]
    pub fn block_bytes(&self) -> u64 {
        (self.block_size * VALUE_SIZE) as u64
    }

    /// Byte offset of `block_number` within its file.
    #[inline]
    pub fn byte_offset(&self, block_number: u64) -> u64 {
        block_number * self.block_bytes()
    }

    /// Unadjusted block number (not folded into a file) of a flat position.
    #[inline]
    pub fn block_number_of(&self, position: u64) -> u64 {
        position / self.block_size as u64
    }

    /// Offset of `position` inside `block_number`.
    #[inline]
    pub fn offset_of(&self, position: u64, block_number: u64) -> usize {
        (position - block_number * self.block_size as u64) as usize
    }

    /// Number of file rollovers implied by an unadjusted block number.
    #[inline]
    pub fn sequence_offset_for(&self, block_number: u64) -> u64 {
        block_number / self.blocks_per_file()
    }

    /// Block number inside its file for an unadjusted block number.
    #[inline]
    pub fn block_number_within_file(&self, block_number: u64) -> u64 {
        block_number % self.blocks_per_file()
    }

    /// Whether `block_number` would not fit in the current file.
    #[inline]
    pub fn needs_rollover(&self, block_number: u64) -> bool {
        (block_number + 1) * self.block_size as u64 > self.max_values_per_file
    }

    /// The sequence id following `sequence_id`, wrapping at the pool size.
    #[inline]
    pub fn next_sequence_id(&self, sequence_id: u32) -> u32 {
        self.advance_sequence_id(sequence_id, 1)
    }

    /// `sequence_id` moved forward by `offset` files, wrapping at the pool size.
    #[inline]
    pub fn advance_sequence_id(&self, sequence_id: u32, offset: u64) -> u32 {
        ((u64::from(sequence_id) + offset) % self.sequence_count()) as u32
    }

    /// Resolves a flat position of a stream started at `starting_sequence_id`.
    pub fn locate(&self, starting_sequence_id: u32, position: u64) -> StreamLocation {
        let unadjusted = self.block_number_of(position);
        StreamLocation {
            sequence_id: self
                .advance_sequence_id(starting_sequence_id, self.sequence_offset_for(unadjusted)),
            block_number: self.block_number_within_file(unadjusted),
            index: self.offset_of(position, unadjusted),
        }
    }

    /// Inverse of [`locate`](Self::locate): the flat position reached after
    /// `sequence_offset` full files, `block_within_file` blocks and `index`
    /// values.
    pub fn position_of(&self, sequence_offset: u64, block_within_file: u64, index: usize) -> u64 {
        (sequence_offset * self.blocks_per_file() + block_within_file) * self.block_size as u64
            + index as u64
    }
}

impl Default for SequenceLayout {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_values_per_file: DEFAULT_MAX_VALUES_PER_FILE,
            max_sequence_id: DEFAULT_MAX_SEQUENCE_ID,
        }
    }
}
