//! # Random Stream Core (Layer 1)
//!
//! Pure building blocks shared by every layer of the workspace:
//!
//! - [`SequenceLayout`]: maps a flat stream position onto
//!   `(sequence id, block number, intra-block index)` and back, including the
//!   per-file capacity cap and sequence-id wraparound
//! - [`RestorePoint`]: immutable snapshot that lets a consumer resume an exact
//!   position within a stream
//! - [`block`]: the NaN sentinel used to mark blocks with no valid data
//!
//! Nothing in this crate performs I/O.
//!
//! ## Usage Example
//!
//! ```rust
//! use rng_core::SequenceLayout;
//!
//! let layout = SequenceLayout::new(100_000, 100_000, 9).unwrap();
//!
//! // One block per file: position 150_000 of a stream started at id 3
//! // lives in the file for id 4.
//! let location = layout.locate(3, 150_000);
//! assert_eq!(location.sequence_id, 4);
//! assert_eq!(location.block_number, 0);
//! assert_eq!(location.index, 50_000);
//! ```

pub mod block;
mod error;
mod layout;
mod restore;

pub use error::{LayoutError, LayoutResult};
pub use layout::{
    SequenceLayout, StreamLocation, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_SEQUENCE_ID,
    DEFAULT_MAX_VALUES_PER_FILE, VALUE_SIZE,
};
pub use restore::RestorePoint;
