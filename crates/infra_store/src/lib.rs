//! # Block Storage (Infra Layer)
//!
//! Durable storage for blocks of random values. Each sequence id maps to one
//! file in the data directory holding a flat, headerless array of
//! native-endian `f64` values; the file length alone encodes how many values
//! it holds.
//!
//! - [`BlockStore`]: byte-exact block reads and appends with file rollover
//! - [`BlockAddress`]: the `(sequence id, block number)` a load or save targets
//! - [`BlockStatus`]: outcome of a load ("nothing cached" is not an error)
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use infra_store::{BlockAddress, BlockStore};
//! use rng_core::SequenceLayout;
//!
//! let layout = SequenceLayout::new(4, 8, 9)?;
//! let store = BlockStore::open("rng_sequences", layout)?;
//!
//! let mut address = BlockAddress::new(0, 0);
//! store.save(&mut address, &[0.1, 0.2, 0.3, 0.4])?;
//!
//! let mut block = vec![0.0; 4];
//! let status = store.load(&mut BlockAddress::new(0, 0), &mut block);
//! assert!(status.is_valid());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod store;

pub use error::{StoreError, StoreResult};
pub use store::{BlockAddress, BlockStatus, BlockStore, SequenceFile, FILE_PREFIX};
