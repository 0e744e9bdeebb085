//! # Random Sources (Source layer)
//!
//! Consumer-facing random streams built on the block store:
//!
//! - [`BufferedSource`]: serves values from two alternating block buffers,
//!   prefetching the next block on a background thread and persisting every
//!   block it obtains from a [`Provider`] so the stream can be replayed
//! - [`FileSource`]: serves the contents of a user-supplied random file
//! - [`RandomSource`]: the capability both implement, so consumers can hold a
//!   `Box<dyn RandomSource>` chosen at runtime
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use infra_store::BlockStore;
//! use rng_core::SequenceLayout;
//! use rng_source::{BufferedSource, PrngProvider, RandomSource};
//!
//! let store = BlockStore::open("rng_sequences", SequenceLayout::default())?;
//! let mut source: Box<dyn RandomSource> =
//!     Box::new(BufferedSource::new(store, PrngProvider::from_seed(42)));
//!
//! source.initialize_repeatable(3)?;
//! let value = source.next_value()?;
//! let restore_point = source.state();
//!
//! // Later, possibly in another process:
//! source.load_state(&restore_point)?;
//! # let _ = value;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Failure policy
//!
//! Provider failures never surface as errors: the affected block is served
//! as NaN. Failures to persist a block are returned by the next call that
//! waits on the background loader.

mod buffered;
mod error;
mod file_source;
pub mod provider;
mod source;

pub use buffered::{BufferedSource, SourceState, LOADER_THREAD_NAME};
pub use error::{ProviderError, SourceError, SourceResult};
pub use file_source::{FileFormat, FileSource};
pub use provider::{
    Credentials, PrngProvider, Provider, QrngBinding, WebserviceProvider, SUCCESS_CODE,
};
pub use source::RandomSource;
