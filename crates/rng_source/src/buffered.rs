//! Double-buffered, disk-persisted random source.
//!
//! Values are served from one of two block buffers while the other is filled
//! by a single background loader thread. The loader first looks for the block
//! in the [`BlockStore`]; only blocks that are not cached are requested from
//! the provider, and freshly generated blocks are appended to the store so the
//! stream can be replayed later.
//!
//! # Ownership model
//!
//! No lock guards the buffers. When a load starts, the target buffer and the
//! loader context (store, provider connection, load cursor) are moved into
//! the background thread; joining the thread hands both back. The consumer
//! therefore can never observe a buffer that is being written, and at most
//! one load is in flight because a new one needs the context the previous
//! one still owns.

use std::mem;
use std::thread::{self, JoinHandle};

use infra_store::{BlockAddress, BlockStatus, BlockStore, StoreError};
use rand::Rng;
use rng_core::block::{invalid_block, invalidate};
use rng_core::{RestorePoint, SequenceLayout};
use tracing::{debug, info, warn};

use crate::error::{SourceError, SourceResult};
use crate::provider::{Connection, Provider};
use crate::source::RandomSource;

/// Name of the background loader thread.
pub const LOADER_THREAD_NAME: &str = "rng-prefetch";

/// Lifecycle of a [`BufferedSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceState {
    /// Created, not yet initialised.
    Uninitialised,
    /// Serving values.
    Ready,
    /// Torn down; must be initialised again before use.
    Disconnected,
}

/// How a block reached its buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Download {
    /// Read from the store.
    Cached(BlockStatus),
    /// Generated by the provider and persisted.
    Fetched,
    /// Generated by the provider but not persisted, because the sequence
    /// file does not end where the block starts.
    Unpersisted,
    /// Neither cached nor obtainable; the buffer holds the sentinel.
    Unavailable,
}

/// Everything the loader needs, owned by whichever side is loading.
#[derive(Debug)]
struct LoadContext<P> {
    store: BlockStore,
    connection: Connection<P>,
    /// Sequence id targeted by the next load.
    sequence_id: u32,
    /// Block number (within `sequence_id`) of the next load, before rollover.
    next_block: u64,
}

impl<P: Provider> LoadContext<P> {
    fn next_address(&self) -> BlockAddress {
        BlockAddress::new(self.sequence_id, self.next_block)
    }

    fn advance_past(&mut self, address: BlockAddress) {
        self.sequence_id = address.sequence_id;
        self.next_block = address.block_number + 1;
    }

    /// Reads the next block from the store only.
    fn load_cached(&mut self, block: &mut [f64]) -> (BlockAddress, BlockStatus) {
        let mut address = self.next_address();
        let status = self.store.load(&mut address, block);
        self.advance_past(address);
        (address, status)
    }

    /// Moves the cursor over the next block without reading it.
    fn skip_block(&mut self) {
        let mut address = self.next_address();
        self.store.apply_rollover(&mut address);
        self.advance_past(address);
    }

    /// Materialises the next block: from the store if cached, otherwise from
    /// the provider, persisting what it produced.
    ///
    /// A block that cannot be appended at its own offset (the file ends
    /// earlier, e.g. after a failed fetch) is served but not persisted.
    fn download(&mut self, block: &mut [f64]) -> SourceResult<Download> {
        let (mut address, status) = self.load_cached(block);
        if status.is_valid() {
            return Ok(Download::Cached(status));
        }

        if let Err(err) = self.connection.fill(block) {
            warn!(
                sequence_id = address.sequence_id,
                block = address.block_number,
                error = %err,
                "Provider could not fill block"
            );
            invalidate(block);
            return Ok(Download::Unavailable);
        }

        match self.store.save(&mut address, block) {
            Ok(()) => Ok(Download::Fetched),
            Err(StoreError::Misaligned {
                file_len, expected, ..
            }) => {
                warn!(
                    sequence_id = address.sequence_id,
                    block = address.block_number,
                    file_len,
                    expected,
                    "Sequence file does not end at this block, serving it unpersisted"
                );
                Ok(Download::Unpersisted)
            }
            Err(err) => {
                invalidate(block);
                Err(err.into())
            }
        }
    }
}

/// What a finished background load hands back.
struct LoadReport<P> {
    context: LoadContext<P>,
    buffer: Vec<f64>,
    outcome: SourceResult<Download>,
}

enum Loader<P> {
    Idle(LoadContext<P>),
    Loading {
        handle: JoinHandle<LoadReport<P>>,
        slot: usize,
        /// Connection flag of the context moved into the thread; a load
        /// never changes it.
        connected: bool,
    },
    /// The loader thread panicked or could not be started.
    Poisoned,
}

/// Random source that prefetches blocks in the background and persists
/// every generated block for exact replay.
///
/// # Examples
///
/// ```rust,no_run
/// use infra_store::BlockStore;
/// use rng_core::SequenceLayout;
/// use rng_source::{BufferedSource, PrngProvider};
///
/// let store = BlockStore::open("rng_sequences", SequenceLayout::default()).unwrap();
/// let mut source = BufferedSource::new(store, PrngProvider::from_seed(42));
///
/// source.initialize_repeatable(0).unwrap();
/// let first = source.next_value().unwrap();
/// let checkpoint = source.state();
///
/// source.initialize_repeatable(0).unwrap();
/// assert_eq!(source.next_value().unwrap(), first);
/// # let _ = checkpoint;
/// ```
pub struct BufferedSource<P: Provider> {
    layout: SequenceLayout,
    buffers: [Vec<f64>; 2],
    active: usize,
    current_index: usize,
    position: u64,
    starting_sequence_id: u32,
    loader: Loader<P>,
    state: SourceState,
    description: String,
}

impl<P: Provider> BufferedSource<P> {
    /// Creates an uninitialised source over `store`, generating missing
    /// blocks with `provider`.
    pub fn new(store: BlockStore, provider: P) -> Self {
        let layout = *store.layout();
        let description = provider.description().to_string();
        Self {
            layout,
            buffers: [
                invalid_block(layout.block_size()),
                invalid_block(layout.block_size()),
            ],
            active: 0,
            current_index: layout.block_size(),
            position: 0,
            starting_sequence_id: 0,
            loader: Loader::Idle(LoadContext {
                store,
                connection: Connection::new(provider),
                sequence_id: 0,
                next_block: 0,
            }),
            state: SourceState::Uninitialised,
            description,
        }
    }

    /// Layout used to address blocks.
    #[inline]
    pub fn layout(&self) -> &SequenceLayout {
        &self.layout
    }

    /// Current lifecycle state.
    #[inline]
    pub fn lifecycle(&self) -> SourceState {
        self.state
    }

    /// Whether the provider connection is open.
    #[inline]
    pub fn is_connected(&self) -> bool {
        match &self.loader {
            Loader::Idle(context) => context.connection.is_connected(),
            Loader::Loading { connected, .. } => *connected,
            Loader::Poisoned => false,
        }
    }

    /// Description of the underlying provider.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Snapshot of the current position.
    pub fn state(&self) -> RestorePoint {
        RestorePoint::buffered(self.starting_sequence_id, self.position)
    }

    /// Starts the stream of `sequence_id` from position 0.
    ///
    /// Block 0 is materialised before returning; block 1 is prefetched.
    ///
    /// # Errors
    ///
    /// - [`SourceError::InvalidSequenceId`] if `sequence_id` is outside the pool
    /// - [`SourceError::Store`] if persisting a block failed, either the first
    ///   block or a background load still pending from before
    pub fn initialize_repeatable(&mut self, sequence_id: u32) -> SourceResult<()> {
        self.check_sequence_id(sequence_id)?;
        self.join_loader()?;

        let Loader::Idle(context) = &mut self.loader else {
            return Err(SourceError::LoaderPanicked);
        };
        context.connection.connect();
        context.sequence_id = sequence_id;
        context.next_block = 0;

        self.starting_sequence_id = sequence_id;
        self.position = 0;
        self.current_index = 0;
        self.active = 0;
        self.state = SourceState::Ready;

        let download = match context.download(&mut self.buffers[0]) {
            Ok(download) => download,
            Err(err) => {
                context.skip_block();
                invalidate(&mut self.buffers[1]);
                return Err(err);
            }
        };
        info!(sequence_id, ?download, "Repeatable stream initialised");

        self.spawn_download(1)
    }

    /// Starts at a random position of an already persisted sequence.
    pub fn initialize_non_repeatable(&mut self) -> SourceResult<()> {
        self.initialize_non_repeatable_with(&mut rand::thread_rng())
    }

    /// Like [`initialize_non_repeatable`](Self::initialize_non_repeatable),
    /// drawing the sequence id and position from `rng`.
    ///
    /// An empty sequence file falls back to
    /// [`initialize_repeatable`](Self::initialize_repeatable) at position 0.
    pub fn initialize_non_repeatable_with<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> SourceResult<()> {
        let sequence_id = rng.gen_range(0..=self.layout.max_sequence_id());
        self.join_loader()?;

        let Loader::Idle(context) = &self.loader else {
            return Err(SourceError::LoaderPanicked);
        };
        let count = context.store.value_count(sequence_id)?;
        if count == 0 {
            info!(sequence_id, "Sequence file empty, starting repeatable stream");
            return self.initialize_repeatable(sequence_id);
        }

        let position = rng.gen_range(0..count);
        info!(sequence_id, position, "Non-repeatable start point chosen");
        self.load_state(&RestorePoint::buffered(sequence_id, position))
    }

    /// Resumes the stream described by `restore_point`.
    ///
    /// Only blocks already in the store are read synchronously. If the
    /// restored block holds no data the buffer serves NaN until the next
    /// block, and nothing is prefetched for it.
    pub fn load_state(&mut self, restore_point: &RestorePoint) -> SourceResult<()> {
        let RestorePoint::Buffered {
            sequence_id,
            position,
        } = *restore_point
        else {
            debug!(?restore_point, "Ignoring restore point of another source kind");
            return Ok(());
        };
        self.check_sequence_id(sequence_id)?;
        self.join_loader()?;

        let location = self.layout.locate(sequence_id, position);
        let Loader::Idle(context) = &mut self.loader else {
            return Err(SourceError::LoaderPanicked);
        };
        context.connection.connect();
        context.sequence_id = location.sequence_id;
        context.next_block = location.block_number;

        let (_, status) = context.load_cached(&mut self.buffers[0]);

        self.starting_sequence_id = sequence_id;
        self.position = position;
        self.current_index = location.index;
        self.active = 0;
        self.state = SourceState::Ready;

        if status.is_valid() {
            info!(sequence_id, position, "Stream restored");
            self.spawn_download(1)
        } else {
            warn!(
                sequence_id = location.sequence_id,
                block = location.block_number,
                position,
                "Restored block is not in the store"
            );
            // Nothing is prefetched, so buffer 1 stands in for the following
            // block even if the store holds it; skipping keeps later loads
            // at their own positions.
            context.skip_block();
            invalidate(&mut self.buffers[1]);
            Ok(())
        }
    }

    /// Returns the next value.
    ///
    /// Blocks only when the active buffer is exhausted and the prefetch of
    /// the next one has not finished yet.
    ///
    /// # Errors
    ///
    /// - [`SourceError::NotInitialised`] / [`SourceError::Disconnected`]
    /// - [`SourceError::Store`] if the last background load failed to persist
    ///   its block
    /// - [`SourceError::LoaderPanicked`]
    pub fn next_value(&mut self) -> SourceResult<f64> {
        match self.state {
            SourceState::Ready => {}
            SourceState::Uninitialised => return Err(SourceError::NotInitialised),
            SourceState::Disconnected => return Err(SourceError::Disconnected),
        }

        if self.current_index >= self.layout.block_size() {
            self.join_loader()?;
            let exhausted = self.active;
            self.active = 1 - exhausted;
            self.current_index = 0;
            self.spawn_download(exhausted)?;
            debug!(buffer = self.active, position = self.position, "Buffers swapped");
        }

        let value = self.buffers[self.active][self.current_index];
        self.current_index += 1;
        self.position += 1;
        Ok(value)
    }

    /// Opens the provider connection. Returns whether it is open.
    pub fn connect(&mut self) -> SourceResult<bool> {
        self.join_loader()?;
        let Loader::Idle(context) = &mut self.loader else {
            return Err(SourceError::LoaderPanicked);
        };
        Ok(context.connection.connect())
    }

    /// Waits for any outstanding load and closes the provider connection.
    ///
    /// The source must be initialised again before further use. An error
    /// from the outstanding load is returned after the teardown completed.
    pub fn disconnect(&mut self) -> SourceResult<()> {
        let joined = self.join_loader();
        if let Loader::Idle(context) = &mut self.loader {
            context.connection.disconnect();
        }
        self.state = SourceState::Disconnected;
        joined
    }

    fn check_sequence_id(&self, sequence_id: u32) -> SourceResult<()> {
        let max_sequence_id = self.layout.max_sequence_id();
        if sequence_id > max_sequence_id {
            return Err(SourceError::InvalidSequenceId {
                sequence_id,
                max_sequence_id,
            });
        }
        Ok(())
    }

    /// Waits for the in-flight load, if any, and takes back its buffer and
    /// context.
    fn join_loader(&mut self) -> SourceResult<()> {
        match mem::replace(&mut self.loader, Loader::Poisoned) {
            Loader::Idle(context) => {
                self.loader = Loader::Idle(context);
                Ok(())
            }
            Loader::Poisoned => Err(SourceError::LoaderPanicked),
            Loader::Loading { handle, slot, .. } => {
                let report = handle.join().map_err(|_| SourceError::LoaderPanicked)?;
                self.buffers[slot] = report.buffer;
                self.loader = Loader::Idle(report.context);
                let download = report.outcome?;
                debug!(buffer = slot, ?download, "Background load joined");
                Ok(())
            }
        }
    }

    /// Starts loading the next block into buffer `slot`. The loader must be
    /// idle.
    fn spawn_download(&mut self, slot: usize) -> SourceResult<()> {
        debug_assert_ne!(slot, self.active, "never load into the active buffer");
        let Loader::Idle(mut context) = mem::replace(&mut self.loader, Loader::Poisoned) else {
            return Err(SourceError::LoaderPanicked);
        };
        let connected = context.connection.is_connected();
        let mut buffer = mem::take(&mut self.buffers[slot]);

        let handle = thread::Builder::new()
            .name(LOADER_THREAD_NAME.to_string())
            .spawn(move || {
                let outcome = context.download(&mut buffer);
                LoadReport {
                    context,
                    buffer,
                    outcome,
                }
            })
            .map_err(SourceError::Spawn)?;

        self.loader = Loader::Loading {
            handle,
            slot,
            connected,
        };
        Ok(())
    }
}

impl<P: Provider> Drop for BufferedSource<P> {
    fn drop(&mut self) {
        if let Err(err) = self.disconnect() {
            warn!(error = %err, "Error while releasing random source");
        }
    }
}

impl<P: Provider> RandomSource for BufferedSource<P> {
    fn initialize_non_repeatable(&mut self) -> SourceResult<()> {
        BufferedSource::initialize_non_repeatable(self)
    }

    fn initialize_repeatable(&mut self, sequence_id: u32) -> SourceResult<()> {
        BufferedSource::initialize_repeatable(self, sequence_id)
    }

    fn load_state(&mut self, restore_point: &RestorePoint) -> SourceResult<()> {
        BufferedSource::load_state(self, restore_point)
    }

    fn state(&self) -> RestorePoint {
        BufferedSource::state(self)
    }

    fn next_value(&mut self) -> SourceResult<f64> {
        BufferedSource::next_value(self)
    }

    fn disconnect(&mut self) -> SourceResult<()> {
        BufferedSource::disconnect(self)
    }

    fn description(&self) -> &str {
        BufferedSource::description(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    /// Yields 1, 2, 3, ... across consecutive fills.
    struct CountingProvider {
        next: f64,
    }

    impl Provider for CountingProvider {
        fn connect(&mut self) -> Result<(), ProviderError> {
            Ok(())
        }

        fn fill(&mut self, block: &mut [f64]) -> Result<(), ProviderError> {
            for value in block.iter_mut() {
                *value = self.next;
                self.next += 1.0;
            }
            Ok(())
        }

        fn disconnect(&mut self) -> Result<(), ProviderError> {
            Ok(())
        }

        fn description(&self) -> &str {
            "counting"
        }
    }

    struct OfflineProvider;

    impl Provider for OfflineProvider {
        fn connect(&mut self) -> Result<(), ProviderError> {
            Err(ProviderError::Unavailable("offline".into()))
        }

        fn fill(&mut self, _block: &mut [f64]) -> Result<(), ProviderError> {
            Err(ProviderError::Unavailable("offline".into()))
        }

        fn disconnect(&mut self) -> Result<(), ProviderError> {
            Ok(())
        }

        fn description(&self) -> &str {
            "offline"
        }
    }

    fn store(dir: &TempDir) -> BlockStore {
        BlockStore::open(dir.path(), SequenceLayout::new(4, 8, 9).unwrap()).unwrap()
    }

    fn counting(dir: &TempDir) -> BufferedSource<CountingProvider> {
        BufferedSource::new(store(dir), CountingProvider { next: 1.0 })
    }

    fn take(source: &mut impl RandomSource, n: usize) -> Vec<f64> {
        (0..n).map(|_| source.next_value().unwrap()).collect()
    }

    #[test]
    fn test_next_value_before_initialisation() {
        let dir = TempDir::new().unwrap();
        let mut source = counting(&dir);
        assert_eq!(source.lifecycle(), SourceState::Uninitialised);
        assert!(matches!(
            source.next_value(),
            Err(SourceError::NotInitialised)
        ));
    }

    #[test]
    fn test_initialize_repeatable_serves_in_order() {
        let dir = TempDir::new().unwrap();
        let mut source = counting(&dir);
        source.initialize_repeatable(0).unwrap();

        assert!(source.is_connected());
        assert_eq!(take(&mut source, 10), (1..=10).map(f64::from).collect::<Vec<_>>());
        assert_eq!(source.state(), RestorePoint::buffered(0, 10));
    }

    #[test]
    fn test_swaps_alternate_between_buffers() {
        let dir = TempDir::new().unwrap();
        let mut source = counting(&dir);
        source.initialize_repeatable(0).unwrap();

        assert_eq!(take(&mut source, 4), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(source.active, 0);

        assert_eq!(source.next_value().unwrap(), 5.0);
        assert_eq!(source.active, 1);
        assert!(matches!(source.loader, Loader::Loading { slot: 0, .. }));

        take(&mut source, 4);
        assert_eq!(source.active, 0);
        assert!(matches!(source.loader, Loader::Loading { slot: 1, .. }));
    }

    #[test]
    fn test_connection_flag_follows_loader() {
        let dir = TempDir::new().unwrap();
        let mut source = counting(&dir);
        assert!(!source.is_connected());

        source.initialize_repeatable(0).unwrap();
        assert!(matches!(source.loader, Loader::Loading { .. }));
        assert!(source.is_connected());

        source.join_loader().unwrap();
        assert!(source.is_connected());
        assert!(source.connect().unwrap());

        source.disconnect().unwrap();
        assert!(!source.is_connected());
        assert!(source.connect().unwrap());
        assert!(source.is_connected());
    }

    #[test]
    fn test_invalid_sequence_id_rejected() {
        let dir = TempDir::new().unwrap();
        let mut source = counting(&dir);
        assert!(matches!(
            source.initialize_repeatable(10),
            Err(SourceError::InvalidSequenceId {
                sequence_id: 10,
                max_sequence_id: 9
            })
        ));
        assert!(matches!(
            source.load_state(&RestorePoint::buffered(42, 0)),
            Err(SourceError::InvalidSequenceId { .. })
        ));
    }

    #[test]
    fn test_foreign_restore_point_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut source = counting(&dir);
        source.initialize_repeatable(0).unwrap();
        take(&mut source, 3);

        source.load_state(&RestorePoint::file(0)).unwrap();

        assert_eq!(source.state(), RestorePoint::buffered(0, 3));
        assert_eq!(source.next_value().unwrap(), 4.0);
    }

    #[test]
    fn test_offline_provider_serves_nan() {
        let dir = TempDir::new().unwrap();
        let mut source = BufferedSource::new(store(&dir), OfflineProvider);
        source.initialize_repeatable(2).unwrap();

        assert!(!source.is_connected());
        let values = take(&mut source, 9);
        assert!(values.iter().all(|v| v.is_nan()));
        assert_eq!(source.state().position(), 9);
    }

    #[test]
    fn test_disconnect_then_reinitialise() {
        let dir = TempDir::new().unwrap();
        let mut source = counting(&dir);
        source.initialize_repeatable(0).unwrap();
        take(&mut source, 5);

        source.disconnect().unwrap();
        assert!(!source.is_connected());
        assert!(matches!(source.next_value(), Err(SourceError::Disconnected)));

        source.initialize_repeatable(0).unwrap();
        assert!(source.is_connected());
        assert_eq!(source.next_value().unwrap(), 1.0);
    }

    #[test]
    fn test_non_repeatable_on_empty_store_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let mut source = counting(&dir);
        let mut rng = StdRng::seed_from_u64(7);
        source.initialize_non_repeatable_with(&mut rng).unwrap();

        assert_eq!(source.state().position(), 0);
        assert_eq!(source.next_value().unwrap(), 1.0);
    }

    #[test]
    fn test_non_repeatable_reads_known_data() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        for sequence_id in 0..=9 {
            let base = f64::from(sequence_id) * 100.0;
            store
                .save(
                    &mut BlockAddress::new(sequence_id, 0),
                    &[base, base + 1.0, base + 2.0, base + 3.0],
                )
                .unwrap();
        }

        let mut source = BufferedSource::new(store, OfflineProvider);
        let mut rng = StdRng::seed_from_u64(11);
        source.initialize_non_repeatable_with(&mut rng).unwrap();

        let point = source.state();
        let sequence_id = point.sequence_id().unwrap();
        let position = point.position();
        assert!(position < 4);
        let expected = f64::from(sequence_id) * 100.0 + position as f64;
        assert_eq!(source.next_value().unwrap(), expected);
    }

    #[test]
    fn test_description_comes_from_provider() {
        let dir = TempDir::new().unwrap();
        let source = counting(&dir);
        assert_eq!(source.description(), "counting");
    }
}
