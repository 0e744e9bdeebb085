//! File-per-sequence block store.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rng_core::block::{decode_into, encode, invalidate, SENTINEL};
use rng_core::{SequenceLayout, VALUE_SIZE};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// File name prefix of every sequence file; the id is appended in decimal.
pub const FILE_PREFIX: &str = "RngSequence";

/// Target of a block load or save.
///
/// Loads and saves apply the rollover rule in place, so after a call the
/// address names the file and block that were actually accessed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockAddress {
    /// Sequence id of the target file.
    pub sequence_id: u32,
    /// Block number within that file.
    pub block_number: u64,
}

impl BlockAddress {
    /// Creates a new address.
    #[inline]
    pub fn new(sequence_id: u32, block_number: u64) -> Self {
        Self {
            sequence_id,
            block_number,
        }
    }
}

/// Outcome of a block load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockStatus {
    /// The whole block was read from disk.
    Loaded,
    /// The file ended inside the block; the tail holds the sentinel.
    Truncated {
        /// Number of values actually read.
        values: usize,
    },
    /// Nothing is stored at this block; the buffer holds the sentinel.
    Missing,
}

impl BlockStatus {
    /// Whether the buffer starts with real data.
    #[inline]
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Missing)
    }
}

/// A sequence file present on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceFile {
    /// Sequence id encoded in the file name.
    pub sequence_id: u32,
    /// Full path of the file.
    pub path: PathBuf,
    /// Number of whole values the file holds.
    pub value_count: u64,
}

/// Durable storage of fixed-size blocks, one file per sequence id.
///
/// The store is cheap to clone; clones share nothing but the directory path
/// and layout. Files are assumed to have a single writer.
#[derive(Clone, Debug)]
pub struct BlockStore {
    root: PathBuf,
    layout: SequenceLayout,
}

impl BlockStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>, layout: SequenceLayout) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        info!(
            root = %root.display(),
            block_size = layout.block_size(),
            max_values_per_file = layout.max_values_per_file(),
            max_sequence_id = layout.max_sequence_id(),
            "Block store opened"
        );
        Ok(Self { root, layout })
    }

    /// Directory holding the sequence files.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Layout used to address blocks.
    #[inline]
    pub fn layout(&self) -> &SequenceLayout {
        &self.layout
    }

    /// Path of the file backing `sequence_id`.
    pub fn path_for(&self, sequence_id: u32) -> PathBuf {
        self.root.join(format!("{FILE_PREFIX}{sequence_id}"))
    }

    /// Moves `address` to block 0 of the next sequence id if the block would
    /// overflow its file. Returns `true` if a rollover happened.
    pub fn apply_rollover(&self, address: &mut BlockAddress) -> bool {
        if !self.layout.needs_rollover(address.block_number) {
            return false;
        }
        let next = self.layout.next_sequence_id(address.sequence_id);
        debug!(
            from = address.sequence_id,
            to = next,
            block = address.block_number,
            "Sequence file full, rolling over"
        );
        address.sequence_id = next;
        address.block_number = 0;
        true
    }

    /// Loads the addressed block into `out`.
    ///
    /// Missing files are created empty. A block at or past the end of its
    /// file, or any I/O failure, leaves `out` filled with the sentinel and
    /// reports [`BlockStatus::Missing`].
    pub fn load(&self, address: &mut BlockAddress, out: &mut [f64]) -> BlockStatus {
        debug_assert_eq!(out.len(), self.layout.block_size());
        self.apply_rollover(address);

        match self.read_block(*address, out) {
            Ok(status) => {
                debug!(
                    sequence_id = address.sequence_id,
                    block = address.block_number,
                    ?status,
                    "Block loaded from store"
                );
                status
            }
            Err(err) => {
                warn!(
                    sequence_id = address.sequence_id,
                    block = address.block_number,
                    error = %err,
                    "Block read failed, treating as missing"
                );
                invalidate(out);
                BlockStatus::Missing
            }
        }
    }

    fn read_block(&self, address: BlockAddress, out: &mut [f64]) -> io::Result<BlockStatus> {
        let path = self.path_for(address.sequence_id);
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let file_len = file.metadata()?.len();
        let offset = self.layout.byte_offset(address.block_number);
        if offset >= file_len {
            invalidate(out);
            return Ok(BlockStatus::Missing);
        }

        file.seek(SeekFrom::Start(offset))?;
        let want = (out.len() * VALUE_SIZE) as u64;
        let mut bytes = Vec::with_capacity(want as usize);
        Read::by_ref(&mut file).take(want).read_to_end(&mut bytes)?;

        let values = decode_into(&bytes, out);
        out[values..].fill(SENTINEL);

        Ok(match values {
            0 => BlockStatus::Missing,
            v if v == out.len() => BlockStatus::Loaded,
            v => BlockStatus::Truncated { values: v },
        })
    }

    /// Appends `block` to the addressed sequence file.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Misaligned`] if the file does not end exactly where the
    ///   block starts
    /// - [`StoreError::Io`] if the file cannot be opened or written
    pub fn save(&self, address: &mut BlockAddress, block: &[f64]) -> StoreResult<()> {
        self.apply_rollover(address);
        let path = self.path_for(address.sequence_id);

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        let file_len = file_len(&file, &path)?;
        let expected = self.layout.byte_offset(address.block_number);
        if file_len != expected {
            return Err(StoreError::Misaligned {
                sequence_id: address.sequence_id,
                block_number: address.block_number,
                file_len,
                expected,
            });
        }

        file.write_all(&encode(block))
            .and_then(|_| file.flush())
            .map_err(|e| StoreError::io(&path, e))?;

        debug!(
            sequence_id = address.sequence_id,
            block = address.block_number,
            "Block appended to store"
        );
        Ok(())
    }

    /// Number of whole values stored for `sequence_id` (0 if the file is absent).
    pub fn value_count(&self, sequence_id: u32) -> StoreResult<u64> {
        Ok(self.byte_len(sequence_id)? / VALUE_SIZE as u64)
    }

    /// Lists every sequence file of the id pool that exists on disk.
    pub fn sequence_files(&self) -> StoreResult<Vec<SequenceFile>> {
        let mut files = Vec::new();
        for sequence_id in 0..=self.layout.max_sequence_id() {
            let path = self.path_for(sequence_id);
            if !path.exists() {
                continue;
            }
            let value_count = self.value_count(sequence_id)?;
            files.push(SequenceFile {
                sequence_id,
                path,
                value_count,
            });
        }
        Ok(files)
    }

    fn byte_len(&self, sequence_id: u32) -> StoreResult<u64> {
        let path = self.path_for(sequence_id);
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

fn file_len(file: &File, path: &Path) -> StoreResult<u64> {
    file.metadata()
        .map(|meta| meta.len())
        .map_err(|e| StoreError::io(path, e))
}
