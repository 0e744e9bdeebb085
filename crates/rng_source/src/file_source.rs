//! Random source reading pre-generated values from a user file.

use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rand::Rng;
use rng_core::block::decode_into;
use rng_core::{RestorePoint, DEFAULT_BLOCK_SIZE, VALUE_SIZE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{SourceError, SourceResult};
use crate::source::RandomSource;

/// Encoding of a random file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Flat native-endian `f64` array, no header.
    #[default]
    Binary,
    /// Whitespace-separated decimal numbers.
    Text,
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "binary" | "bin" => Ok(Self::Binary),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(format!(
                "Invalid file format: '{}'. Valid values: binary, text",
                s
            )),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Serves the values of a file block by block, wrapping to the start once
/// the end is reached.
///
/// The position of a file source is the index of the next value in the
/// file; [`initialize_repeatable`](RandomSource::initialize_repeatable)
/// interprets its argument the same way.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    format: FileFormat,
    block_size: usize,
    block: Vec<f64>,
    block_number: u64,
    current_index: usize,
    can_reload: bool,
    /// Parsed contents of a text file.
    text_values: Option<Vec<f64>>,
}

impl FileSource {
    /// Creates a source over `path` with the default block size.
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self::with_block_size(path, format, DEFAULT_BLOCK_SIZE)
    }

    /// Creates a source reading `block_size` values at a time.
    pub fn with_block_size(path: impl Into<PathBuf>, format: FileFormat, block_size: usize) -> Self {
        Self {
            path: path.into(),
            format,
            block_size: block_size.max(1),
            block: Vec::new(),
            block_number: 0,
            current_index: 0,
            can_reload: true,
            text_values: None,
        }
    }

    /// Path of the random file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encoding of the random file.
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Number of values available in the file.
    pub fn value_count(&mut self) -> SourceResult<u64> {
        self.ensure_exists()?;
        match self.format {
            FileFormat::Binary => {
                let len = fs::metadata(&self.path)
                    .map_err(|e| self.io_error(e))?
                    .len();
                Ok(len / VALUE_SIZE as u64)
            }
            FileFormat::Text => Ok(self.text_values()?.len() as u64),
        }
    }

    /// Moves to flat `position` and loads its block.
    pub fn seek(&mut self, position: u64) -> SourceResult<()> {
        let block_size = self.block_size as u64;
        self.block_number = position / block_size;
        self.current_index = (position % block_size) as usize;
        self.can_reload = true;
        self.load_block(self.block_number)?;
        debug!(
            path = %self.path.display(),
            position,
            values = self.block.len(),
            "File source positioned"
        );
        Ok(())
    }

    /// Loads the block after the current one, wrapping to block 0 once when
    /// the file has no more data.
    fn advance(&mut self) -> SourceResult<()> {
        self.block_number += 1;
        self.current_index = 0;
        self.load_block(self.block_number)?;
        if !self.block.is_empty() {
            self.can_reload = true;
            return Ok(());
        }

        if !self.can_reload {
            return Err(SourceError::Exhausted(self.path.clone()));
        }
        self.can_reload = false;
        warn!(path = %self.path.display(), "End of random file reached, wrapping to start");
        self.block_number = 0;
        self.load_block(0)?;
        if self.block.is_empty() {
            return Err(SourceError::Exhausted(self.path.clone()));
        }
        self.can_reload = true;
        Ok(())
    }

    fn load_block(&mut self, block_number: u64) -> SourceResult<()> {
        self.ensure_exists()?;
        let start = block_number * self.block_size as u64;
        match self.format {
            FileFormat::Binary => self.load_block_binary(start),
            FileFormat::Text => {
                let block_size = self.block_size;
                let values = self.text_values()?;
                let start = usize::try_from(start).unwrap_or(usize::MAX).min(values.len());
                let end = start.saturating_add(block_size).min(values.len());
                let block = values[start..end].to_vec();
                self.block = block;
                Ok(())
            }
        }
    }

    fn load_block_binary(&mut self, start: u64) -> SourceResult<()> {
        let mut file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let len = file.metadata().map_err(|e| self.io_error(e))?.len();
        let offset = start * VALUE_SIZE as u64;
        if offset >= len {
            self.block.clear();
            return Ok(());
        }

        file.seek(SeekFrom::Start(offset))
            .map_err(|e| self.io_error(e))?;
        let mut bytes = Vec::with_capacity(self.block_size * VALUE_SIZE);
        file.take((self.block_size * VALUE_SIZE) as u64)
            .read_to_end(&mut bytes)
            .map_err(|e| self.io_error(e))?;

        self.block.resize(bytes.len() / VALUE_SIZE, 0.0);
        decode_into(&bytes, &mut self.block);
        Ok(())
    }

    fn text_values(&mut self) -> SourceResult<&[f64]> {
        if self.text_values.is_none() {
            let contents = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
            let values = contents
                .split_whitespace()
                .map(|token| {
                    token.parse::<f64>().map_err(|_| SourceError::Parse {
                        path: self.path.clone(),
                        token: token.to_string(),
                    })
                })
                .collect::<SourceResult<Vec<_>>>()?;
            info!(path = %self.path.display(), values = values.len(), "Random text file parsed");
            self.text_values = Some(values);
        }
        Ok(self.text_values.as_deref().unwrap_or_default())
    }

    fn ensure_exists(&self) -> SourceResult<()> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(SourceError::FileNotFound(self.path.clone()))
        }
    }

    fn io_error(&self, source: std::io::Error) -> SourceError {
        SourceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RandomSource for FileSource {
    fn initialize_non_repeatable(&mut self) -> SourceResult<()> {
        let count = self.value_count()?;
        let position = if count == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..count)
        };
        info!(path = %self.path.display(), position, "Non-repeatable start point chosen");
        self.seek(position)
    }

    fn initialize_repeatable(&mut self, sequence_id: u32) -> SourceResult<()> {
        self.seek(u64::from(sequence_id))
    }

    fn load_state(&mut self, restore_point: &RestorePoint) -> SourceResult<()> {
        match *restore_point {
            RestorePoint::File { position } => self.seek(position),
            _ => {
                debug!(?restore_point, "Ignoring restore point of another source kind");
                Ok(())
            }
        }
    }

    fn state(&self) -> RestorePoint {
        RestorePoint::file(self.block_number * self.block_size as u64 + self.current_index as u64)
    }

    fn next_value(&mut self) -> SourceResult<f64> {
        while self.current_index >= self.block.len() {
            self.advance()?;
        }
        let value = self.block[self.current_index];
        self.current_index += 1;
        Ok(value)
    }

    fn description(&self) -> &str {
        "Random numbers from file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rng_core::block::encode;
    use tempfile::TempDir;

    fn binary_file(dir: &TempDir, values: &[f64]) -> PathBuf {
        let path = dir.path().join("random.bin");
        fs::write(&path, encode(values)).unwrap();
        path
    }

    #[test]
    fn test_file_format_from_str() {
        assert_eq!("binary".parse::<FileFormat>().unwrap(), FileFormat::Binary);
        assert_eq!("TEXT".parse::<FileFormat>().unwrap(), FileFormat::Text);
        assert!("csv".parse::<FileFormat>().is_err());
        assert_eq!(FileFormat::Text.to_string(), "text");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut source = FileSource::new(dir.path().join("absent.bin"), FileFormat::Binary);
        assert!(matches!(
            source.initialize_repeatable(0),
            Err(SourceError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_repeatable_id_is_position() {
        let dir = TempDir::new().unwrap();
        let path = binary_file(&dir, &[0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        let mut source = FileSource::with_block_size(path, FileFormat::Binary, 3);

        source.initialize_repeatable(4).unwrap();
        assert_eq!(source.state(), RestorePoint::file(4));
        assert_eq!(source.next_value().unwrap(), 0.4);
        assert_eq!(source.next_value().unwrap(), 0.5);
        assert_eq!(source.next_value().unwrap(), 0.6);
        assert_eq!(source.state(), RestorePoint::file(7));
    }

    #[test]
    fn test_value_count_binary_floors_partial_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("odd.bin");
        let mut bytes = encode(&[1.0, 2.0]);
        bytes.extend_from_slice(&[0u8; 3]);
        fs::write(&path, bytes).unwrap();

        let mut source = FileSource::new(path, FileFormat::Binary);
        assert_eq!(source.value_count().unwrap(), 2);
    }

    #[test]
    fn test_text_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, "0.1 0.2 oops").unwrap();

        let mut source = FileSource::new(path, FileFormat::Text);
        assert!(matches!(
            source.initialize_repeatable(0),
            Err(SourceError::Parse { token, .. }) if token == "oops"
        ));
    }

    #[test]
    fn test_description() {
        let source = FileSource::new("random.bin", FileFormat::Binary);
        assert_eq!(source.description(), "Random numbers from file");
    }
}
