//! Check command implementation
//!
//! Validates the settings, the data directory and provider credentials
//! without drawing any values.

use infra_store::BlockStore;
use tracing::{info, warn};

use crate::config::{ProviderKind, Settings, SourceKind};
use crate::{CliError, Result};

/// Run the check command
pub fn run(settings: &Settings) -> Result<()> {
    info!("Checking configuration...");
    info!("  Log level: {}", settings.log_level);
    info!("  Source: {}", settings.source);

    settings.validate()?;

    match settings.source {
        SourceKind::Buffered => {
            let buffered = &settings.buffered;
            let layout = buffered.layout()?;
            info!(
                "  Layout: {} values/block, {} blocks/file, ids 0..={}",
                layout.block_size(),
                layout.blocks_per_file(),
                layout.max_sequence_id()
            );
            if buffered.max_values_per_file % buffered.block_size as u64 != 0 {
                warn!(
                    "max_values_per_file ({}) is not a multiple of block_size ({}); the remainder of each file is unused",
                    buffered.max_values_per_file, buffered.block_size
                );
            }

            let store = BlockStore::open(&buffered.data_dir, layout)?;
            info!("  Data directory: {} (ok)", store.root().display());

            info!("  Provider: {}", buffered.provider);
            settings.check_credentials()?;
            if buffered.provider == ProviderKind::Webservice {
                info!("  Webservice user: {}", settings.webservice.username);
            }
        }
        SourceKind::File => {
            let file = &settings.file;
            if !file.path.exists() {
                return Err(CliError::FileNotFound(file.path.display().to_string()));
            }
            info!("  Random file: {} ({})", file.path.display(), file.format);
        }
    }

    info!("Configuration OK");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.buffered.data_dir = dir.path().join("data");

        run(&settings).unwrap();
        assert!(dir.path().join("data").is_dir());
    }

    #[test]
    fn test_check_reports_missing_credentials() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.buffered.data_dir = dir.path().to_path_buf();
        settings.buffered.provider = ProviderKind::Webservice;

        assert!(matches!(run(&settings), Err(CliError::Config(_))));
    }

    #[test]
    fn test_check_missing_random_file() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.source = SourceKind::File;
        settings.file.path = dir.path().join("nope.bin");

        assert!(matches!(run(&settings), Err(CliError::FileNotFound(_))));
    }
}
