//! Random source construction from settings
//!
//! Sources are built explicitly and handed to the commands; nothing holds a
//! process-wide instance.

use infra_store::BlockStore;
use rng_source::{
    BufferedSource, FileSource, PrngProvider, QrngBinding, RandomSource, WebserviceProvider,
};
use tracing::info;

use crate::config::{ProviderKind, Settings, SourceKind};
use crate::{CliError, Result};

/// Native webservice binding, when one is linked in
pub type Binding = Box<dyn QrngBinding>;

/// Build the random source selected by `settings`
///
/// A webservice provider needs `binding`; without one the call fails with
/// [`CliError::MissingBinding`].
pub fn build_source(settings: &Settings, binding: Option<Binding>) -> Result<Box<dyn RandomSource>> {
    settings.validate()?;

    match settings.source {
        SourceKind::Buffered => {
            let layout = settings.buffered.layout()?;
            let store = BlockStore::open(&settings.buffered.data_dir, layout)?;

            let source: Box<dyn RandomSource> = match settings.buffered.provider {
                ProviderKind::Prng => {
                    let provider = match settings.buffered.seed {
                        Some(seed) => PrngProvider::from_seed(seed),
                        None => PrngProvider::from_entropy(),
                    };
                    info!(seed = provider.seed(), "Using seeded pseudo-random provider");
                    Box::new(BufferedSource::new(store, provider))
                }
                ProviderKind::Webservice => {
                    settings.check_credentials()?;
                    let binding = binding.ok_or(CliError::MissingBinding)?;
                    let provider =
                        WebserviceProvider::new(binding, settings.webservice.credentials());
                    Box::new(BufferedSource::new(store, provider))
                }
            };
            Ok(source)
        }
        SourceKind::File => {
            let file = &settings.file;
            if !file.path.exists() {
                return Err(CliError::FileNotFound(file.path.display().to_string()));
            }
            Ok(Box::new(FileSource::with_block_size(
                &file.path,
                file.format,
                file.block_size,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rng_source::SUCCESS_CODE;
    use tempfile::TempDir;

    struct EchoBinding;

    impl QrngBinding for EchoBinding {
        fn connect(&mut self, _username: &str, _password: &str) -> i32 {
            SUCCESS_CODE
        }

        fn get_double_array(&mut self, out: &mut [f64]) -> (i32, usize) {
            out.fill(0.5);
            (SUCCESS_CODE, out.len())
        }

        fn disconnect(&mut self) -> i32 {
            SUCCESS_CODE
        }
    }

    fn buffered_settings(dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.buffered.data_dir = dir.path().join("sequences");
        settings.buffered.block_size = 8;
        settings.buffered.max_values_per_file = 32;
        settings.buffered.seed = Some(42);
        settings
    }

    #[test]
    fn test_build_prng_source() {
        let dir = TempDir::new().unwrap();
        let settings = buffered_settings(&dir);

        let mut source = build_source(&settings, None).unwrap();
        assert_eq!(source.description(), "Seeded pseudo-random generator");
        source.initialize_repeatable(0).unwrap();
        assert!(source.next_value().unwrap() < 1.0);
        assert!(dir.path().join("sequences").join("RngSequence0").exists());
    }

    #[test]
    fn test_webservice_requires_credentials_and_binding() {
        let dir = TempDir::new().unwrap();
        let mut settings = buffered_settings(&dir);
        settings.buffered.provider = ProviderKind::Webservice;

        assert!(matches!(
            build_source(&settings, Some(Box::new(EchoBinding))),
            Err(CliError::Config(_))
        ));

        settings.webservice.username = "user".to_string();
        settings.webservice.password = "pass".to_string();
        assert!(matches!(
            build_source(&settings, None),
            Err(CliError::MissingBinding)
        ));

        let mut source = build_source(&settings, Some(Box::new(EchoBinding))).unwrap();
        assert_eq!(source.description(), "Qrng.physik.hu-berlin webservice");
        source.initialize_repeatable(1).unwrap();
        assert_eq!(source.next_value().unwrap(), 0.5);
    }

    #[test]
    fn test_file_source_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.source = SourceKind::File;
        settings.file.path = dir.path().join("missing.bin");

        assert!(matches!(
            build_source(&settings, None),
            Err(CliError::FileNotFound(_))
        ));

        std::fs::write(&settings.file.path, 0.25f64.to_ne_bytes()).unwrap();
        let mut source = build_source(&settings, None).unwrap();
        source.initialize_repeatable(0).unwrap();
        assert_eq!(source.next_value().unwrap(), 0.25);
    }
}
