//! CLI configuration management
//!
//! Settings are assembled from, in increasing priority: defaults, a TOML
//! file, `RNGSTREAM_*` environment variables and command-line arguments.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rng_core::{
    LayoutError, SequenceLayout, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_SEQUENCE_ID,
    DEFAULT_MAX_VALUES_PER_FILE,
};
use rng_source::{Credentials, FileFormat};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the data directory.
pub const ENV_DATA_DIR: &str = "RNGSTREAM_DATA_DIR";
/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "RNGSTREAM_LOG_LEVEL";
/// Environment variable overriding the source kind.
pub const ENV_SOURCE: &str = "RNGSTREAM_SOURCE";
/// Environment variable holding the webservice user name.
pub const ENV_QRNG_USERNAME: &str = "RNGSTREAM_QRNG_USERNAME";
/// Environment variable holding the webservice password.
pub const ENV_QRNG_PASSWORD: &str = "RNGSTREAM_QRNG_PASSWORD";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid source: {0}. Must be one of: buffered, file")]
    InvalidSource(String),

    #[error("Invalid provider: {0}. Must be one of: prng, webservice")]
    InvalidProvider(String),

    #[error("Invalid block layout: {0}")]
    InvalidLayout(#[from] LayoutError),

    #[error("Webservice credentials are missing (set [webservice] or RNGSTREAM_QRNG_USERNAME/RNGSTREAM_QRNG_PASSWORD)")]
    MissingCredentials,

    #[error("No random file configured for the file source")]
    MissingFilePath,

    #[error("Configuration file error: {0}")]
    FileError(String),
}

/// Log levels supported by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// Which random source the CLI drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    /// Double-buffered source persisting blocks under the data directory
    #[default]
    Buffered,
    /// Values read from a user file
    File,
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buffered" => Ok(SourceKind::Buffered),
            "file" => Ok(SourceKind::File),
            _ => Err(ConfigError::InvalidSource(s.to_string())),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Buffered => write!(f, "buffered"),
            SourceKind::File => write!(f, "file"),
        }
    }
}

/// Backend generating blocks for the buffered source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Prng,
    Webservice,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prng" => Ok(ProviderKind::Prng),
            "webservice" | "qrng" => Ok(ProviderKind::Webservice),
            _ => Err(ConfigError::InvalidProvider(s.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Prng => write!(f, "prng"),
            ProviderKind::Webservice => write!(f, "webservice"),
        }
    }
}

fn deserialize_from_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let s = String::deserialize(deserializer)?;
    T::from_str(&s).map_err(serde::de::Error::custom)
}

/// `[buffered]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferedSettings {
    /// Directory holding the sequence files
    pub data_dir: PathBuf,
    /// Values per block
    pub block_size: usize,
    /// Cap on values per sequence file
    pub max_values_per_file: u64,
    /// Largest sequence id
    pub max_sequence_id: u32,
    /// Provider used for blocks not yet persisted
    #[serde(deserialize_with = "deserialize_from_str")]
    pub provider: ProviderKind,
    /// Seed of the pseudo-random provider (random if absent)
    pub seed: Option<u64>,
}

impl Default for BufferedSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("rng_sequences"),
            block_size: DEFAULT_BLOCK_SIZE,
            max_values_per_file: DEFAULT_MAX_VALUES_PER_FILE,
            max_sequence_id: DEFAULT_MAX_SEQUENCE_ID,
            provider: ProviderKind::Prng,
            seed: None,
        }
    }
}

impl BufferedSettings {
    /// Block layout described by these settings
    pub fn layout(&self) -> Result<SequenceLayout, ConfigError> {
        Ok(SequenceLayout::new(
            self.block_size,
            self.max_values_per_file,
            self.max_sequence_id,
        )?)
    }
}

/// `[webservice]` section
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebserviceSettings {
    pub username: String,
    pub password: String,
}

impl WebserviceSettings {
    /// Credentials handed to the webservice provider
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

impl fmt::Debug for WebserviceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebserviceSettings")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `[file]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    /// Random file to read
    pub path: PathBuf,
    /// Encoding of the file
    pub format: FileFormat,
    /// Values read per block
    pub block_size: usize,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("random.bin"),
            format: FileFormat::Binary,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Top-level settings structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level
    #[serde(deserialize_with = "deserialize_from_str")]
    pub log_level: LogLevel,
    /// Source driven by the commands
    #[serde(deserialize_with = "deserialize_from_str")]
    pub source: SourceKind,
    pub buffered: BufferedSettings,
    pub webservice: WebserviceSettings,
    pub file: FileSettings,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;

        let settings: Settings = toml::from_str(&content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Override values from `RNGSTREAM_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Override values from variables returned by `lookup`
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(data_dir) = lookup(ENV_DATA_DIR) {
            self.buffered.data_dir = PathBuf::from(data_dir);
        }
        if let Some(log_level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = LogLevel::from_str(&log_level)?;
        }
        if let Some(source) = lookup(ENV_SOURCE) {
            self.source = SourceKind::from_str(&source)?;
        }
        if let Some(username) = lookup(ENV_QRNG_USERNAME) {
            self.webservice.username = username;
        }
        if let Some(password) = lookup(ENV_QRNG_PASSWORD) {
            self.webservice.password = password;
        }
        Ok(())
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if let Some(data_dir) = &cli.data_dir {
            self.buffered.data_dir = data_dir.clone();
        }
        if let Some(log_level) = &cli.log_level {
            self.log_level = LogLevel::from_str(log_level)?;
        }
        if let Some(source) = &cli.source {
            self.source = SourceKind::from_str(source)?;
        }
        Ok(())
    }

    /// Validate the settings of the selected source
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.source {
            SourceKind::Buffered => {
                self.buffered.layout()?;
            }
            SourceKind::File => {
                if self.file.path.as_os_str().is_empty() {
                    return Err(ConfigError::MissingFilePath);
                }
                if self.file.block_size == 0 {
                    return Err(LayoutError::InvalidBlockSize(0).into());
                }
            }
        }
        Ok(())
    }

    /// Startup check: a webservice provider needs complete credentials
    pub fn check_credentials(&self) -> Result<(), ConfigError> {
        let uses_webservice = self.source == SourceKind::Buffered
            && self.buffered.provider == ProviderKind::Webservice;
        if uses_webservice && !self.webservice.credentials().is_complete() {
            return Err(ConfigError::MissingCredentials);
        }
        Ok(())
    }
}

/// Overrides taken from the command line
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: Option<PathBuf>,
    /// Data directory override
    pub data_dir: Option<PathBuf>,
    /// Log level override
    pub log_level: Option<String>,
    /// Source kind override
    pub source: Option<String>,
}

/// Build settings from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Config file
/// 4. Default values
pub fn build_config(cli: &CliArgs) -> Result<Settings, ConfigError> {
    build_config_with(cli, |key| std::env::var(key).ok())
}

fn build_config_with<F>(cli: &CliArgs, lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = match &cli.config_file {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    settings.apply_env_with(lookup)?;
    settings.merge_with_cli(cli)?;

    settings.validate()?;
    Ok(settings)
}
