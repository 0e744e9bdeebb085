//! Draw command implementation
//!
//! Initialises the configured source and prints values, one per line.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rng_core::RestorePoint;
use tracing::{info, warn};

use crate::config::Settings;
use crate::source::build_source;
use crate::{CliError, Result};

/// How the source is positioned before drawing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPoint {
    /// Unpredictable point of the existing data
    NonRepeatable,
    /// Start of the given sequence
    Sequence(u32),
    /// Restore point stored as JSON
    Restore(PathBuf),
}

/// Options of the draw command
#[derive(Debug, Clone)]
pub struct DrawOptions {
    pub count: usize,
    pub start: StartPoint,
    pub save_state: Option<PathBuf>,
}

/// Read a restore point written by `--save-state`
pub fn read_restore_point(path: &Path) -> Result<RestorePoint> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write `point` as pretty-printed JSON
pub fn write_restore_point(path: &Path, point: &RestorePoint) -> Result<()> {
    let json = serde_json::to_string_pretty(point)?;
    fs::write(path, json)?;
    Ok(())
}

/// Run the draw command, writing values to `out`
pub fn run(settings: &Settings, options: &DrawOptions, out: &mut impl Write) -> Result<()> {
    info!("Starting draw...");
    info!("  Source: {}", settings.source);
    info!("  Count: {}", options.count);

    let mut source = build_source(settings, None)?;

    match &options.start {
        StartPoint::NonRepeatable => source.initialize_non_repeatable()?,
        StartPoint::Sequence(sequence_id) => source.initialize_repeatable(*sequence_id)?,
        StartPoint::Restore(path) => {
            let point = read_restore_point(path)?;
            info!("  Restoring: {:?}", point);
            source.load_state(&point)?;
        }
    }

    let mut invalid = 0usize;
    for _ in 0..options.count {
        let value = source.next_value()?;
        if value.is_nan() {
            invalid += 1;
        }
        writeln!(out, "{value}")?;
    }
    out.flush()?;

    if invalid > 0 {
        warn!("{} of {} values were unavailable (NaN)", invalid, options.count);
    }

    let point = source.state();
    if let Some(path) = &options.save_state {
        write_restore_point(path, &point)?;
        info!("Restore point written to {}", path.display());
    }

    source.disconnect()?;
    info!("Draw complete at {:?}", point);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.buffered.data_dir = dir.path().join("sequences");
        settings.buffered.block_size = 8;
        settings.buffered.max_values_per_file = 32;
        settings.buffered.seed = Some(7);
        settings
    }

    fn parse(out: &[u8]) -> Vec<f64> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|l| l.parse().unwrap())
            .collect()
    }

    #[test]
    fn test_draw_save_and_restore() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        let state_path = dir.path().join("state.json");

        let mut first = Vec::new();
        run(
            &settings,
            &DrawOptions {
                count: 30,
                start: StartPoint::Sequence(2),
                save_state: None,
            },
            &mut first,
        )
        .unwrap();
        let all = parse(&first);
        assert_eq!(all.len(), 30);

        let mut head = Vec::new();
        run(
            &settings,
            &DrawOptions {
                count: 11,
                start: StartPoint::Sequence(2),
                save_state: Some(state_path.clone()),
            },
            &mut head,
        )
        .unwrap();
        assert_eq!(parse(&head), all[..11].to_vec());
        assert_eq!(
            read_restore_point(&state_path).unwrap(),
            RestorePoint::buffered(2, 11)
        );

        let mut tail = Vec::new();
        run(
            &settings,
            &DrawOptions {
                count: 19,
                start: StartPoint::Restore(state_path),
                save_state: None,
            },
            &mut tail,
        )
        .unwrap();
        assert_eq!(parse(&tail), all[11..].to_vec());
    }

    #[test]
    fn test_missing_restore_file() {
        let dir = TempDir::new().unwrap();
        let result = run(
            &settings(&dir),
            &DrawOptions {
                count: 1,
                start: StartPoint::Restore(dir.path().join("absent.json")),
                save_state: None,
            },
            &mut Vec::new(),
        );
        assert!(matches!(result, Err(CliError::FileNotFound(_))));
    }

    #[test]
    fn test_file_source_draw() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("numbers.txt");
        fs::write(&path, "0.5 0.25\n0.125").unwrap();

        let mut settings = settings(&dir);
        settings.source = SourceKind::File;
        settings.file.path = path;
        settings.file.format = rng_source::FileFormat::Text;

        let mut out = Vec::new();
        run(
            &settings,
            &DrawOptions {
                count: 4,
                start: StartPoint::Sequence(1),
                save_state: None,
            },
            &mut out,
        )
        .unwrap();
        assert_eq!(parse(&out), vec![0.25, 0.125, 0.5, 0.25]);
    }
}
