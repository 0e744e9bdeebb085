//! Inspect command implementation
//!
//! Lists persisted sequence files, or summarises the configured random file.

use std::io::Write;

use infra_store::BlockStore;
use rng_source::FileSource;
use tracing::info;

use crate::config::{Settings, SourceKind};
use crate::{CliError, Result};

/// Run the inspect command, writing the report to `out`
pub fn run(settings: &Settings, out: &mut impl Write) -> Result<()> {
    settings.validate()?;

    match settings.source {
        SourceKind::Buffered => inspect_store(settings, out),
        SourceKind::File => inspect_file(settings, out),
    }
}

fn inspect_store(settings: &Settings, out: &mut impl Write) -> Result<()> {
    let layout = settings.buffered.layout()?;
    let store = BlockStore::open(&settings.buffered.data_dir, layout)?;
    let files = store.sequence_files()?;
    info!(
        "Inspecting {} ({} sequence files)",
        store.root().display(),
        files.len()
    );

    writeln!(out, "{:<6} {:>14} {:>10} {:>8}", "id", "values", "blocks", "full")?;
    for file in &files {
        let blocks = file.value_count / layout.block_size() as u64;
        let full = file.value_count >= layout.blocks_per_file() * layout.block_size() as u64;
        writeln!(
            out,
            "{:<6} {:>14} {:>10} {:>8}",
            file.sequence_id,
            file.value_count,
            blocks,
            if full { "yes" } else { "no" }
        )?;
    }
    if files.is_empty() {
        writeln!(out, "(no sequence files in {})", store.root().display())?;
    }
    Ok(())
}

fn inspect_file(settings: &Settings, out: &mut impl Write) -> Result<()> {
    let file = &settings.file;
    if !file.path.exists() {
        return Err(CliError::FileNotFound(file.path.display().to_string()));
    }
    let mut source = FileSource::with_block_size(&file.path, file.format, file.block_size);
    let count = source.value_count()?;

    writeln!(out, "path:   {}", file.path.display())?;
    writeln!(out, "format: {}", file.format)?;
    writeln!(out, "values: {}", count)?;
    Ok(())
}
