//! Blob extraction pipeline
//!
//! Pulls blobs out of a reader one at a time and hands each one to a sink:
//! a writer in one of the [`OutputFormat`]s, or a directory with one file
//! per blob. Nothing but the current blob is held in memory.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::config::{Config, OutputFormat, UnitMode};
use crate::tokenizer::{BlobTokenizer, ByteSource, CharSource, Source, Units};
use crate::Result;

/// Totals for one input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Number of blobs handed to the sink
    pub blobs: usize,
    /// Sum of blob sizes in bytes
    pub bytes: u64,
}

impl ExtractStats {
    /// Accumulate another input's totals
    pub fn merge(&mut self, other: ExtractStats) {
        self.blobs += other.blobs;
        self.bytes += other.bytes;
    }
}

/// Run the tokenizer configured by `config` over `reader`, calling
/// `on_blob` with the 1-based index and encoded bytes of every blob.
///
/// Stops early once `config.limit` blobs have been seen. A read error
/// aborts with `source_name` in the error context.
pub fn for_each_blob<R, F>(
    reader: R,
    config: &Config,
    source_name: &str,
    mut on_blob: F,
) -> Result<ExtractStats>
where
    R: BufRead,
    F: FnMut(usize, &[u8]) -> Result<()>,
{
    match config.unit {
        UnitMode::Chars => {
            let tokenizer = BlobTokenizer::with_capacity(
                CharSource::new(reader),
                config.open.clone(),
                config.close.clone(),
                config.buffer_capacity,
            )?;
            drain(tokenizer, config.limit, source_name, &mut on_blob)
        }
        UnitMode::Bytes => {
            let tokenizer = BlobTokenizer::with_capacity(
                ByteSource::new(reader),
                config.open.as_bytes().to_vec(),
                config.close.as_bytes().to_vec(),
                config.buffer_capacity,
            )?;
            drain(tokenizer, config.limit, source_name, &mut on_blob)
        }
    }
}

fn drain<S, F>(
    mut tokenizer: BlobTokenizer<S>,
    limit: Option<usize>,
    source_name: &str,
    on_blob: &mut F,
) -> Result<ExtractStats>
where
    S: Source,
    F: FnMut(usize, &[u8]) -> Result<()>,
{
    let mut stats = ExtractStats::default();

    while !limit.is_some_and(|max| stats.blobs >= max)
        && tokenizer
            .has_next()
            .with_context(|| format!("failed to read blobs from {source_name}"))?
    {
        let blob = tokenizer.next_blob()?;
        let bytes = blob.as_bytes();
        stats.blobs += 1;
        stats.bytes += bytes.len() as u64;
        on_blob(stats.blobs, bytes)?;
    }

    debug!(
        source = source_name,
        blobs = stats.blobs,
        bytes = stats.bytes,
        units_read = tokenizer.units_read(),
        "finished extracting"
    );
    Ok(stats)
}

/// Write one blob in the given format
fn write_blob<W: Write>(
    writer: &mut W,
    format: OutputFormat,
    separator: &[u8],
    blob: &[u8],
) -> Result<()> {
    match format {
        OutputFormat::Lines => {
            writer.write_all(blob)?;
            writer.write_all(separator)?;
        }
        OutputFormat::Nul => {
            writer.write_all(blob)?;
            writer.write_all(b"\0")?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, &String::from_utf8_lossy(blob))?;
            writer.write_all(b"\n")?;
        }
        OutputFormat::Count => {}
    }
    Ok(())
}

/// Extract blobs from `reader` and write them to `writer`.
///
/// In [`OutputFormat::Count`] nothing is written; the caller reports the
/// returned totals.
pub fn extract<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    config: &Config,
    source_name: &str,
) -> Result<ExtractStats> {
    let separator = config.separator_bytes();
    let stats = for_each_blob(reader, config, source_name, |_, blob| {
        write_blob(writer, config.output, &separator, blob)
    })?;
    writer.flush()?;
    Ok(stats)
}

/// Path of the `index`-th blob file for `stem` inside `dir`
#[must_use]
pub fn blob_file_path(dir: &Path, stem: &str, index: usize, extension: &str) -> PathBuf {
    if extension.is_empty() {
        dir.join(format!("{stem}-{index:06}"))
    } else {
        dir.join(format!("{stem}-{index:06}.{extension}"))
    }
}

/// Blob file stem for each input, in order.
///
/// An input keeps its file stem when no other input shares it. Inputs with
/// a shared stem are named after their parent directories as well, so
/// `a/dump.xml` and `b/dump.xml` become `a-dump` and `b-dump`.
#[must_use]
pub fn output_stems(inputs: &[PathBuf]) -> Vec<String> {
    fn file_stem(path: &Path) -> String {
        path.file_stem()
            .map_or_else(|| "blob".to_string(), |s| s.to_string_lossy().into_owned())
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for path in inputs {
        *counts.entry(file_stem(path)).or_default() += 1;
    }

    inputs
        .iter()
        .map(|path| {
            let stem = file_stem(path);
            if counts[&stem] == 1 {
                return stem;
            }
            let mut parts: Vec<String> = path
                .parent()
                .into_iter()
                .flat_map(Path::components)
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect();
            parts.push(stem);
            parts.join("-")
        })
        .collect()
}

/// Extract blobs from `reader` into `dir`, one file per blob, named
/// `<stem>-<index>.<extension>` with a zero-padded 1-based index.
///
/// Existing files are never overwritten: a name collision fails the input.
pub fn split_to_dir<R: BufRead>(
    reader: R,
    config: &Config,
    dir: &Path,
    stem: &str,
) -> Result<ExtractStats> {
    fs::create_dir_all(dir)
        .with_context(|| format!("cannot create output directory {}", dir.display()))?;

    for_each_blob(reader, config, stem, |index, blob| {
        let path = blob_file_path(dir, stem, index, &config.extension);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        file.write_all(blob)
            .with_context(|| format!("cannot write {}", path.display()))
    })
}
