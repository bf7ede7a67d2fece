//! blobstream - Extract marker-delimited blobs from huge text streams

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::fs::File;
use std::io::{self, BufReader, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Context;
use blobstream::config::OutputFormat;
use blobstream::process::{extract, output_stems, split_to_dir, ExtractStats};
use blobstream::{parse_args, CliArgs, Config, Result, UnitMode};
use glob::Pattern;
use rayon::prelude::*;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Read buffer for input files; the tokenizer pulls one unit at a time from it
const READ_BUFFER_SIZE: usize = 64 * 1024;

fn main() -> Result<()> {
    let args = parse_args();
    init_logging(args.debug);

    let use_stdin =
        args.inputs.is_empty() || (args.inputs.len() == 1 && args.inputs[0].as_os_str() == "-");

    if args.inputs.is_empty() && io::stdin().is_terminal() {
        blobstream::build_cli().print_help()?;
        println!();
        return Ok(());
    }

    // Explicit config or the one discovered from the working directory
    let base_config = build_config(&args, None)?;

    if use_stdin {
        return process_stdin(&base_config, &args);
    }

    if let Some(jobs) = args.jobs {
        if jobs > 0 {
            if let Err(e) = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build_global()
            {
                warn!("failed to configure thread pool: {e}");
            }
        }
    }

    let files = collect_files(&args, &base_config.input_extensions);

    if files.is_empty() {
        if !args.silent {
            eprintln!("No input files found.");
        }
        return Ok(());
    }

    // Per-file discovery only when no explicit config was given
    let shared_config = args.config.is_some().then_some(&base_config);

    let (total, errors) = if base_config.output_dir.is_some() && args.jobs != Some(1) {
        process_files_parallel(&files, shared_config, &args)
    } else {
        process_files_sequential(&files, shared_config, &args)
    };

    if !args.silent {
        eprintln!(
            "Extracted {} blobs ({} bytes) from {} inputs.",
            total.blobs,
            total.bytes,
            files.len() - errors
        );
    }

    if errors > 0 {
        anyhow::bail!("{errors} of {} inputs failed", files.len());
    }
    Ok(())
}

/// Install the stderr log subscriber; `RUST_LOG` wins over `--debug`
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Build configuration from CLI args and optional config file
///
/// If `for_path` is provided and no explicit config file is specified,
/// uses auto-discovery to find config files in parent directories.
fn build_config(args: &CliArgs, for_path: Option<&Path>) -> Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        debug!("using explicit config file: {}", config_path.display());
        Config::from_toml_file(config_path)
            .with_context(|| format!("cannot load config {}", config_path.display()))?
    } else {
        let start = match for_path {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir().unwrap_or_default(),
        };
        Config::from_discovered_files(&start)
    };

    // Override with CLI arguments
    if let Some(open) = &args.open {
        config.open.clone_from(open);
    }
    if let Some(close) = &args.close {
        config.close.clone_from(close);
    }
    if args.bytes {
        config.unit = UnitMode::Bytes;
    }
    if let Some(format) = args.format {
        config.output = format;
    }
    if let Some(separator) = &args.separator {
        config.separator.clone_from(separator);
    }
    if let Some(limit) = args.limit {
        config.limit = Some(limit);
    }
    if let Some(capacity) = args.buffer_capacity {
        config.buffer_capacity = capacity;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(extension) = &args.extension {
        config.extension.clone_from(extension);
    }
    if !args.input_extensions.is_empty() {
        config.input_extensions.clone_from(&args.input_extensions);
    }

    debug!(?config, "effective configuration");

    if let Some(error) = config.validate() {
        anyhow::bail!("Invalid configuration: {error}");
    }

    Ok(config)
}

/// Collect all files to process, handling directories and recursive flag
fn collect_files(args: &CliArgs, extensions: &[String]) -> Vec<PathBuf> {
    let exclude_patterns: Vec<Pattern> = args
        .exclude
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!("ignoring invalid exclude pattern '{p}': {e}");
                None
            }
        })
        .collect();

    let mut files = Vec::new();

    for input in &args.inputs {
        if input.is_file() {
            if !is_excluded(input, &exclude_patterns) {
                files.push(input.clone());
            }
        } else if input.is_dir() {
            if args.recursive {
                // WalkDir reports symlink loops as errors; those entries are skipped
                for entry in WalkDir::new(input)
                    .follow_links(true)
                    .max_depth(256)
                    .into_iter()
                    .filter_map(std::result::Result::ok)
                {
                    let path = entry.path();
                    if path.is_file()
                        && has_input_extension(path, extensions)
                        && !is_excluded(path, &exclude_patterns)
                    {
                        files.push(path.to_path_buf());
                    }
                }
            } else if let Ok(entries) = std::fs::read_dir(input) {
                for entry in entries.filter_map(std::result::Result::ok) {
                    let path = entry.path();
                    if path.is_file()
                        && has_input_extension(&path, extensions)
                        && !is_excluded(&path, &exclude_patterns)
                    {
                        files.push(path);
                    }
                }
            }
        } else {
            warn!("skipping {}: no such file or directory", input.display());
        }
    }

    files.sort();
    files.dedup();
    files
}

/// Check if a path matches any exclusion pattern
fn is_excluded(path: &Path, patterns: &[Pattern]) -> bool {
    if patterns.is_empty() {
        return false;
    }

    let path_str = path.to_string_lossy();

    for pattern in patterns {
        if pattern.matches(&path_str) {
            return true;
        }

        if let Some(file_name) = path.file_name() {
            if pattern.matches(&file_name.to_string_lossy()) {
                return true;
            }
        }

        // Directory patterns match any component
        for component in path.components() {
            if let std::path::Component::Normal(c) = component {
                if pattern.matches(&c.to_string_lossy()) {
                    return true;
                }
            }
        }
    }

    false
}

/// Check if a file has one of the configured input extensions (case-insensitive)
fn has_input_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions.iter().any(|wanted| {
                let wanted = wanted.strip_prefix('.').unwrap_or(wanted);
                ext.eq_ignore_ascii_case(wanted)
            })
        })
}

/// Resolve the config for one file
fn config_for(path: &Path, shared: Option<&Config>, args: &CliArgs) -> Result<Config> {
    match shared {
        Some(config) => Ok(config.clone()),
        None => build_config(args, Some(path)),
    }
}

/// Process files one after another, keeping stdout output in input order
fn process_files_sequential(
    files: &[PathBuf],
    shared: Option<&Config>,
    args: &CliArgs,
) -> (ExtractStats, usize) {
    let mut total = ExtractStats::default();
    let mut errors = 0;
    let labelled = files.len() > 1;
    let stems = output_stems(files);
    let mut stdout = io::stdout().lock();

    for (path, stem) in files.iter().zip(&stems) {
        let result = config_for(path, shared, args).and_then(|config| {
            process_single_file(path, stem, &config, labelled, &mut stdout)
        });
        match result {
            Ok(stats) => total.merge(stats),
            Err(e) => {
                errors += 1;
                eprintln!("Error processing {}: {e:#}", path.display());
            }
        }
    }

    (total, errors)
}

/// Process files in parallel using Rayon; each file gets its own tokenizer
fn process_files_parallel(
    files: &[PathBuf],
    shared: Option<&Config>,
    args: &CliArgs,
) -> (ExtractStats, usize) {
    let total = Mutex::new(ExtractStats::default());
    let error_count = AtomicUsize::new(0);
    let stems = output_stems(files);

    files.par_iter().zip(&stems).for_each(|(path, stem)| {
        let result = config_for(path, shared, args).and_then(|config| {
            process_single_file(path, stem, &config, false, &mut io::sink())
        });

        match result {
            Ok(stats) => {
                if let Ok(mut total) = total.lock() {
                    total.merge(stats);
                }
            }
            Err(e) => {
                error_count.fetch_add(1, Ordering::Relaxed);
                eprintln!("Error processing {}: {e:#}", path.display());
            }
        }
    });

    let total = total.into_inner().unwrap_or_default();
    (total, error_count.load(Ordering::Relaxed))
}

/// Stream a single file through the tokenizer; `stem` names its blob files
fn process_single_file<W: Write>(
    path: &Path,
    stem: &str,
    config: &Config,
    labelled: bool,
    out: &mut W,
) -> Result<ExtractStats> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let name = path.display().to_string();

    if let Some(dir) = &config.output_dir {
        let stats = split_to_dir(reader, config, dir, stem)?;
        debug!("{name}: wrote {} blobs to {}", stats.blobs, dir.display());
        return Ok(stats);
    }

    let stats = extract(reader, out, config, &name)?;
    if config.output == OutputFormat::Count {
        report_count(out, stats, labelled.then_some(name.as_str()))?;
    }
    Ok(stats)
}

/// Write a blob count, tab-labelled with the input name when several inputs are given
fn report_count<W: Write>(out: &mut W, stats: ExtractStats, label: Option<&str>) -> Result<()> {
    match label {
        Some(name) => writeln!(out, "{}\t{name}", stats.blobs)?,
        None => writeln!(out, "{}", stats.blobs)?,
    }
    Ok(())
}

/// Stream stdin through the tokenizer
fn process_stdin(config: &Config, args: &CliArgs) -> Result<()> {
    let stdin = io::stdin().lock();
    let reader = BufReader::with_capacity(READ_BUFFER_SIZE, stdin);

    let stats = if let Some(dir) = &config.output_dir {
        split_to_dir(reader, config, dir, "stdin")?
    } else {
        let mut stdout = io::stdout().lock();
        let stats = extract(reader, &mut stdout, config, "stdin")?;
        if config.output == OutputFormat::Count {
            report_count(&mut stdout, stats, None)?;
        }
        stats
    };

    if !args.silent {
        eprintln!(
            "Extracted {} blobs ({} bytes) from stdin.",
            stats.blobs, stats.bytes
        );
    }

    Ok(())
}
