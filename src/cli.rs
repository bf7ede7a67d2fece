//! Command-line interface for blobstream.
//!
//! Defines CLI arguments using clap builder API

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};

use crate::config::OutputFormat;

/// CLI arguments parsed from command line
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Files or directories to split; empty or `-` means stdin
    pub inputs: Vec<PathBuf>,

    /// Open marker
    pub open: Option<String>,

    /// Close marker
    pub close: Option<String>,

    /// Match markers on raw bytes instead of UTF-8 characters
    pub bytes: bool,

    /// Output format
    pub format: Option<OutputFormat>,

    /// Separator after each blob in `lines` format
    pub separator: Option<String>,

    /// Maximum blobs per input
    pub limit: Option<usize>,

    /// Initial tokenizer buffer capacity in bytes
    pub buffer_capacity: Option<usize>,

    /// Write each blob to its own file in this directory
    pub output_dir: Option<PathBuf>,

    /// Extension for files written to the output directory
    pub extension: Option<String>,

    /// Config file path
    pub config: Option<PathBuf>,

    /// Recursive directory processing
    pub recursive: bool,

    /// Exclude patterns for files/directories (glob patterns)
    pub exclude: Vec<String>,

    /// Input extensions picked up from directories
    pub input_extensions: Vec<String>,

    /// Number of parallel jobs (0 = auto, 1 = sequential)
    pub jobs: Option<usize>,

    /// Enable debug logging
    pub debug: bool,

    /// Silent mode (no progress output)
    pub silent: bool,
}

/// Build the clap Command for parsing CLI arguments
#[must_use]
pub fn build_cli() -> Command {
    Command::new("blobstream")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract open..close delimited blobs from huge text streams, one at a time")
        .arg(
            Arg::new("inputs")
                .help("Files or directories to split ('-' for stdin)")
                .value_name("FILE")
                .num_args(1..)
                .required(false)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("open")
                .short('o')
                .long("open")
                .help("Marker that starts a blob [default: <page>]")
                .value_name("MARKER")
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("close")
                .short('c')
                .long("close")
                .help("Marker that ends a blob [default: </page>]")
                .value_name("MARKER")
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("bytes")
                .short('b')
                .long("bytes")
                .help("Match markers on raw bytes instead of UTF-8 characters")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .help("Output format: lines, nul, json or count [default: lines]")
                .value_name("FORMAT")
                .value_parser(clap::value_parser!(OutputFormat)),
        )
        .arg(
            Arg::new("separator")
                .long("separator")
                .help("Separator after each blob in lines format, escapes allowed [default: \\n]")
                .value_name("TEXT")
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("limit")
                .short('n')
                .long("limit")
                .help("Stop after NUM blobs per input")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("buffer-capacity")
                .long("buffer-capacity")
                .help("Initial blob buffer size in bytes [default: 8192]")
                .value_name("BYTES")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("output-dir")
                .short('d')
                .long("output-dir")
                .help("Write every blob to its own file in DIR")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("extension")
                .long("extension")
                .help("Extension of files written to the output directory [default: xml]")
                .value_name("EXT"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Config file path (overrides auto-discovery)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("recursive")
                .short('r')
                .long("recursive")
                .help("Process directories recursively")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("exclude")
                .short('e')
                .long("exclude")
                .help("Exclude files/directories matching glob pattern (repeatable)")
                .value_name("PATTERN")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("ext")
                .long("ext")
                .help("Input extension picked up from directories (repeatable) [default: xml]")
                .value_name("EXT")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .help("Parallel jobs when writing to an output directory (0=auto, 1=sequential)")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("debug")
                .short('D')
                .long("debug")
                .help("Enable debug logging (RUST_LOG overrides)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('S')
                .long("silent")
                .help("Silent mode")
                .action(ArgAction::SetTrue),
        )
}

/// Parse CLI arguments from command line
#[must_use]
pub fn parse_args() -> CliArgs {
    args_from_matches(&build_cli().get_matches())
}

/// Parse CLI arguments from an iterator (for testing)
#[must_use]
pub fn parse_args_from<I, T>(args: I) -> CliArgs
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    args_from_matches(&build_cli().get_matches_from(args))
}

/// Convert clap `ArgMatches` to `CliArgs`
fn args_from_matches(matches: &clap::ArgMatches) -> CliArgs {
    CliArgs {
        inputs: matches
            .get_many::<PathBuf>("inputs")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default(),
        open: matches.get_one::<String>("open").cloned(),
        close: matches.get_one::<String>("close").cloned(),
        bytes: matches.get_flag("bytes"),
        format: matches.get_one::<OutputFormat>("format").copied(),
        separator: matches.get_one::<String>("separator").cloned(),
        limit: matches.get_one::<usize>("limit").copied(),
        buffer_capacity: matches.get_one::<usize>("buffer-capacity").copied(),
        output_dir: matches.get_one::<PathBuf>("output-dir").cloned(),
        extension: matches.get_one::<String>("extension").cloned(),
        config: matches.get_one::<PathBuf>("config").cloned(),
        recursive: matches.get_flag("recursive"),
        exclude: matches
            .get_many::<String>("exclude")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default(),
        input_extensions: matches
            .get_many::<String>("ext")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default(),
        jobs: matches.get_one::<usize>("jobs").copied(),
        debug: matches.get_flag("debug"),
        silent: matches.get_flag("silent"),
    }
}
