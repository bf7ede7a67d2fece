//! Configuration management for blobstream.
//!
//! This module provides the [`Config`] struct which controls how blobs are
//! extracted and written. Configuration can be loaded from:
//! - TOML files (`blobstream.toml`)
//! - CLI arguments (which override file settings)
//!
//! Config files are auto-discovered by walking up from the input being split
//! towards the filesystem root, then falling back to the user's home
//! directory. A file containing `root = true` ends the walk.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::tokenizer::DEFAULT_BUFFER_CAPACITY;

/// Name of the per-directory config file
const CONFIG_FILE_NAME: &str = "blobstream.toml";

/// `blobstream.toml` in the user's home directory, if one is known
fn home_config_file() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(CONFIG_FILE_NAME))
}

/// Read one config file; unreadable or malformed files are skipped with a warning
fn load_partial(path: &Path) -> Option<PartialConfig> {
    if !path.is_file() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<PartialConfig>(&contents) {
            Ok(partial) => Some(partial),
            Err(e) => {
                warn!("failed to parse {}: {e}", path.display());
                None
            }
        },
        Err(e) => {
            warn!("failed to read {}: {e}", path.display());
            None
        }
    }
}

// Serde default functions
fn default_open() -> String {
    "<page>".to_string()
}
fn default_close() -> String {
    "</page>".to_string()
}
fn default_separator() -> String {
    "\\n".to_string()
}
fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}
fn default_extension() -> String {
    "xml".to_string()
}
fn default_input_extensions() -> Vec<String> {
    vec!["xml".to_string()]
}

/// Unit the tokenizer matches markers on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitMode {
    /// UTF-8 decoded characters; malformed UTF-8 decodes to U+FFFD
    #[default]
    Chars,
    /// Raw bytes; any encoding passes through untouched
    Bytes,
}

/// How extracted blobs are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Each blob followed by the separator
    #[default]
    Lines,
    /// Each blob followed by a NUL byte
    Nul,
    /// One JSON string per line
    Json,
    /// Only the number of blobs
    Count,
}

impl OutputFormat {
    pub const NAMES: &'static [&'static str] = &["lines", "nul", "json", "count"];
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lines" => Ok(OutputFormat::Lines),
            "nul" | "null" | "zero" => Ok(OutputFormat::Nul),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            "count" => Ok(OutputFormat::Count),
            other => Err(format!(
                "unknown output format '{other}' (expected one of: {})",
                Self::NAMES.join(", ")
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Lines => "lines",
            OutputFormat::Nul => "nul",
            OutputFormat::Json => "json",
            OutputFormat::Count => "count",
        };
        f.write_str(name)
    }
}

/// Main configuration struct for blobstream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Literal marker that starts a blob (default: `<page>`)
    #[serde(default = "default_open")]
    pub open: String,

    /// Literal marker that ends a blob (default: `</page>`)
    #[serde(default = "default_close")]
    pub close: String,

    /// Match on characters or bytes (default: chars)
    #[serde(default)]
    pub unit: UnitMode,

    /// Output format (default: lines)
    #[serde(default)]
    pub output: OutputFormat,

    /// Separator written after each blob in `lines` format.
    /// Escapes `\n`, `\r`, `\t`, `\0` and `\\` are honoured (default: `\n`)
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Initial tokenizer buffer capacity in bytes; tuning only
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Stop after this many blobs per input
    #[serde(default)]
    pub limit: Option<usize>,

    /// Write every blob to its own file in this directory
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// File extension for blobs written to `output_dir` (default: xml)
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Extensions picked up when an input is a directory (default: xml)
    #[serde(default = "default_input_extensions")]
    pub input_extensions: Vec<String>,
}

/// Partial configuration for TOML parsing
///
/// All fields are `Option<T>` so we can distinguish between
/// "explicitly set" and "not specified" when merging configs.
#[derive(Debug, Clone, Default, Deserialize)]
struct PartialConfig {
    /// Stop looking for config files in parent directories
    pub root: Option<bool>,
    pub open: Option<String>,
    pub close: Option<String>,
    pub unit: Option<UnitMode>,
    pub output: Option<OutputFormat>,
    pub separator: Option<String>,
    pub buffer_capacity: Option<usize>,
    pub limit: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub extension: Option<String>,
    pub input_extensions: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            open: default_open(),
            close: default_close(),
            unit: UnitMode::Chars,
            output: OutputFormat::Lines,
            separator: default_separator(),
            buffer_capacity: default_buffer_capacity(),
            limit: None,
            output_dir: None,
            extension: default_extension(),
            input_extensions: default_input_extensions(),
        }
    }
}

impl Config {
    /// Smallest accepted initial buffer
    const MIN_BUFFER_CAPACITY: usize = 16;
    /// Largest accepted initial buffer (64 MiB)
    const MAX_BUFFER_CAPACITY: usize = 64 * 1024 * 1024;

    /// Validate configuration values are within reasonable bounds
    ///
    /// Returns an error message if validation fails, None if valid.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.open.is_empty() {
            return Some("open marker must not be empty".to_string());
        }
        if self.close.is_empty() {
            return Some("close marker must not be empty".to_string());
        }
        if self.buffer_capacity < Self::MIN_BUFFER_CAPACITY {
            return Some(format!(
                "buffer_capacity {} is below minimum of {}",
                self.buffer_capacity,
                Self::MIN_BUFFER_CAPACITY
            ));
        }
        if self.buffer_capacity > Self::MAX_BUFFER_CAPACITY {
            return Some(format!(
                "buffer_capacity {} exceeds maximum of {}",
                self.buffer_capacity,
                Self::MAX_BUFFER_CAPACITY
            ));
        }
        if self.limit == Some(0) {
            return Some("limit must be at least 1".to_string());
        }
        if self.extension.contains(['/', '\\']) {
            return Some(format!(
                "extension '{}' must not contain path separators",
                self.extension
            ));
        }
        None
    }

    /// Separator bytes with escape sequences resolved
    #[must_use]
    pub fn separator_bytes(&self) -> Vec<u8> {
        unescape(&self.separator).into_bytes()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let partial: PartialConfig = toml::from_str(contents)?;
        let mut config = Self::default();
        config.apply_partial(&partial);
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Apply a partial config, only overriding fields that are explicitly set
    fn apply_partial(&mut self, partial: &PartialConfig) {
        if let Some(v) = &partial.open {
            self.open.clone_from(v);
        }
        if let Some(v) = &partial.close {
            self.close.clone_from(v);
        }
        if let Some(v) = partial.unit {
            self.unit = v;
        }
        if let Some(v) = partial.output {
            self.output = v;
        }
        if let Some(v) = &partial.separator {
            self.separator.clone_from(v);
        }
        if let Some(v) = partial.buffer_capacity {
            self.buffer_capacity = v;
        }
        if let Some(v) = partial.limit {
            self.limit = Some(v);
        }
        if let Some(v) = &partial.output_dir {
            self.output_dir = Some(v.clone());
        }
        if let Some(v) = &partial.extension {
            self.extension.clone_from(v);
        }
        if let Some(v) = &partial.input_extensions {
            self.input_extensions.clone_from(v);
        }
    }

    /// Config files that apply to `input`, least specific first
    #[must_use]
    pub fn discover_config_files(input: &Path) -> Vec<PathBuf> {
        Self::discover(input)
            .into_iter()
            .map(|(path, _)| path)
            .collect()
    }

    /// Layer every config file that applies to `input` over the defaults.
    ///
    /// Closer files override only the values they set.
    #[must_use]
    pub fn from_discovered_files(input: &Path) -> Self {
        let mut config = Self::default();
        for (path, partial) in Self::discover(input) {
            debug!("applying config file {}", path.display());
            config.apply_partial(&partial);
        }
        config
    }

    /// Walk from the input's directory towards the root, stopping after a
    /// `root = true` file. The home config is consulted only when the walk
    /// was not stopped.
    fn discover(input: &Path) -> Vec<(PathBuf, PartialConfig)> {
        let start = if input.is_dir() {
            Some(input.to_path_buf())
        } else {
            input
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .or_else(|| std::env::current_dir().ok())
        };

        let mut found = Vec::new();
        let mut stopped = false;
        for dir in start.iter().flat_map(|dir| dir.ancestors()) {
            let path = dir.join(CONFIG_FILE_NAME);
            let Some(partial) = load_partial(&path) else {
                continue;
            };
            stopped = partial.root == Some(true);
            found.push((path, partial));
            if stopped {
                break;
            }
        }

        if !stopped {
            if let Some(home) = home_config_file() {
                if !found.iter().any(|(path, _)| *path == home) {
                    if let Some(partial) = load_partial(&home) {
                        found.push((home, partial));
                    }
                }
            }
        }

        found.reverse();
        found
    }
}

/// Resolve backslash escapes in a separator string.
///
/// Unknown escapes are kept verbatim.
fn unescape(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('0') => result.push('\0'),
            Some('\\') => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}
