//! blobstream - Streaming extraction of marker-delimited blobs
//!
//! Splits arbitrarily large character streams (multi-gigabyte XML dumps,
//! bracket-delimited record files) into `open ... close` blobs one at a
//! time, so each record can be parsed on its own with memory bounded by the
//! largest record.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]

pub mod cli;
pub mod config;
pub mod error;
pub mod process;
pub mod tokenizer;

// Re-export commonly used types
pub use cli::{build_cli, parse_args, parse_args_from, CliArgs};
pub use config::{Config, OutputFormat, UnitMode};
pub use error::{BlobError, MarkerKind, Result};
pub use tokenizer::{BlobTokenizer, ByteSource, CharSource, Source};
