//! Blob extraction and output.
//!
//! This module drives a [`crate::tokenizer::BlobTokenizer`] over one input and
//! routes every blob to a sink:
//!
//! - [`extract`] writes blobs to any `Write` in the configured format
//! - [`split_to_dir`] writes each blob to its own numbered file, named by
//!   [`output_stems`] when several inputs share a directory
//! - [`for_each_blob`] hands blobs to a caller-supplied closure
//!
//! Each call owns exactly one tokenizer over one reader, so independent
//! inputs can be processed on separate threads.

pub mod pipeline;

pub use pipeline::{
    blob_file_path, extract, for_each_blob, output_stems, split_to_dir, ExtractStats,
};
