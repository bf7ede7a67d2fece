//! Streaming blob extraction.
//!
//! This module provides the single-pass scanner and its collaborators:
//! - [`Source`]: forward-only unit supplier ([`CharSource`] for UTF-8 text,
//!   [`ByteSource`] for raw bytes)
//! - [`Units`] and [`Marker`]: unit sequences and validated open/close markers
//! - [`BlobTokenizer`]: lazy sequence of `open ... close` blobs
//!
//! Memory use is bounded by the largest blob in the input, not by the size
//! of the input, so multi-gigabyte dumps can be split one record at a time.

pub mod blob_iter;
pub mod source;
pub mod units;

pub use blob_iter::{BlobTokenizer, DEFAULT_BUFFER_CAPACITY};
pub use source::{ByteSource, CharSource, Source};
pub use units::{Marker, Units};
