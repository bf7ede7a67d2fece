//! Error types and result aliases for blobstream.
//!
//! This module defines the error handling infrastructure:
//! - [`BlobError`]: faults raised by the streaming tokenizer itself
//! - [`Result<T>`]: Type alias for `anyhow::Result<T>` used by the config,
//!   pipeline and CLI layers

use std::fmt;
use std::io;

use anyhow::Result as AnyhowResult;
use thiserror::Error;

pub type Result<T> = AnyhowResult<T>;

/// Which of the two markers a [`BlobError::EmptyMarker`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Open,
    Close,
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerKind::Open => f.write_str("open"),
            MarkerKind::Close => f.write_str("close"),
        }
    }
}

/// Faults produced by [`crate::tokenizer::BlobTokenizer`].
///
/// Running out of input is not represented here: a stream that simply ends
/// yields `Ok(false)` from `has_next` and `None` from the iterator.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The source failed while being read. The sequence is terminated.
    #[error("cannot read from stream: {0}")]
    Read(#[from] io::Error),

    /// A blob was requested after the sequence had already ended.
    #[error("no more blobs: the sequence is exhausted")]
    Exhausted,

    /// A marker was constructed from an empty value.
    #[error("{which} marker must not be empty")]
    EmptyMarker { which: MarkerKind },
}

impl BlobError {
    /// True for faults caused by the underlying source rather than by the caller
    #[must_use]
    pub fn is_read_fault(&self) -> bool {
        matches!(self, BlobError::Read(_))
    }
}
