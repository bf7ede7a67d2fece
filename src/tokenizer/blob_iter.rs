/// `BlobTokenizer` - Pull-driven extraction of marker-delimited blobs
///
/// Scans a source strictly left to right and yields every run of text that
/// starts with the open marker and ends with the first close marker after
/// it, both included. Only the blob currently being accumulated is held in
/// memory.
use std::io::BufRead;
use std::iter::FusedIterator;

use tracing::{debug, trace};

use super::source::{ByteSource, CharSource, Source};
use super::units::{Marker, Units};
use crate::error::{BlobError, MarkerKind};

/// Initial buffer capacity in bytes when none is given
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Scanner position within one open..close attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Discarding units until the first unit of the open marker
    SeekingOpen,
    /// Open marker started; `remaining` more units complete the attempt
    MatchingOpen { remaining: usize },
    /// Open marker matched; appending until the buffer ends with close
    Accumulating,
    /// Source ended or failed; nothing more will be produced
    Exhausted,
}

/// Lazy, forward-only sequence of blobs over one source.
///
/// Not restartable: a second pass needs a new tokenizer over a new source.
///
/// Matching never backtracks. Units consumed by a failed open-marker attempt
/// are gone and cannot start a new attempt, and the first close marker after
/// the open marker always wins, even inside nested-looking text:
///
/// ```
/// use blobstream::BlobTokenizer;
///
/// let input = "[[]]]    [[    ]]] [[[]] ";
/// let blobs: Vec<String> = BlobTokenizer::chars(input.as_bytes(), "[[", "]]")
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(blobs, ["[[]]", "[[    ]]", "[[[]]"]);
/// ```
pub struct BlobTokenizer<S: Source> {
    source: S,
    open: Marker<S::Blob>,
    close: Marker<S::Blob>,
    buffer: S::Blob,
    state: ScanState,
    /// Blob found by `has_next` and not yet handed out
    peeked: Option<S::Blob>,
    units_read: u64,
    blobs_emitted: u64,
}

impl<S: Source> BlobTokenizer<S> {
    /// Create a tokenizer bound to `source`
    ///
    /// # Errors
    /// Returns [`BlobError::EmptyMarker`] if either marker is empty.
    pub fn new(source: S, open: S::Blob, close: S::Blob) -> Result<Self, BlobError> {
        Self::with_capacity(source, open, close, DEFAULT_BUFFER_CAPACITY)
    }

    /// Like [`BlobTokenizer::new`] with an explicit initial buffer capacity.
    ///
    /// The capacity only affects allocation, never output.
    pub fn with_capacity(
        source: S,
        open: S::Blob,
        close: S::Blob,
        capacity: usize,
    ) -> Result<Self, BlobError> {
        let open = Marker::new(open, MarkerKind::Open)?;
        let close = Marker::new(close, MarkerKind::Close)?;
        Ok(Self {
            source,
            open,
            close,
            buffer: S::Blob::with_capacity(capacity),
            state: ScanState::SeekingOpen,
            peeked: None,
            units_read: 0,
            blobs_emitted: 0,
        })
    }

    /// Whether another blob is available, scanning ahead by at most one blob
    ///
    /// # Errors
    /// Returns [`BlobError::Read`] if the source fails while scanning ahead.
    /// The sequence is over after that.
    pub fn has_next(&mut self) -> Result<bool, BlobError> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        self.peeked = self.advance()?;
        Ok(self.peeked.is_some())
    }

    /// Take the next blob
    ///
    /// # Errors
    /// Returns [`BlobError::Exhausted`] if the sequence already ended, or
    /// [`BlobError::Read`] if the source fails.
    pub fn next_blob(&mut self) -> Result<S::Blob, BlobError> {
        if let Some(blob) = self.peeked.take() {
            return Ok(blob);
        }
        self.advance()?.ok_or(BlobError::Exhausted)
    }

    /// Number of units pulled from the source so far
    #[must_use]
    pub fn units_read(&self) -> u64 {
        self.units_read
    }

    /// Number of blobs completed so far (including one held by `has_next`)
    #[must_use]
    pub fn blobs_emitted(&self) -> u64 {
        self.blobs_emitted
    }

    /// True once the source has ended or failed and no blob is pending
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state == ScanState::Exhausted && self.peeked.is_none()
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Give the source back to the caller, who owns its release
    pub fn into_source(self) -> S {
        self.source
    }

    /// Pull units until a blob completes or the source ends
    fn advance(&mut self) -> Result<Option<S::Blob>, BlobError> {
        while self.state != ScanState::Exhausted {
            let unit = match self.source.read_unit() {
                Ok(Some(unit)) => unit,
                Ok(None) => {
                    self.finish();
                    return Ok(None);
                }
                Err(e) => {
                    debug!(
                        units_read = self.units_read,
                        error = %e,
                        "source failed, terminating blob sequence"
                    );
                    self.buffer.clear();
                    self.state = ScanState::Exhausted;
                    return Err(BlobError::Read(e));
                }
            };
            self.units_read += 1;

            if let Some(blob) = self.step(unit) {
                self.blobs_emitted += 1;
                trace!(
                    blob = self.blobs_emitted,
                    bytes = blob.as_bytes().len(),
                    "blob complete"
                );
                return Ok(Some(blob));
            }
        }
        Ok(None)
    }

    /// Feed one unit through the state machine
    fn step(&mut self, unit: <S::Blob as Units>::Unit) -> Option<S::Blob> {
        match self.state {
            ScanState::SeekingOpen => {
                if unit == self.open.first() {
                    self.buffer.clear();
                    self.buffer.push_unit(unit);
                    self.state = match self.open.len() {
                        1 => ScanState::Accumulating,
                        len => ScanState::MatchingOpen { remaining: len - 1 },
                    };
                }
                None
            }
            ScanState::MatchingOpen { remaining } => {
                self.buffer.push_unit(unit);
                if remaining > 1 {
                    self.state = ScanState::MatchingOpen {
                        remaining: remaining - 1,
                    };
                } else if self.buffer == *self.open.value() {
                    self.state = ScanState::Accumulating;
                } else {
                    // Consumed units are not rescanned
                    self.buffer.clear();
                    self.state = ScanState::SeekingOpen;
                }
                None
            }
            ScanState::Accumulating => {
                self.buffer.push_unit(unit);
                if !self.buffer.ends_with_units(self.close.value()) {
                    return None;
                }
                let blob = self.buffer.clone();
                self.buffer.clear();
                self.state = ScanState::SeekingOpen;
                Some(blob)
            }
            ScanState::Exhausted => None,
        }
    }

    /// End of input: drop any partial attempt
    fn finish(&mut self) {
        match self.state {
            ScanState::MatchingOpen { .. } | ScanState::Accumulating => {
                debug!(
                    bytes = self.buffer.as_bytes().len(),
                    "dropping unterminated blob at end of stream"
                );
            }
            ScanState::SeekingOpen | ScanState::Exhausted => {}
        }
        self.buffer.clear();
        self.state = ScanState::Exhausted;
    }
}

impl<R: BufRead> BlobTokenizer<CharSource<R>> {
    /// Tokenize UTF-8 text from `reader` into `String` blobs
    pub fn chars(reader: R, open: &str, close: &str) -> Result<Self, BlobError> {
        Self::new(CharSource::new(reader), open.to_string(), close.to_string())
    }
}

impl<R: BufRead> BlobTokenizer<ByteSource<R>> {
    /// Tokenize raw bytes from `reader` into `Vec<u8>` blobs
    pub fn bytes(reader: R, open: &[u8], close: &[u8]) -> Result<Self, BlobError> {
        Self::new(ByteSource::new(reader), open.to_vec(), close.to_vec())
    }
}

impl<S: Source> Iterator for BlobTokenizer<S> {
    type Item = Result<S::Blob, BlobError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_blob() {
            Ok(blob) => Some(Ok(blob)),
            Err(BlobError::Exhausted) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<S: Source> FusedIterator for BlobTokenizer<S> {}
