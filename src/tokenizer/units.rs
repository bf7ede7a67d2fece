/// `Units` - Unit sequences shared by markers and the accumulation buffer
///
/// The tokenizer works on either decoded characters (`String`) or raw bytes
/// (`Vec<u8>`). Both are exposed through the same small trait so that the
/// scanning state machine is written once.
use std::fmt;

use crate::error::{BlobError, MarkerKind};

/// A growable sequence of scan units
pub trait Units: Clone + Default + PartialEq + fmt::Debug {
    /// The single unit read from a source and compared against markers
    type Unit: Copy + Eq + fmt::Debug;

    /// Create an empty sequence with room for `capacity` bytes
    fn with_capacity(capacity: usize) -> Self;

    /// First unit of the sequence, if any
    fn first_unit(&self) -> Option<Self::Unit>;

    /// Number of units (characters or bytes, not necessarily bytes)
    fn unit_len(&self) -> usize;

    /// Append one unit
    fn push_unit(&mut self, unit: Self::Unit);

    /// Logically empty the sequence, keeping its allocation
    fn clear(&mut self);

    /// Whether the trailing units equal `suffix`.
    ///
    /// Cost is proportional to `suffix`, never to `self`.
    fn ends_with_units(&self, suffix: &Self) -> bool;

    /// The encoded bytes of the sequence
    fn as_bytes(&self) -> &[u8];

    /// Allocated capacity in bytes
    fn capacity(&self) -> usize;
}

/// Compare the tail of `buf` against `suffix`, walking backwards
fn bytes_end_with(buf: &[u8], suffix: &[u8]) -> bool {
    if buf.len() < suffix.len() {
        return false;
    }
    buf.iter()
        .rev()
        .zip(suffix.iter().rev())
        .all(|(a, b)| a == b)
}

impl Units for String {
    type Unit = char;

    fn with_capacity(capacity: usize) -> Self {
        String::with_capacity(capacity)
    }

    fn first_unit(&self) -> Option<char> {
        self.chars().next()
    }

    fn unit_len(&self) -> usize {
        self.chars().count()
    }

    fn push_unit(&mut self, unit: char) {
        self.push(unit);
    }

    fn clear(&mut self) {
        String::clear(self);
    }

    // Both sides are valid UTF-8 and `suffix` starts on a character
    // boundary, so a byte-level suffix match is a character-level match.
    fn ends_with_units(&self, suffix: &Self) -> bool {
        bytes_end_with(self.as_bytes(), suffix.as_bytes())
    }

    fn as_bytes(&self) -> &[u8] {
        str::as_bytes(self)
    }

    fn capacity(&self) -> usize {
        String::capacity(self)
    }
}

impl Units for Vec<u8> {
    type Unit = u8;

    fn with_capacity(capacity: usize) -> Self {
        Vec::with_capacity(capacity)
    }

    fn first_unit(&self) -> Option<u8> {
        self.first().copied()
    }

    fn unit_len(&self) -> usize {
        self.len()
    }

    fn push_unit(&mut self, unit: u8) {
        self.push(unit);
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn ends_with_units(&self, suffix: &Self) -> bool {
        bytes_end_with(self, suffix)
    }

    fn as_bytes(&self) -> &[u8] {
        self
    }

    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }
}

/// A validated, non-empty open or close marker
#[derive(Debug, Clone, PartialEq)]
pub struct Marker<T: Units> {
    value: T,
    first: T::Unit,
    len: usize,
}

impl<T: Units> Marker<T> {
    /// Build a marker, rejecting empty values
    pub fn new(value: T, which: MarkerKind) -> Result<Self, BlobError> {
        let first = value.first_unit().ok_or(BlobError::EmptyMarker { which })?;
        let len = value.unit_len();
        Ok(Self { value, first, len })
    }

    /// First unit; scanning for this marker starts here
    #[must_use]
    pub fn first(&self) -> T::Unit {
        self.first
    }

    /// Length in units
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; markers are non-empty by construction
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }
}
