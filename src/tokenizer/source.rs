/// `Source` - Forward-only unit suppliers for the tokenizer
///
/// A source hands out one unit at a time, or signals the end of input, or
/// fails with an I/O error. It never seeks and never looks further ahead
/// than the unit it returns. Sources borrow the reader's lifetime from the
/// caller and never close it; use `into_inner` to get the reader back.
use std::io::{self, BufRead};

use super::units::Units;

/// A sequential supplier of scan units
pub trait Source {
    /// Sequence type blobs are accumulated into
    type Blob: Units;

    /// Read the next unit, `Ok(None)` at end of input
    fn read_unit(&mut self) -> io::Result<Option<<Self::Blob as Units>::Unit>>;
}

/// Pull one byte out of a buffered reader.
///
/// `Interrupted` is returned to the caller like any other error rather
/// than retried, so a reader can be used to cancel a scan.
fn read_byte<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    let byte = match reader.fill_buf()? {
        [] => return Ok(None),
        [first, ..] => *first,
    };
    reader.consume(1);
    Ok(Some(byte))
}

/// Byte-oriented source: every byte is one unit
#[derive(Debug)]
pub struct ByteSource<R: BufRead> {
    reader: R,
}

impl<R: BufRead> ByteSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> Source for ByteSource<R> {
    type Blob = Vec<u8>;

    fn read_unit(&mut self) -> io::Result<Option<u8>> {
        read_byte(&mut self.reader)
    }
}

/// Character-oriented source decoding UTF-8 one scalar value at a time
#[derive(Debug)]
pub struct CharSource<R: BufRead> {
    reader: R,
}

impl<R: BufRead> CharSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Look at the next byte without consuming it
fn peek_byte<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    Ok(reader.fill_buf()?.first().copied())
}

/// Expected total length of a UTF-8 sequence from its leading byte
fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

/// Allowed range of the byte following `lead`; excludes overlong forms,
/// surrogates and code points above U+10FFFF
fn second_byte_range(lead: u8) -> (u8, u8) {
    match lead {
        0xE0 => (0xA0, 0xBF),
        0xED => (0x80, 0x9F),
        0xF0 => (0x90, 0xBF),
        0xF4 => (0x80, 0x8F),
        _ => (0x80, 0xBF),
    }
}

impl<R: BufRead> Source for CharSource<R> {
    type Blob = String;

    /// Malformed input decodes to U+FFFD, one replacement per maximal
    /// invalid subpart. A byte that breaks a sequence is left unread and
    /// starts the next unit.
    fn read_unit(&mut self) -> io::Result<Option<char>> {
        let Some(lead) = read_byte(&mut self.reader)? else {
            return Ok(None);
        };
        if lead.is_ascii() {
            return Ok(Some(char::from(lead)));
        }
        let Some(width) = utf8_width(lead) else {
            return Ok(Some(char::REPLACEMENT_CHARACTER));
        };

        let mut encoded = [lead, 0, 0, 0];
        for (i, slot) in encoded.iter_mut().enumerate().take(width).skip(1) {
            let (low, high) = if i == 1 {
                second_byte_range(lead)
            } else {
                (0x80, 0xBF)
            };
            match peek_byte(&mut self.reader)? {
                Some(byte) if (low..=high).contains(&byte) => {
                    self.reader.consume(1);
                    *slot = byte;
                }
                // Truncated at end of input or interrupted by a non-continuation byte
                _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
            }
        }

        Ok(Some(
            std::str::from_utf8(&encoded[..width])
                .ok()
                .and_then(|s| s.chars().next())
                .unwrap_or(char::REPLACEMENT_CHARACTER),
        ))
    }
}
