//! Positional 16-bit word reader.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Byte order of the 16-bit words in a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Endianness {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

impl Endianness {
    /// Decodes one word from exactly two bytes.
    #[inline]
    #[must_use]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            Endianness::Little => LittleEndian::read_u16(bytes),
            Endianness::Big => BigEndian::read_u16(bytes),
        }
    }
}

impl std::fmt::Display for Endianness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endianness::Little => f.write_str("little endian"),
            Endianness::Big => f.write_str("big endian"),
        }
    }
}

/// Reads 16-bit words from a byte slice at arbitrary byte offsets.
///
/// Reads past the end of the data return fewer words than requested; that
/// is how callers detect the end of valid data.
#[derive(Debug, Clone)]
pub struct WordReader<'a> {
    data: &'a [u8],
    cursor: usize,
    endianness: Endianness,
}

impl<'a> WordReader<'a> {
    /// Size of one word in bytes.
    pub const WORD_SIZE: usize = 2;

    /// Creates a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8], endianness: Endianness) -> Self {
        Self {
            data,
            cursor: 0,
            endianness,
        }
    }

    /// Returns the byte order in use.
    #[must_use]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Current byte offset.
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor to an absolute byte offset.
    pub fn seek(&mut self, offset: usize) {
        self.cursor = offset;
    }

    /// Number of bytes after the cursor.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.cursor)
    }

    /// Reads up to `buf.len()` words from the cursor, returning how many
    /// complete words were read. A trailing odd byte is never consumed.
    pub fn read_into(&mut self, buf: &mut [u16]) -> usize {
        let available = self.remaining() / Self::WORD_SIZE;
        let count = buf.len().min(available);
        let start = self.cursor;
        for (i, word) in buf.iter_mut().take(count).enumerate() {
            let at = start + i * Self::WORD_SIZE;
            *word = self.endianness.read_u16(&self.data[at..at + Self::WORD_SIZE]);
        }
        self.cursor = start + count * Self::WORD_SIZE;
        count
    }

    /// Reads up to `n` words from the cursor.
    pub fn read_words(&mut self, n: usize) -> Vec<u16> {
        let mut words = vec![0u16; n.min(self.remaining() / Self::WORD_SIZE)];
        let read = self.read_into(&mut words);
        words.truncate(read);
        words
    }

    /// Seeks to `offset` and reads up to `n` words.
    pub fn read_words_at(&mut self, offset: usize, n: usize) -> Vec<u16> {
        self.seek(offset);
        self.read_words(n)
    }

    /// Reads a single word at `offset`, `None` if the data ends first.
    pub fn read_word_at(&mut self, offset: usize) -> Option<u16> {
        self.read_words_at(offset, 1).first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_little_and_big() {
        let data = [0x12, 0x34, 0xAB, 0xCD];
        let mut le = WordReader::new(&data, Endianness::Little);
        assert_eq!(le.read_words(2), vec![0x3412, 0xCDAB]);

        let mut be = WordReader::new(&data, Endianness::Big);
        assert_eq!(be.read_words(2), vec![0x1234, 0xABCD]);
    }

    #[test]
    fn test_short_read_at_end() {
        let data = [1, 0, 2, 0, 3];
        let mut reader = WordReader::new(&data, Endianness::Little);
        let words = reader.read_words_at(0, 10);
        assert_eq!(words, vec![1, 2]);
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn test_read_past_end_is_empty() {
        let data = [1, 0];
        let mut reader = WordReader::new(&data, Endianness::Little);
        assert!(reader.read_words_at(100, 4).is_empty());
        assert_eq!(reader.read_word_at(2), None);
        assert_eq!(reader.read_word_at(0), Some(1));
    }

    #[test]
    fn test_cursor_advances() {
        let data = [1, 0, 2, 0, 3, 0];
        let mut reader = WordReader::new(&data, Endianness::Little);
        assert_eq!(reader.read_words(1), vec![1]);
        assert_eq!(reader.read_words(1), vec![2]);
        assert_eq!(reader.position(), 4);
    }
}
