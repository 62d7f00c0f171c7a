//! Binary cursor used for all sequential metadata reads.
//!
//! A [`Parser`] wraps a byte slice and a position. It is used both over the whole image (PE
//! headers, metadata root) and over individual `#Blob` heap entries. Because a blob is handed out
//! as its own sub-slice, a parser constructed over it can never read past the blob's logical end,
//! even if the underlying image continues.
//!
//! # Supported Encodings
//!
//! - Little-endian primitives through [`Parser::read_le`]
//! - ECMA-335 compressed unsigned integers (II.23.2) through [`Parser::read_compressed_uint`]
//! - Length-prefixed UTF-8 strings as used by custom attribute blobs
//! - UTF-16LE strings spanning the remainder of a blob, as used by string constants
//!
//! # Examples
//!
//! ```rust,ignore
//! use winmdscope::Parser;
//!
//! let data = [0x01, 0x00, 0x81, 0x23];
//! let mut parser = Parser::new(&data);
//! assert_eq!(parser.read_le::<u16>()?, 1);
//! assert_eq!(parser.read_compressed_uint()?, 0x123);
//! assert!(parser.is_at_end());
//! # Ok::<(), winmdscope::Error>(())
//! ```

use widestring::U16Str;

use crate::{
    file::io::{read_le_at, CilIO},
    Result,
};

/// A bounds-checked cursor over a byte slice.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if there are bytes left to read.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Returns true if the cursor sits exactly at the end of the data.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.position == self.data.len()
    }

    /// Move to an absolute position. Seeking to the end itself is allowed.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies past the end of the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Skip a single byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn advance(&mut self) -> Result<()> {
        self.advance_by(1)
    }

    /// Skip `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `step` bytes remain.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let end = self.calc_end_position(step)?;
        self.position = end;
        Ok(())
    }

    /// Current position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// The underlying data.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Number of bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Look at the next byte without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or(out_of_bounds_error!())
    }

    /// Advance the position to the next multiple of `alignment`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the padding runs past the end of the data.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Read a little-endian value of type `T`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes remain.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read an ECMA-335 compressed unsigned integer (II.23.2).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input and [`crate::Error::Malformed`] if
    /// the first byte carries none of the three valid prefixes.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            let value = ((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte);
            return Ok(value);
        }

        // 4-byte encoding: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            let value = ((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3;
            return Ok(value);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read `length` raw bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read a UTF-8 string prefixed by its compressed length.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the string extends past the data, or
    /// [`crate::Error::Malformed`] for invalid UTF-8.
    pub fn read_utf8(&mut self) -> Result<String> {
        let length = self.read_compressed_uint()? as usize;
        self.read_utf8_bytes(length)
    }

    /// Read a serialized custom-attribute string (II.23.3): a single `0xFF` byte denotes a null
    /// string, anything else is a compressed length followed by UTF-8 bytes.
    ///
    /// # Errors
    /// Same as [`Parser::read_utf8`].
    pub fn read_ser_string(&mut self) -> Result<Option<String>> {
        if self.peek_byte()? == 0xFF {
            self.advance()?;
            return Ok(None);
        }

        self.read_utf8().map(Some)
    }

    /// Interpret all remaining bytes as a UTF-16LE string.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an odd number of remaining bytes or an invalid
    /// UTF-16 sequence.
    pub fn read_utf16_to_end(&mut self) -> Result<String> {
        let length = self.remaining();
        if length % 2 != 0 {
            return Err(malformed_error!("Invalid UTF-16 length - {}", length));
        }

        let mut utf16_chars: Vec<u16> = Vec::with_capacity(length / 2);
        for _ in 0..length / 2 {
            utf16_chars.push(self.read_le::<u16>()?);
        }

        U16Str::from_slice(&utf16_chars)
            .to_string()
            .map_err(|_| malformed_error!("Invalid UTF-16 string - {:?}", utf16_chars))
    }

    fn read_utf8_bytes(&mut self, length: usize) -> Result<String> {
        let start = self.position;
        let string_data = self.read_bytes(length)?;

        String::from_utf8(string_data.to_vec()).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                self.position,
                e.utf8_error()
            )
        })
    }

    fn calc_end_position(&self, length: usize) -> Result<usize> {
        let end = self
            .position
            .checked_add(length)
            .ok_or(out_of_bounds_error!())?;

        if end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{file::io::write_compressed_uint, Error};

    #[test]
    fn test_read_compressed_uint() {
        let test_cases = vec![
            (vec![0x03], 3),                             // 1-byte format
            (vec![0x7F], 0x7F),                          // 1-byte format, max value
            (vec![0x80, 0x80], 0x80),                    // 2-byte format, min value
            (vec![0xBF, 0xFF], 0x3FFF),                  // 2-byte format, max value
            (vec![0xC0, 0x00, 0x00, 0x00], 0x00),        // 4-byte format, min value
            (vec![0xDF, 0xFF, 0xFF, 0xFF], 0x1FFF_FFFF), // 4-byte format, max value
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            let result = parser.read_compressed_uint().unwrap();
            assert_eq!(result, expected);
            assert!(parser.is_at_end());
        }

        let mut parser = Parser::new(&[]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(Error::OutOfBounds { .. })
        ));

        let mut parser = Parser::new(&[0xE0, 0x00, 0x00, 0x00]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn compressed_uint_boundaries() {
        for (value, width) in [(0u32, 1usize), (127, 1), (128, 2), (16383, 2), (16384, 4)] {
            let mut encoded = Vec::new();
            write_compressed_uint(value, &mut encoded).unwrap();
            assert_eq!(encoded.len(), width, "value {value}");

            let mut parser = Parser::new(&encoded);
            assert_eq!(parser.read_compressed_uint().unwrap(), value);
            assert!(parser.is_at_end());
        }
    }

    #[test]
    fn strings() {
        let data = [0x03, b'a', b'b', b'c', 0xFF, 0x00];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_ser_string().unwrap().as_deref(), Some("abc"));
        assert_eq!(parser.read_ser_string().unwrap(), None);
        assert_eq!(parser.read_ser_string().unwrap().as_deref(), Some(""));
        assert!(parser.is_at_end());

        let data = [b'H', 0x00, b'i', 0x00];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_utf16_to_end().unwrap(), "Hi");

        let mut parser = Parser::new(&[b'H', 0x00, b'i']);
        assert!(matches!(
            parser.read_utf16_to_end(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn bounded_reads() {
        let image = [0x02, 0xAA, 0xBB, 0xCC, 0xDD];
        // A blob of two bytes inside a larger image
        let mut parser = Parser::new(&image[1..3]);
        assert_eq!(parser.read_le::<u16>().unwrap(), 0xBBAA);
        assert!(parser.is_at_end());
        assert!(matches!(
            parser.read_le::<u8>(),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn navigation() {
        let data = [0u8; 10];
        let mut parser = Parser::new(&data);
        parser.advance_by(3).unwrap();
        parser.align(4).unwrap();
        assert_eq!(parser.pos(), 4);
        parser.seek(10).unwrap();
        assert!(!parser.has_more_data());
        assert!(parser.seek(11).is_err());
        assert!(parser.advance().is_err());
        assert_eq!(parser.remaining(), 0);
    }
}
