//! Stream headers of the metadata root (ECMA-335 II.24.2.2).

use crate::{file::io::read_le, Result};

/// Longest stream name the format allows, without the terminating NUL.
const MAX_NAME_LENGTH: usize = 32;

/// Name, position and length of one metadata stream.
///
/// The size of a stream header is not fixed: the name is NUL-terminated and padded to the next
/// 4-byte boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream, e.g. `#~` or `#Strings`
    pub name: String,
}

impl StreamHeader {
    /// Parse a stream header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` ends before the name terminator and
    /// [`crate::Error::Malformed`] for an overlong or non-ASCII name.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(out_of_bounds_error!());
        }

        let name_bytes = &data[8..];
        let Some(name_len) = name_bytes
            .iter()
            .take(MAX_NAME_LENGTH + 1)
            .position(|byte| *byte == 0)
        else {
            if name_bytes.len() <= MAX_NAME_LENGTH {
                return Err(out_of_bounds_error!());
            }
            return Err(malformed_error!("Stream name exceeds {} characters", MAX_NAME_LENGTH));
        };

        let name = &name_bytes[..name_len];
        if !name.is_ascii() {
            return Err(malformed_error!("Invalid stream header name - {:?}", name));
        }

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name: name.iter().map(|byte| char::from(*byte)).collect(),
        })
    }

    /// Number of bytes this header occupies, including the padded name.
    #[must_use]
    pub fn header_size(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }
}
