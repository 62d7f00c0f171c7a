//! The metadata root (ECMA-335 II.24.2.1).
//!
//! The root starts with a fixed signature, a version string padded to a multiple of 4 bytes and
//! the stream directory. All stream offsets are relative to the start of the root.

use crate::{
    file::io::{read_le, read_le_at},
    metadata::streams::StreamHeader,
    Result,
};

/// Signature of the metadata root, `BSJB` in little endian.
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// The parsed metadata root.
#[derive(Clone, Debug)]
pub struct Root {
    /// Magic signature, always [`CIL_HEADER_MAGIC`]
    pub signature: u32,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Reserved
    pub reserved: u32,
    /// Length of the padded version string
    pub length: u32,
    /// Version string without the trailing NUL padding
    pub version: String,
    /// Reserved flags
    pub flags: u16,
    /// The stream directory
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse the metadata root at the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a wrong signature or an empty stream directory and
    /// [`crate::Error::OutOfBounds`] if a header or stream extends past `data`.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(out_of_bounds_error!());
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {:#x}",
                signature
            ));
        }

        let length = read_le_at::<u32>(data, &mut 12)?;
        let Some(version_end) = (length as usize).checked_add(16) else {
            return Err(malformed_error!("Version string length overflows - {}", length));
        };
        if version_end + 4 > data.len() {
            return Err(out_of_bounds_error!());
        }

        let version = data[16..version_end]
            .iter()
            .take_while(|byte| **byte != 0)
            .map(|byte| char::from(*byte))
            .collect::<String>();

        let flags = read_le::<u16>(&data[version_end..])?;
        let stream_count = read_le::<u16>(&data[version_end + 2..])?;
        if stream_count == 0 {
            return Err(malformed_error!("No streams in the metadata root"));
        }

        let mut stream_headers = Vec::with_capacity(usize::from(stream_count));
        let mut stream_offset = version_end + 4;
        for _ in 0..stream_count {
            if stream_offset >= data.len() {
                return Err(out_of_bounds_error!());
            }

            let stream = StreamHeader::from(&data[stream_offset..])?;
            match stream.offset.checked_add(stream.size) {
                Some(end) if end as usize <= data.len() => {}
                Some(_) => return Err(out_of_bounds_error!()),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size overflow - {} + {}",
                        stream.offset,
                        stream.size
                    ))
                }
            }

            stream_offset += stream.header_size();
            stream_headers.push(stream);
        }

        Ok(Root {
            signature,
            major_version: read_le::<u16>(&data[4..])?,
            minor_version: read_le::<u16>(&data[6..])?,
            reserved: read_le::<u32>(&data[8..])?,
            length,
            version,
            flags,
            stream_headers,
        })
    }

    /// The bytes of the stream `name`, if the directory lists it.
    ///
    /// `data` must be the same slice the root was read from.
    #[must_use]
    pub fn stream<'a>(&self, data: &'a [u8], name: &str) -> Option<&'a [u8]> {
        let header = self.stream_headers.iter().find(|header| header.name == name)?;
        let start = header.offset as usize;
        data.get(start..start + header.size as usize)
    }
}
