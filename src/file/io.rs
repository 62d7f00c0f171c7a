//! Low-level byte order and safe reading utilities for PE and metadata parsing.
//!
//! Every multi-byte quantity in a PE image and in ECMA-335 metadata is stored little-endian. This
//! module provides the bounds-checked primitives the rest of the crate is built on, plus the
//! encoder for ECMA-335 compressed unsigned integers (the decoder lives on
//! [`crate::file::parser::Parser`]).
//!
//! # Key Components
//!
//! - [`CilIO`] - Trait defining little-endian conversion for the primitive types
//! - [`read_le`] - Read a value from the start of a buffer
//! - [`read_le_at`] - Read a value at an offset and advance the offset
//! - [`read_le_at_dyn`] - Read a 2- or 4-byte index, depending on the column width
//! - [`write_compressed_uint`] - Append a value in compressed form
//!
//! # Examples
//!
//! ```rust,ignore
//! use winmdscope::file::io::read_le_at;
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//!
//! let first: u16 = read_le_at(&data, &mut offset)?;
//! let second: u16 = read_le_at(&data, &mut offset)?;
//! let third: u32 = read_le_at(&data, &mut offset)?;
//!
//! assert_eq!((first, second, third), (1, 2, 3));
//! assert_eq!(offset, 8);
//! # Ok::<(), winmdscope::Error>(())
//! ```
//!
//! # Error Handling
//!
//! All reading functions return [`crate::Error::OutOfBounds`] if the buffer holds fewer bytes than
//! the requested type. The offset is left untouched in that case.

use crate::Result;

/// Largest value representable as an ECMA-335 compressed unsigned integer.
pub const COMPRESSED_UINT_MAX: u32 = 0x1FFF_FFFF;

/// Trait for type-specific, little-endian binary reads.
///
/// Each implementation names the fixed-size byte array it is decoded from (e.g. `[u8; 4]` for
/// `u32`), which lets [`read_le_at`] stay generic over every primitive used by the metadata
/// format.
pub trait CilIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $len:literal),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
    f32 => 4,
    f64 => 8,
}

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is shorter than `T`.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing the offset
/// by the size of `T` on success.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Reads a table column that is either 2 or 4 bytes wide, widening the result to `u32`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the column extends past the buffer.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}

/// Reads a column of arbitrary width (1, 2 or 4 bytes).
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the column extends past the buffer, or
/// [`crate::Error::Malformed`] for an unsupported width.
pub fn read_le_at_width(data: &[u8], offset: &mut usize, width: usize) -> Result<u32> {
    match width {
        1 => Ok(u32::from(read_le_at::<u8>(data, offset)?)),
        2 => Ok(u32::from(read_le_at::<u16>(data, offset)?)),
        4 => read_le_at::<u32>(data, offset),
        _ => Err(malformed_error!("Unsupported column width - {}", width)),
    }
}

/// Appends `value` to `out` as an ECMA-335 compressed unsigned integer.
///
/// Values up to `0x7F` take one byte, values up to `0x3FFF` take two bytes with the high bits
/// `10`, everything up to [`COMPRESSED_UINT_MAX`] takes four bytes with the high bits `110`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `value` exceeds [`COMPRESSED_UINT_MAX`].
pub fn write_compressed_uint(value: u32, out: &mut Vec<u8>) -> Result<()> {
    if value <= 0x7F {
        #[allow(clippy::cast_possible_truncation)]
        out.push(value as u8);
    } else if value <= 0x3FFF {
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&[((value >> 8) as u8) | 0x80, value as u8]);
    } else if value <= COMPRESSED_UINT_MAX {
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&[
            ((value >> 24) as u8) | 0xC0,
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ]);
    } else {
        return Err(malformed_error!(
            "Value too large for a compressed integer - {:#x}",
            value
        ));
    }

    Ok(())
}
