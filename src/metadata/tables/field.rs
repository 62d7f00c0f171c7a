//! `Field` table (ECMA-335 II.22.15, table `0x04`).
//!
//! Struct members, enum members, the `value__` / `Value` storage fields of enums and type aliases,
//! and the literal fields that carry namespace constants.

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::tables::{RowReadable, TableId, TableInfoRef},
    Result,
};

#[allow(non_snake_case)]
/// Flag constants of the `Field.Flags` column.
pub mod FieldAttributes {
    /// Public accessibility
    pub const PUBLIC: u32 = 0x0006;
    /// Defined on the type, not per instance
    pub const STATIC: u32 = 0x0010;
    /// Compile-time constant
    pub const LITERAL: u32 = 0x0040;
    /// Field has a default value in the `Constant` table
    pub const HAS_DEFAULT: u32 = 0x8000;
    /// The exact flag combination of a constant declaration
    pub const CONSTANT: u32 = PUBLIC | STATIC | LITERAL | HAS_DEFAULT;
}

/// A raw `Field` row.
#[derive(Clone, Debug)]
pub struct FieldRaw {
    /// Row index (1-based)
    pub rid: u32,
    /// Byte offset of this row within the table
    pub offset: usize,
    /// A 2-byte bitmask of [`FieldAttributes`]
    pub flags: u32,
    /// `#Strings` index of the field name
    pub name: u32,
    /// `#Blob` index of the field signature
    pub signature: u32,
}

impl FieldRaw {
    /// Returns true if this field declares a constant.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.flags == FieldAttributes::CONSTANT
    }
}

impl RowReadable for FieldRaw {
    const TABLE_ID: TableId = TableId::Field;

    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* flags */     2 +
            /* name */      sizes.str_bytes() +
            /* signature */ sizes.blob_bytes()
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        Ok(FieldRaw {
            rid,
            offset: offset_org,
            flags: u32::from(read_le_at::<u16>(data, offset)?),
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}
