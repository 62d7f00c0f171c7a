//! `FieldLayout` table (ECMA-335 II.22.16, table `0x10`).
//!
//! Explicit field offsets. Sorted by `field`.

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::tables::{RowReadable, TableId, TableInfoRef},
    Result,
};

/// A raw `FieldLayout` row.
#[derive(Clone, Debug)]
pub struct FieldLayoutRaw {
    /// Row index (1-based)
    pub rid: u32,
    /// Byte offset of this row within the table
    pub offset: usize,
    /// Offset of the field within its type
    pub field_offset: u32,
    /// `Field` row this offset belongs to
    pub field: u32,
}

impl FieldLayoutRaw {
    /// Byte offset of the `field` key column within a row.
    pub const FIELD_OFFSET: usize = 4;
}

impl RowReadable for FieldLayoutRaw {
    const TABLE_ID: TableId = TableId::FieldLayout;

    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* field_offset */  4 +
            /* field */         sizes.table_index_bytes(TableId::Field)
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        Ok(FieldLayoutRaw {
            rid,
            offset: offset_org,
            field_offset: read_le_at::<u32>(data, offset)?,
            field: read_le_at_dyn(data, offset, sizes.is_large(TableId::Field))?,
        })
    }
}
