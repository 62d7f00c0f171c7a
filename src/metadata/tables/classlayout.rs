//! `ClassLayout` table (ECMA-335 II.22.8, table `0x0F`).
//!
//! Explicit packing and total size of a struct or union. Sorted by `parent`.

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::tables::{RowReadable, TableId, TableInfoRef},
    Result,
};

/// A raw `ClassLayout` row.
#[derive(Clone, Debug)]
pub struct ClassLayoutRaw {
    /// Row index (1-based)
    pub rid: u32,
    /// Byte offset of this row within the table
    pub offset: usize,
    /// Forced field alignment, 0 when the natural alignment applies
    pub packing_size: u16,
    /// Declared total size, 0 when unspecified
    pub class_size: u32,
    /// `TypeDef` row this layout belongs to
    pub parent: u32,
}

impl ClassLayoutRaw {
    /// Byte offset of the `parent` key column within a row.
    pub const PARENT_OFFSET: usize = 6;
}

impl RowReadable for ClassLayoutRaw {
    const TABLE_ID: TableId = TableId::ClassLayout;

    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* packing_size */  2 +
            /* class_size */    4 +
            /* parent */        sizes.table_index_bytes(TableId::TypeDef)
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        Ok(ClassLayoutRaw {
            rid,
            offset: offset_org,
            packing_size: read_le_at::<u16>(data, offset)?,
            class_size: read_le_at::<u32>(data, offset)?,
            parent: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
        })
    }
}
