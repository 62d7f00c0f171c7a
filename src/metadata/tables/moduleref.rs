//! `ModuleRef` table (ECMA-335 II.22.31, table `0x1A`).
//!
//! Names of the native libraries referenced by `ImplMap` rows.

use crate::{
    file::io::read_le_at_dyn,
    metadata::tables::{RowReadable, TableId, TableInfoRef},
    Result,
};

/// A raw `ModuleRef` row.
#[derive(Clone, Debug)]
pub struct ModuleRefRaw {
    /// Row index (1-based)
    pub rid: u32,
    /// Byte offset of this row within the table
    pub offset: usize,
    /// `#Strings` index of the library name
    pub name: u32,
}

impl RowReadable for ModuleRefRaw {
    const TABLE_ID: TableId = TableId::ModuleRef;

    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(sizes.str_bytes())
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        Ok(ModuleRefRaw {
            rid,
            offset: offset_org,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}
