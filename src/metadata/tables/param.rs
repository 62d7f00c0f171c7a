//! `Param` table (ECMA-335 II.22.33, table `0x08`).
//!
//! Parameter names. `sequence` 0 describes the return value, positional parameters start at 1.

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::tables::{RowReadable, TableId, TableInfoRef},
    Result,
};

/// A raw `Param` row.
#[derive(Clone, Debug)]
pub struct ParamRaw {
    /// Row index (1-based)
    pub rid: u32,
    /// Byte offset of this row within the table
    pub offset: usize,
    /// Parameter flags (in, out, optional)
    pub flags: u32,
    /// Position of the parameter, 0 for the return value
    pub sequence: u32,
    /// `#Strings` index of the parameter name
    pub name: u32,
}

impl RowReadable for ParamRaw {
    const TABLE_ID: TableId = TableId::Param;

    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* flags */     2 +
            /* sequence */  2 +
            /* name */      sizes.str_bytes()
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        Ok(ParamRaw {
            rid,
            offset: offset_org,
            flags: u32::from(read_le_at::<u16>(data, offset)?),
            sequence: u32::from(read_le_at::<u16>(data, offset)?),
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}
