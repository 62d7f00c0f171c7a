//! `Constant` table (ECMA-335 II.22.9, table `0x0B`).
//!
//! Literal values of enum members and namespace constants. Sorted by `parent`.

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfoRef},
    Result,
};

/// A raw `Constant` row.
#[derive(Clone, Debug)]
pub struct ConstantRaw {
    /// Row index (1-based)
    pub rid: u32,
    /// Byte offset of this row within the table
    pub offset: usize,
    /// Element type of the value
    pub base: u8,
    /// `HasConstant` coded index of the owner
    pub parent: CodedIndex,
    /// `#Blob` index of the value
    pub value: u32,
}

impl RowReadable for ConstantRaw {
    const TABLE_ID: TableId = TableId::Constant;

    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* base + padding */    2 +
            /* parent */            sizes.coded_index_bytes(CodedIndexType::HasConstant) +
            /* value */             sizes.blob_bytes()
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        let base = read_le_at::<u8>(data, offset)?;
        // Padding byte
        *offset += 1;

        Ok(ConstantRaw {
            rid,
            offset: offset_org,
            base,
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasConstant)?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}
