//! `CustomAttribute` table (ECMA-335 II.22.10, table `0x0C`).
//!
//! Attributes attached to types, fields, methods and parameters. Sorted by `parent`, so all
//! attributes of one owner are adjacent.

use crate::{
    file::io::read_le_at_dyn,
    metadata::tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfoRef},
    Result,
};

/// A raw `CustomAttribute` row.
#[derive(Clone, Debug)]
pub struct CustomAttributeRaw {
    /// Row index (1-based)
    pub rid: u32,
    /// Byte offset of this row within the table
    pub offset: usize,
    /// `HasCustomAttribute` coded index of the owner
    pub parent: CodedIndex,
    /// `CustomAttributeType` coded index of the constructor
    pub constructor: CodedIndex,
    /// `#Blob` index of the argument values
    pub value: u32,
}

impl RowReadable for CustomAttributeRaw {
    const TABLE_ID: TableId = TableId::CustomAttribute;

    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* parent */        sizes.coded_index_bytes(CodedIndexType::HasCustomAttribute) +
            /* constructor */   sizes.coded_index_bytes(CodedIndexType::CustomAttributeType) +
            /* value */         sizes.blob_bytes()
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        Ok(CustomAttributeRaw {
            rid,
            offset: offset_org,
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasCustomAttribute)?,
            constructor: CodedIndex::read(
                data,
                offset,
                sizes,
                CodedIndexType::CustomAttributeType,
            )?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}
