//! `ImplMap` table (ECMA-335 II.22.22, table `0x1C`).
//!
//! Binds a function to the native library that exports it. Sorted by `member_forwarded`.

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfoRef},
    Result,
};

#[allow(non_snake_case)]
/// Flag constants of the `ImplMap.MappingFlags` column.
pub mod PInvokeAttributes {
    /// The function reports failures through the thread's last-error value
    pub const SUPPORTS_LAST_ERROR: u32 = 0x0040;
}

/// A raw `ImplMap` row.
#[derive(Clone, Debug)]
pub struct ImplMapRaw {
    /// Row index (1-based)
    pub rid: u32,
    /// Byte offset of this row within the table
    pub offset: usize,
    /// A 2-byte bitmask of [`PInvokeAttributes`]
    pub mapping_flags: u32,
    /// `MemberForwarded` coded index of the bound method
    pub member_forwarded: CodedIndex,
    /// `#Strings` index of the exported symbol name
    pub import_name: u32,
    /// `ModuleRef` row of the exporting library
    pub import_scope: u32,
}

impl ImplMapRaw {
    /// Byte offset of the `member_forwarded` key column within a row.
    pub const MEMBER_FORWARDED_OFFSET: usize = 2;
}

impl RowReadable for ImplMapRaw {
    const TABLE_ID: TableId = TableId::ImplMap;

    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* mapping_flags */     2 +
            /* member_forwarded */  sizes.coded_index_bytes(CodedIndexType::MemberForwarded) +
            /* import_name */       sizes.str_bytes() +
            /* import_scope */      sizes.table_index_bytes(TableId::ModuleRef)
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        Ok(ImplMapRaw {
            rid,
            offset: offset_org,
            mapping_flags: u32::from(read_le_at::<u16>(data, offset)?),
            member_forwarded: CodedIndex::read(
                data,
                offset,
                sizes,
                CodedIndexType::MemberForwarded,
            )?,
            import_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            import_scope: read_le_at_dyn(data, offset, sizes.is_large(TableId::ModuleRef))?,
        })
    }
}
