//! `NestedClass` table (ECMA-335 II.22.32, table `0x29`).
//!
//! Links nested types to their enclosing type. Sorted by `nested_class`.

use crate::{
    file::io::read_le_at_dyn,
    metadata::tables::{RowReadable, TableId, TableInfoRef},
    Result,
};

/// A raw `NestedClass` row.
#[derive(Clone, Debug)]
pub struct NestedClassRaw {
    /// Row index (1-based)
    pub rid: u32,
    /// Byte offset of this row within the table
    pub offset: usize,
    /// `TypeDef` row of the nested type
    pub nested_class: u32,
    /// `TypeDef` row of the enclosing type
    pub enclosing_class: u32,
}

impl RowReadable for NestedClassRaw {
    const TABLE_ID: TableId = TableId::NestedClass;

    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* nested_class */      sizes.table_index_bytes(TableId::TypeDef) +
            /* enclosing_class */   sizes.table_index_bytes(TableId::TypeDef)
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        Ok(NestedClassRaw {
            rid,
            offset: offset_org,
            nested_class: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            enclosing_class: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::metadata::tables::{MetadataTable, TableInfo};

    #[test]
    fn crafted_short() {
        let data = vec![
            0x03, 0x00, 0x02, 0x00, // 3 nested in 2
            0x05, 0x00, 0x02, 0x00, // 5 nested in 2
        ];

        let sizes = Arc::new(TableInfo::new_test(
            &[(TableId::NestedClass, 2), (TableId::TypeDef, 5)],
            false,
            false,
            false,
        ));
        let table = MetadataTable::<NestedClassRaw>::new(&data, 2, sizes).unwrap();

        let row = table.get(2).unwrap();
        assert_eq!(row.nested_class, 5);
        assert_eq!(row.enclosing_class, 2);
    }

    #[test]
    fn crafted_long() {
        let data = vec![
            0x03, 0x00, 0x01, 0x00, // nested_class
            0x02, 0x00, 0x01, 0x00, // enclosing_class
        ];

        let sizes = Arc::new(TableInfo::new_test(
            &[(TableId::NestedClass, 1), (TableId::TypeDef, u32::from(u16::MAX) + 3)],
            false,
            false,
            false,
        ));
        let table = MetadataTable::<NestedClassRaw>::new(&data, 1, sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.nested_class, 0x0001_0003);
        assert_eq!(row.enclosing_class, 0x0001_0002);
    }
}
