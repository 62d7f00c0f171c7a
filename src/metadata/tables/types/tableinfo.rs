use std::sync::Arc;
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::read_le_at,
    metadata::tables::types::{CodedIndexType, TableId},
    Error::NotSupported,
    Result,
};

/// Row count of a single table and the index width derived from it.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits needed to represent the row count
    pub bits: u8,
    /// Whether an index into this table needs 4 bytes
    pub is_large: bool,
}

impl TableRowInfo {
    /// Derive the index information for a table with `rows` rows.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// Row counts of all tables plus the derived column widths of the `#~` stream.
///
/// Every index column in the tables stream is either 2 or 4 bytes wide, depending on:
/// - the heap-size flags, for `#Strings`, `#GUID` and `#Blob` indexes
/// - the row count of the target table, for simple table indexes
/// - the row counts of all candidate tables, for coded indexes
#[derive(Clone, Default)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

/// Shared reference to a [`TableInfo`].
pub type TableInfoRef = Arc<TableInfo>;

impl TableInfo {
    /// Parse the row counts from a `#~` stream, given its `valid` bit vector.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row counts are truncated and
    /// [`crate::Error::NotSupported`] if tables beyond `GenericParamConstraint` are present.
    pub fn new(data: &[u8], valid_bitvec: u64) -> Result<Self> {
        if valid_bitvec >> TableId::COUNT != 0 {
            return Err(NotSupported(format!(
                "Tables beyond GenericParamConstraint - valid mask {:#x}",
                valid_bitvec
            )));
        }

        let mut table_info = vec![TableRowInfo::default(); TableId::COUNT];
        let mut next_row_offset = 24;

        for table_id in TableId::iter() {
            if (valid_bitvec & (1 << table_id as usize)) == 0 {
                continue;
            }

            let row_count = read_le_at::<u32>(data, &mut next_row_offset)?;
            table_info[table_id as usize] = TableRowInfo::new(row_count);
        }

        let heap_size_flags = read_le_at::<u8>(data, &mut 6)?;
        let mut table_info = TableInfo {
            rows: table_info,
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: heap_size_flags & 1 == 1,
            is_large_index_guid: heap_size_flags & 2 == 2,
            is_large_index_blob: heap_size_flags & 4 == 4,
        };

        table_info.calculate_coded_index_bits();

        Ok(table_info)
    }

    /// Build a `TableInfo` from explicit row counts, for crafted test data.
    #[cfg(test)]
    pub fn new_test(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        let mut table_info = TableInfo {
            rows: vec![TableRowInfo::default(); TableId::COUNT],
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: large_str,
            is_large_index_guid: large_guid,
            is_large_index_blob: large_blob,
        };

        for valid_table in valid_tables {
            table_info.rows[valid_table.0 as usize] = TableRowInfo::new(valid_table.1);
        }

        table_info.calculate_coded_index_bits();
        table_info
    }

    /// Whether indexes into `id` are 4 bytes wide.
    #[must_use]
    pub fn is_large(&self, id: TableId) -> bool {
        self.rows[id as usize].is_large
    }

    /// Whether `#Strings` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// Whether `#GUID` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// Whether `#Blob` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width of a `#Strings` index.
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` index.
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index.
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Row information of `table`.
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// Width of a simple index into `table_id`.
    #[must_use]
    pub fn table_index_bytes(&self, table_id: TableId) -> u8 {
        if self.rows[table_id as usize].bits > 16 {
            4
        } else {
            2
        }
    }

    /// Total bits (row bits plus tag bits) needed by a coded index.
    #[must_use]
    pub fn coded_index_bits(&self, coded_index_type: CodedIndexType) -> u8 {
        self.coded_indexes[coded_index_type as usize]
    }

    /// Width of a coded index column.
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u8 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    /// Column widths of a row in `table`, in column order.
    #[must_use]
    #[rustfmt::skip]
    pub fn column_widths(&self, table: TableId) -> Vec<u8> {
        let s = self.str_bytes();
        let g = self.guid_bytes();
        let b = self.blob_bytes();
        let t = |id: TableId| self.table_index_bytes(id);
        let c = |ci: CodedIndexType| self.coded_index_bytes(ci);

        match table {
            TableId::Module                 => vec![2, s, g, g, g],
            TableId::TypeRef                => vec![c(CodedIndexType::ResolutionScope), s, s],
            TableId::TypeDef                => vec![4, s, s, c(CodedIndexType::TypeDefOrRef), t(TableId::Field), t(TableId::MethodDef)],
            TableId::FieldPtr               => vec![t(TableId::Field)],
            TableId::Field                  => vec![2, s, b],
            TableId::MethodPtr              => vec![t(TableId::MethodDef)],
            TableId::MethodDef              => vec![4, 2, 2, s, b, t(TableId::Param)],
            TableId::ParamPtr               => vec![t(TableId::Param)],
            TableId::Param                  => vec![2, 2, s],
            TableId::InterfaceImpl          => vec![t(TableId::TypeDef), c(CodedIndexType::TypeDefOrRef)],
            TableId::MemberRef              => vec![c(CodedIndexType::MemberRefParent), s, b],
            TableId::Constant               => vec![2, c(CodedIndexType::HasConstant), b],
            TableId::CustomAttribute        => vec![c(CodedIndexType::HasCustomAttribute), c(CodedIndexType::CustomAttributeType), b],
            TableId::FieldMarshal           => vec![c(CodedIndexType::HasFieldMarshal), b],
            TableId::DeclSecurity           => vec![2, c(CodedIndexType::HasDeclSecurity), b],
            TableId::ClassLayout            => vec![2, 4, t(TableId::TypeDef)],
            TableId::FieldLayout            => vec![4, t(TableId::Field)],
            TableId::StandAloneSig          => vec![b],
            TableId::EventMap               => vec![t(TableId::TypeDef), t(TableId::Event)],
            TableId::EventPtr               => vec![t(TableId::Event)],
            TableId::Event                  => vec![2, s, c(CodedIndexType::TypeDefOrRef)],
            TableId::PropertyMap            => vec![t(TableId::TypeDef), t(TableId::Property)],
            TableId::PropertyPtr            => vec![t(TableId::Property)],
            TableId::Property               => vec![2, s, b],
            TableId::MethodSemantics        => vec![2, t(TableId::MethodDef), c(CodedIndexType::HasSemantics)],
            TableId::MethodImpl             => vec![t(TableId::TypeDef), c(CodedIndexType::MethodDefOrRef), c(CodedIndexType::MethodDefOrRef)],
            TableId::ModuleRef              => vec![s],
            TableId::TypeSpec               => vec![b],
            TableId::ImplMap                => vec![2, c(CodedIndexType::MemberForwarded), s, t(TableId::ModuleRef)],
            TableId::FieldRVA               => vec![4, t(TableId::Field)],
            TableId::EncLog                 => vec![4, 4],
            TableId::EncMap                 => vec![4],
            TableId::Assembly               => vec![4, 2, 2, 2, 2, 4, b, s, s],
            TableId::AssemblyProcessor      => vec![4],
            TableId::AssemblyOS             => vec![4, 4, 4],
            TableId::AssemblyRef            => vec![2, 2, 2, 2, 4, b, s, s, b],
            TableId::AssemblyRefProcessor   => vec![4, t(TableId::AssemblyRef)],
            TableId::AssemblyRefOS          => vec![4, 4, 4, t(TableId::AssemblyRef)],
            TableId::File                   => vec![4, s, b],
            TableId::ExportedType           => vec![4, 4, s, s, c(CodedIndexType::Implementation)],
            TableId::ManifestResource       => vec![4, 4, s, c(CodedIndexType::Implementation)],
            TableId::NestedClass            => vec![t(TableId::TypeDef), t(TableId::TypeDef)],
            TableId::GenericParam           => vec![2, 2, c(CodedIndexType::TypeOrMethodDef), s],
            TableId::MethodSpec             => vec![c(CodedIndexType::MethodDefOrRef), b],
            TableId::GenericParamConstraint => vec![t(TableId::GenericParam), c(CodedIndexType::TypeDefOrRef)],
        }
    }

    /// Byte size of a row in `table`.
    #[must_use]
    pub fn row_size(&self, table: TableId) -> u32 {
        self.column_widths(table).iter().map(|w| u32::from(*w)).sum()
    }

    fn calculate_coded_index_size(&self, coded_index_type: CodedIndexType) -> u8 {
        let max_bits = coded_index_type
            .tables()
            .map(|table| self.rows[table as usize].bits)
            .max()
            .unwrap_or(1);

        max_bits + coded_index_type.tag_bits()
    }

    fn calculate_coded_index_bits(&mut self) {
        for coded_index in CodedIndexType::iter() {
            let size = self.calculate_coded_index_size(coded_index);
            self.coded_indexes[coded_index as usize] = size;
        }
    }
}
