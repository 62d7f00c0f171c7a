//! The `#~` stream (ECMA-335 II.24.2.6).
//!
//! The stream starts with a fixed header (heap-size flags, the bit vector of present tables and
//! the bit vector of sorted tables) followed by one row count per present table, followed by the
//! packed rows of all present tables in [`TableId`] order.
//!
//! [`TablesHeader`] keeps a zero-copy [`MetadataTable`] view for each table the metadata builder
//! consumes. All other tables are only sized, so the stream can be walked past them.

use std::sync::Arc;

use strum::IntoEnumIterator;

use crate::{
    file::io::read_le,
    metadata::tables::{
        impl_table_access, ClassLayoutRaw, ConstantRaw, CustomAttributeRaw, FieldLayoutRaw,
        FieldRaw, ImplMapRaw, InterfaceImplRaw, MemberRefRaw, MetadataTable, MethodDefRaw,
        ModuleRaw, ModuleRefRaw, NestedClassRaw, ParamRaw, TableData, TableId, TableInfo,
        TableInfoRef, TypeDefRaw, TypeRefRaw,
    },
    Result,
};

/// Size of the fixed part of the `#~` header, up to the first row count.
const FIXED_HEADER_SIZE: usize = 24;

/// The parsed `#~` stream.
///
/// ```rust,no_run
/// use winmdscope::metadata::{streams::TablesHeader, tables::{TableAccess, TypeDefRaw}};
///
/// # fn example(tables: &TablesHeader) -> winmdscope::Result<()> {
/// if let Some(typedefs) = TableAccess::<TypeDefRaw>::table(tables) {
///     for typedef in typedefs.iter() {
///         println!("flags {:#x}", typedef?.flags);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct TablesHeader<'a> {
    /// Major version of the table schema
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// Heap-size flags (bit 0 `#Strings`, bit 1 `#GUID`, bit 2 `#Blob`)
    pub heap_sizes: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Row counts and derived column widths
    pub info: TableInfoRef,
    tables: Vec<Option<TableData<'a>>>,
}

impl<'a> TablesHeader<'a> {
    /// Parse the `#~` stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream is shorter than its tables,
    /// [`crate::Error::Malformed`] if no table is present and [`crate::Error::NotSupported`]
    /// for tables beyond `GenericParamConstraint`.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < FIXED_HEADER_SIZE {
            return Err(out_of_bounds_error!());
        }

        let valid = read_le::<u64>(&data[8..])?;
        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }

        let info = Arc::new(TableInfo::new(data, valid)?);

        let mut tables_header = TablesHeader {
            major_version: read_le::<u8>(&data[4..])?,
            minor_version: read_le::<u8>(&data[5..])?,
            heap_sizes: read_le::<u8>(&data[6..])?,
            valid,
            sorted: read_le::<u64>(&data[16..])?,
            info,
            tables: Vec::new(),
        };
        tables_header.tables.resize_with(TableId::iter().count(), || None);

        let mut current_offset = FIXED_HEADER_SIZE + valid.count_ones() as usize * 4;
        for table_id in TableId::iter() {
            if !tables_header.has_table(table_id) {
                continue;
            }

            if current_offset > data.len() {
                return Err(out_of_bounds_error!());
            }

            let table_size = tables_header.add_table(&data[current_offset..], table_id)?;
            current_offset += table_size;
        }

        Ok(tables_header)
    }

    /// Whether the table `table_id` is present in the stream.
    #[must_use]
    pub fn has_table(&self, table_id: TableId) -> bool {
        self.valid & (1 << table_id as usize) != 0
    }

    /// Number of rows of `table_id`, 0 if the table is absent.
    #[must_use]
    pub fn table_row_count(&self, table_id: TableId) -> u32 {
        self.info.get(table_id).rows
    }

    /// The materialized view of `table_id`, if it is present and consumed.
    #[must_use]
    pub fn table_data(&self, table_id: TableId) -> Option<&TableData<'a>> {
        self.tables.get(table_id as usize)?.as_ref()
    }

    /// Store a view over `table_id` if it is consumed, returning the byte size of the table.
    fn add_table(&mut self, data: &'a [u8], table_id: TableId) -> Result<usize> {
        let rows = self.info.get(table_id).rows;

        macro_rules! view {
            ($raw:ty, $variant:ident) => {
                TableData::$variant(MetadataTable::<$raw>::new(data, rows, self.info.clone())?)
            };
        }

        let table = match table_id {
            TableId::Module => view!(ModuleRaw, Module),
            TableId::TypeRef => view!(TypeRefRaw, TypeRef),
            TableId::TypeDef => view!(TypeDefRaw, TypeDef),
            TableId::Field => view!(FieldRaw, Field),
            TableId::MethodDef => view!(MethodDefRaw, MethodDef),
            TableId::Param => view!(ParamRaw, Param),
            TableId::InterfaceImpl => view!(InterfaceImplRaw, InterfaceImpl),
            TableId::MemberRef => view!(MemberRefRaw, MemberRef),
            TableId::Constant => view!(ConstantRaw, Constant),
            TableId::CustomAttribute => view!(CustomAttributeRaw, CustomAttribute),
            TableId::ClassLayout => view!(ClassLayoutRaw, ClassLayout),
            TableId::FieldLayout => view!(FieldLayoutRaw, FieldLayout),
            TableId::ModuleRef => view!(ModuleRefRaw, ModuleRef),
            TableId::ImplMap => view!(ImplMapRaw, ImplMap),
            TableId::NestedClass => view!(NestedClassRaw, NestedClass),
            _ => {
                let size = u64::from(rows) * u64::from(self.info.row_size(table_id));
                if size > data.len() as u64 {
                    return Err(out_of_bounds_error!());
                }

                log::trace!("Skipping table {:?} with {} rows", table_id, rows);
                return usize::try_from(size).map_err(|_| out_of_bounds_error!());
            }
        };

        let size = u64::from(rows) * u64::from(self.info.row_size(table_id));
        self.tables[table_id as usize] = Some(table);
        usize::try_from(size).map_err(|_| out_of_bounds_error!())
    }
}

impl_table_access!(
    TablesHeader,
    (ModuleRaw, Module),
    (TypeRefRaw, TypeRef),
    (TypeDefRaw, TypeDef),
    (FieldRaw, Field),
    (MethodDefRaw, MethodDef),
    (ParamRaw, Param),
    (InterfaceImplRaw, InterfaceImpl),
    (MemberRefRaw, MemberRef),
    (ConstantRaw, Constant),
    (CustomAttributeRaw, CustomAttribute),
    (ClassLayoutRaw, ClassLayout),
    (FieldLayoutRaw, FieldLayout),
    (ModuleRefRaw, ModuleRef),
    (ImplMapRaw, ImplMap),
    (NestedClassRaw, NestedClass),
);
