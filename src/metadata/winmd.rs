//! Decoded view over one metadata root.
//!
//! [`WinmdFile`] ties the metadata root, the `#~` tables and the `#Strings` / `#Blob` heaps
//! together and answers the row-level questions the builder asks: the rows owned by a type or
//! method, and the key-based lookups into the sorted association tables (`ClassLayout`,
//! `Constant`, `CustomAttribute`, `FieldLayout`, `ImplMap`, `InterfaceImpl`, `NestedClass`).

use crate::{
    metadata::{
        root::Root,
        streams::{Blob, Strings, TablesHeader},
        tables::{
            ClassLayoutRaw, CodedIndex, CodedIndexType, ConstantRaw, CustomAttributeRaw,
            FieldLayoutRaw, FieldRaw, ImplMapRaw, InterfaceImplRaw, MemberRefRaw, MetadataTable,
            MethodDefRaw, ParamRaw, RowReadable, TableAccess, TableId, TypeDefRaw, TypeRefRaw,
            ModuleRefRaw, NestedClassRaw,
        },
    },
    Result,
};

/// Column of `TypeDef` holding the first owned field.
const TYPEDEF_FIELD_LIST: usize = 4;
/// Column of `TypeDef` holding the first owned method.
const TYPEDEF_METHOD_LIST: usize = 5;
/// Column of `MethodDef` holding the first owned parameter.
const METHODDEF_PARAM_LIST: usize = 5;

/// The streams of one metadata root, borrowed from the underlying file.
pub struct WinmdFile<'a> {
    root: Root,
    tables: TablesHeader<'a>,
    strings: Strings<'a>,
    blobs: Blob<'a>,
}

impl<'a> WinmdFile<'a> {
    /// Decode the metadata root starting at the beginning of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the root or any of the `#~`, `#Strings` and `#Blob`
    /// streams is missing or invalid.
    pub fn read(data: &'a [u8]) -> Result<WinmdFile<'a>> {
        let root = Root::read(data)?;

        let Some(tables) = root.stream(data, "#~") else {
            return Err(malformed_error!("Metadata has no '#~' stream"));
        };
        let Some(strings) = root.stream(data, "#Strings") else {
            return Err(malformed_error!("Metadata has no '#Strings' stream"));
        };
        let Some(blobs) = root.stream(data, "#Blob") else {
            return Err(malformed_error!("Metadata has no '#Blob' stream"));
        };

        Ok(WinmdFile {
            tables: TablesHeader::from(tables)?,
            strings: Strings::from(strings)?,
            blobs: Blob::from(blobs)?,
            root,
        })
    }

    /// The version string of the metadata root.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.root.version
    }

    /// The decoded `#~` stream.
    #[must_use]
    pub fn tables(&self) -> &TablesHeader<'a> {
        &self.tables
    }

    /// String at `index` of the `#Strings` heap. Index 0 is the empty string.
    ///
    /// # Errors
    /// Returns an error if `index` is outside the heap.
    pub fn string(&self, index: u32) -> Result<&'a str> {
        self.strings.get(index as usize)
    }

    /// Blob at `index` of the `#Blob` heap.
    ///
    /// # Errors
    /// Returns an error if `index` or the blob length is outside the heap.
    pub fn blob(&self, index: u32) -> Result<&'a [u8]> {
        self.blobs.get(index as usize)
    }

    /// Number of `TypeDef` rows, including the `<Module>` pseudo type.
    #[must_use]
    pub fn typedef_count(&self) -> u32 {
        self.tables.table_row_count(TableId::TypeDef)
    }

    /// `TypeDef` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the row does not exist.
    pub fn typedef(&self, rid: u32) -> Result<TypeDefRaw> {
        self.row(rid)
    }

    /// `TypeRef` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the row does not exist.
    pub fn typeref(&self, rid: u32) -> Result<TypeRefRaw> {
        self.row(rid)
    }

    /// `MemberRef` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the row does not exist.
    pub fn memberref(&self, rid: u32) -> Result<MemberRefRaw> {
        self.row(rid)
    }

    /// `MethodDef` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the row does not exist.
    pub fn methoddef(&self, rid: u32) -> Result<MethodDefRaw> {
        self.row(rid)
    }

    /// Name of `ModuleRef` row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the row does not exist.
    pub fn moduleref_name(&self, rid: u32) -> Result<&'a str> {
        let module_ref: ModuleRefRaw = self.row(rid)?;
        self.string(module_ref.name)
    }

    /// The fields owned by `TypeDef` row `typedef`.
    ///
    /// # Errors
    /// Returns an error if the owning row or any owned row cannot be read.
    pub fn fields(&self, typedef: u32) -> Result<Vec<FieldRaw>> {
        self.owned_rows::<TypeDefRaw, FieldRaw>(typedef, TYPEDEF_FIELD_LIST)
    }

    /// The methods owned by `TypeDef` row `typedef`.
    ///
    /// # Errors
    /// Returns an error if the owning row or any owned row cannot be read.
    pub fn methods(&self, typedef: u32) -> Result<Vec<MethodDefRaw>> {
        self.owned_rows::<TypeDefRaw, MethodDefRaw>(typedef, TYPEDEF_METHOD_LIST)
    }

    /// The parameters owned by `MethodDef` row `methoddef`.
    ///
    /// # Errors
    /// Returns an error if the owning row or any owned row cannot be read.
    pub fn params(&self, methoddef: u32) -> Result<Vec<ParamRaw>> {
        self.owned_rows::<MethodDefRaw, ParamRaw>(methoddef, METHODDEF_PARAM_LIST)
    }

    /// The `ClassLayout` row of `TypeDef` row `typedef`, if any.
    ///
    /// # Errors
    /// Returns an error if the table cannot be searched.
    pub fn class_layout(&self, typedef: u32) -> Result<Option<ClassLayoutRaw>> {
        let width = self.tables.info.table_index_bytes(TableId::TypeDef);
        self.find_by_key(typedef, width, ClassLayoutRaw::PARENT_OFFSET)
    }

    /// The `Constant` row holding the default value of `Field` row `field`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the field has no constant.
    pub fn constant(&self, field: u32) -> Result<ConstantRaw> {
        let key = CodedIndex::encode(TableId::Field, field, CodedIndexType::HasConstant)?;
        let width = self.tables.info.coded_index_bytes(CodedIndexType::HasConstant);

        // Constant: type (1), padding (1), parent
        match self.find_by_key(key, width, 2)? {
            Some(constant) => Ok(constant),
            None => Err(malformed_error!("Literal field {} has no constant", field)),
        }
    }

    /// The `FieldLayout` row of `Field` row `field`, if any.
    ///
    /// # Errors
    /// Returns an error if the table cannot be searched.
    pub fn field_layout(&self, field: u32) -> Result<Option<FieldLayoutRaw>> {
        let width = self.tables.info.table_index_bytes(TableId::Field);
        self.find_by_key(field, width, FieldLayoutRaw::FIELD_OFFSET)
    }

    /// The `ImplMap` row forwarding `MethodDef` row `methoddef` to a native library, if any.
    ///
    /// # Errors
    /// Returns an error if the table cannot be searched.
    pub fn impl_map(&self, methoddef: u32) -> Result<Option<ImplMapRaw>> {
        let key = CodedIndex::encode(TableId::MethodDef, methoddef, CodedIndexType::MemberForwarded)?;
        let width = self.tables.info.coded_index_bytes(CodedIndexType::MemberForwarded);
        self.find_by_key(key, width, ImplMapRaw::MEMBER_FORWARDED_OFFSET)
    }

    /// The enclosing `TypeDef` row of the nested `TypeDef` row `typedef`, if it is nested.
    ///
    /// # Errors
    /// Returns an error if the table cannot be searched.
    pub fn enclosing_type(&self, typedef: u32) -> Result<Option<u32>> {
        let width = self.tables.info.table_index_bytes(TableId::TypeDef);
        let nested: Option<NestedClassRaw> = self.find_by_key(typedef, width, 0)?;
        Ok(nested.map(|row| row.enclosing_class))
    }

    /// The `InterfaceImpl` rows of `TypeDef` row `typedef`.
    ///
    /// # Errors
    /// Returns an error if the table cannot be searched.
    pub fn interface_impls(&self, typedef: u32) -> Result<Vec<InterfaceImplRaw>> {
        let width = self.tables.info.table_index_bytes(TableId::TypeDef);
        self.rows_with_key(typedef, width)
    }

    /// The `CustomAttribute` rows attached to `parent`.
    ///
    /// # Errors
    /// Returns an error if `parent` cannot carry attributes or the table cannot be searched.
    pub fn custom_attributes(&self, parent: CodedIndex) -> Result<Vec<CustomAttributeRaw>> {
        let key = CodedIndex::encode(parent.tag, parent.row, CodedIndexType::HasCustomAttribute)?;
        let width = self.tables.info.coded_index_bytes(CodedIndexType::HasCustomAttribute);
        self.rows_with_key(key, width)
    }

    fn table<T: RowReadable>(&self) -> Option<&MetadataTable<'a, T>>
    where
        TablesHeader<'a>: TableAccess<'a, T>,
    {
        TableAccess::<T>::table(&self.tables)
    }

    fn row<T: RowReadable>(&self, rid: u32) -> Result<T>
    where
        TablesHeader<'a>: TableAccess<'a, T>,
    {
        match self.table::<T>() {
            Some(table) => table.get(rid),
            None => Err(malformed_error!("Missing {:?} row {}", T::TABLE_ID, rid)),
        }
    }

    /// Rows `list(owner) .. list(owner + 1)` of the table `T` owns into, or up to the end of that
    /// table for the last owner.
    fn owned_rows<O: RowReadable, T: RowReadable>(&self, owner: u32, column: usize) -> Result<Vec<T>>
    where
        TablesHeader<'a>: TableAccess<'a, O> + TableAccess<'a, T>,
    {
        let Some(owners) = self.table::<O>() else {
            return Err(malformed_error!("Missing {:?} table", O::TABLE_ID));
        };
        let Some(target) = self.table::<T>() else {
            return Ok(Vec::new());
        };

        let first = owners.value(owner, column)?;
        let last = if owner < owners.row_count() {
            owners.value(owner + 1, column)?.saturating_sub(1)
        } else {
            target.row_count()
        };

        if first <= last && (first == 0 || last > target.row_count()) {
            return Err(malformed_error!(
                "{:?} row {} owns {:?} rows {}..={} past the table end",
                O::TABLE_ID,
                owner,
                T::TABLE_ID,
                first,
                last
            ));
        }

        target.range(first, last).collect()
    }

    fn find_by_key<T: RowReadable>(&self, key: u32, width: u8, offset: usize) -> Result<Option<T>>
    where
        TablesHeader<'a>: TableAccess<'a, T>,
    {
        let Some(table) = self.table::<T>() else {
            return Ok(None);
        };

        match table.index_by_primary_key(key, usize::from(width), offset)? {
            0 => Ok(None),
            rid => table.get(rid).map(Some),
        }
    }

    fn rows_with_key<T: RowReadable>(&self, key: u32, width: u8) -> Result<Vec<T>>
    where
        TablesHeader<'a>: TableAccess<'a, T>,
    {
        let Some(table) = self.table::<T>() else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::new();
        for rid in table.rows_with_key(key, usize::from(width))? {
            rows.push(table.get(rid)?);
        }

        Ok(rows)
    }
}
