use crate::metadata::tables::{
    ClassLayoutRaw, ConstantRaw, CustomAttributeRaw, FieldLayoutRaw, FieldRaw, ImplMapRaw,
    InterfaceImplRaw, MemberRefRaw, MetadataTable, MethodDefRaw, ModuleRaw, ModuleRefRaw,
    NestedClassRaw, ParamRaw, RowReadable, TypeDefRaw, TypeRefRaw,
};

/// A materialized view of one of the tables consumed by the metadata builder.
pub enum TableData<'a> {
    /// `Module` rows
    Module(MetadataTable<'a, ModuleRaw>),
    /// `TypeRef` rows
    TypeRef(MetadataTable<'a, TypeRefRaw>),
    /// `TypeDef` rows
    TypeDef(MetadataTable<'a, TypeDefRaw>),
    /// `Field` rows
    Field(MetadataTable<'a, FieldRaw>),
    /// `MethodDef` rows
    MethodDef(MetadataTable<'a, MethodDefRaw>),
    /// `Param` rows
    Param(MetadataTable<'a, ParamRaw>),
    /// `InterfaceImpl` rows
    InterfaceImpl(MetadataTable<'a, InterfaceImplRaw>),
    /// `MemberRef` rows
    MemberRef(MetadataTable<'a, MemberRefRaw>),
    /// `Constant` rows
    Constant(MetadataTable<'a, ConstantRaw>),
    /// `CustomAttribute` rows
    CustomAttribute(MetadataTable<'a, CustomAttributeRaw>),
    /// `ClassLayout` rows
    ClassLayout(MetadataTable<'a, ClassLayoutRaw>),
    /// `FieldLayout` rows
    FieldLayout(MetadataTable<'a, FieldLayoutRaw>),
    /// `ModuleRef` rows
    ModuleRef(MetadataTable<'a, ModuleRefRaw>),
    /// `ImplMap` rows
    ImplMap(MetadataTable<'a, ImplMapRaw>),
    /// `NestedClass` rows
    NestedClass(MetadataTable<'a, NestedClassRaw>),
}

/// Typed access to a materialized table, keyed by its raw row type.
pub trait TableAccess<'a, T: RowReadable> {
    /// The table holding rows of type `T`, if present.
    fn table(&self) -> Option<&MetadataTable<'a, T>>;
}

/// Implements [`TableAccess`] on a container exposing `fn table_data(&self, TableId)`.
macro_rules! impl_table_access {
    ($owner:ident, $(($raw:ty, $variant:ident)),* $(,)?) => {
        $(
            impl<'a> $crate::metadata::tables::TableAccess<'a, $raw> for $owner<'a> {
                fn table(&self) -> Option<&$crate::metadata::tables::MetadataTable<'a, $raw>> {
                    match self.table_data(<$raw as $crate::metadata::tables::RowReadable>::TABLE_ID)? {
                        $crate::metadata::tables::TableData::$variant(table) => Some(table),
                        _ => None,
                    }
                }
            }
        )*
    };
}

pub(crate) use impl_table_access;
