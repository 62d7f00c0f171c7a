//! Coded indexes (ECMA-335 II.24.2.6).
//!
//! A coded index packs a reference into one of several candidate tables into a single column:
//! the low bits select the table (the *tag*), the remaining bits hold the 1-based row. The number
//! of tag bits is the minimum needed to enumerate the candidate list, and the column is 2 bytes
//! wide unless the largest candidate table no longer fits into the remaining `16 - tag_bits` bits.

use strum::{EnumCount, EnumIter};

use crate::{
    file::io::read_le_at_dyn,
    metadata::tables::{TableId, TableInfoRef},
    Result,
};

/// The coded index kinds used by the ECMA-335 tables up to `GenericParamConstraint`.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    /// `TypeDef`, `TypeRef` or `TypeSpec`
    TypeDefOrRef,
    /// `Field`, `Param` or `Property`
    HasConstant,
    /// Any table that may carry a custom attribute
    HasCustomAttribute,
    /// `Field` or `Param`
    HasFieldMarshal,
    /// `TypeDef`, `MethodDef` or `Assembly`
    HasDeclSecurity,
    /// Parent of a `MemberRef`
    MemberRefParent,
    /// `Event` or `Property`
    HasSemantics,
    /// `MethodDef` or `MemberRef`
    MethodDefOrRef,
    /// `Field` or `MethodDef`
    MemberForwarded,
    /// `File`, `AssemblyRef` or `ExportedType`
    Implementation,
    /// Constructor of a custom attribute. Tags 0, 1 and 4 are reserved.
    CustomAttributeType,
    /// Scope of a `TypeRef`
    ResolutionScope,
    /// `TypeDef` or `MethodDef`
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// The tag slots of this coded index kind, in tag order. `None` marks a reserved slot.
    #[must_use]
    pub fn slots(&self) -> &'static [Option<TableId>] {
        match self {
            CodedIndexType::TypeDefOrRef => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasConstant => &[
                Some(TableId::Field),
                Some(TableId::Param),
                Some(TableId::Property),
            ],
            CodedIndexType::HasCustomAttribute => &[
                Some(TableId::MethodDef),
                Some(TableId::Field),
                Some(TableId::TypeRef),
                Some(TableId::TypeDef),
                Some(TableId::Param),
                Some(TableId::InterfaceImpl),
                Some(TableId::MemberRef),
                Some(TableId::Module),
                // Labeled 'Permission' in the standard, no such table exists
                Some(TableId::DeclSecurity),
                Some(TableId::Property),
                Some(TableId::Event),
                Some(TableId::StandAloneSig),
                Some(TableId::ModuleRef),
                Some(TableId::TypeSpec),
                Some(TableId::Assembly),
                Some(TableId::AssemblyRef),
                Some(TableId::File),
                Some(TableId::ExportedType),
                Some(TableId::ManifestResource),
                Some(TableId::GenericParam),
                Some(TableId::GenericParamConstraint),
                Some(TableId::MethodSpec),
            ],
            CodedIndexType::HasFieldMarshal => &[Some(TableId::Field), Some(TableId::Param)],
            CodedIndexType::HasDeclSecurity => &[
                Some(TableId::TypeDef),
                Some(TableId::MethodDef),
                Some(TableId::Assembly),
            ],
            CodedIndexType::MemberRefParent => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::ModuleRef),
                Some(TableId::MethodDef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasSemantics => &[Some(TableId::Event), Some(TableId::Property)],
            CodedIndexType::MethodDefOrRef => &[Some(TableId::MethodDef), Some(TableId::MemberRef)],
            CodedIndexType::MemberForwarded => &[Some(TableId::Field), Some(TableId::MethodDef)],
            CodedIndexType::Implementation => &[
                Some(TableId::File),
                Some(TableId::AssemblyRef),
                Some(TableId::ExportedType),
            ],
            CodedIndexType::CustomAttributeType => &[
                None,
                None,
                Some(TableId::MethodDef),
                Some(TableId::MemberRef),
                None,
            ],
            CodedIndexType::ResolutionScope => &[
                Some(TableId::Module),
                Some(TableId::ModuleRef),
                Some(TableId::AssemblyRef),
                Some(TableId::TypeRef),
            ],
            CodedIndexType::TypeOrMethodDef => &[Some(TableId::TypeDef), Some(TableId::MethodDef)],
        }
    }

    /// Candidate tables, without the reserved slots.
    pub fn tables(&self) -> impl Iterator<Item = TableId> {
        self.slots().iter().flatten().copied()
    }

    /// Number of low bits used for the tag.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn tag_bits(&self) -> u8 {
        let slots = self.slots().len();
        // ceil(log2(slots)), slot lists are never empty
        (usize::BITS - (slots - 1).leading_zeros()) as u8
    }
}

/// A decoded coded index: the referenced table and its 1-based row (0 denotes a null reference).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodedIndex {
    /// The referenced table
    pub tag: TableId,
    /// The referenced row
    pub row: u32,
}

impl CodedIndex {
    /// Create a new `CodedIndex`.
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex { tag, row }
    }

    /// Read a coded index column at `offset`, using the width derived from `info`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated data and [`crate::Error::Malformed`]
    /// for a tag selecting a reserved or nonexistent slot.
    pub fn read(
        data: &[u8],
        offset: &mut usize,
        info: &TableInfoRef,
        ci_type: CodedIndexType,
    ) -> Result<Self> {
        let coded_index = read_le_at_dyn(data, offset, info.coded_index_bytes(ci_type) == 4)?;
        Self::decode(coded_index, ci_type)
    }

    /// Decode a raw coded index value.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a tag selecting a reserved or nonexistent slot.
    pub fn decode(value: u32, ci_type: CodedIndexType) -> Result<Self> {
        let tag_bits = ci_type.tag_bits();
        let tag = (value & ((1 << tag_bits) - 1)) as usize;
        let row = value >> tag_bits;

        match ci_type.slots().get(tag) {
            Some(Some(table)) => Ok(CodedIndex::new(*table, row)),
            _ => Err(malformed_error!(
                "Invalid tag {} for coded index {:?}",
                tag,
                ci_type
            )),
        }
    }

    /// Encode `(table, row)` as a raw coded index value of kind `ci_type`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `table` is not a candidate of `ci_type` or `row`
    /// does not fit next to the tag.
    pub fn encode(table: TableId, row: u32, ci_type: CodedIndexType) -> Result<u32> {
        let Some(tag) = ci_type.slots().iter().position(|slot| *slot == Some(table)) else {
            return Err(malformed_error!(
                "Table {:?} is not part of coded index {:?}",
                table,
                ci_type
            ));
        };

        let tag_bits = ci_type.tag_bits();
        if row.leading_zeros() < u32::from(tag_bits) {
            return Err(malformed_error!(
                "Row {} too large for coded index {:?}",
                row,
                ci_type
            ));
        }

        #[allow(clippy::cast_possible_truncation)]
        Ok((row << tag_bits) | tag as u32)
    }
}
