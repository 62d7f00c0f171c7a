use crate::metadata::{tables::CodedIndex, typesystem::PrimitiveKind};

/// A decoded type of a signature blob, before references are resolved into graph types.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSignature {
    /// A primitive element type
    Primitive(PrimitiveKind),
    /// Unmanaged pointer to the inner type
    Ptr(Box<TypeSignature>),
    /// Value type referenced through a `TypeDefOrRef` coded index
    ValueType(CodedIndex),
    /// Class type referenced through a `TypeDefOrRef` coded index
    Class(CodedIndex),
    /// Single dimensional array with a fixed size
    Array(SignatureArray),
}

/// A fixed-size, single dimensional array.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureArray {
    /// Element type
    pub base: Box<TypeSignature>,
    /// Number of elements
    pub size: u32,
}

/// A `MethodDefSig` or `MethodRefSig` (II.23.2.1, II.23.2.2).
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureMethod {
    /// Calling convention byte
    pub flags: u8,
    /// Return type
    pub return_type: TypeSignature,
    /// Parameter types
    pub params: Vec<TypeSignature>,
}

/// A `FieldSig` (II.23.2.4).
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureField {
    /// Field type
    pub base: TypeSignature,
}
