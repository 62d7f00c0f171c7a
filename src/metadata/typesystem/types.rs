use std::collections::BTreeMap;

use uguid::Guid;

use crate::metadata::typesystem::{Literal, MethodId, PrimitiveKind, QualifiedName, TypeId};

/// A type of the graph.
///
/// The display `name` may be rewritten when architecture variants are split, `native_name` keeps
/// the name the type was declared with and is what lookups by name match against.
#[derive(Debug, Clone)]
pub struct Type {
    /// Display name, suffixed for architecture-specific variants
    pub name: String,
    /// Declared name
    pub native_name: String,
    /// Owning namespace, `None` for nested types, primitives, pointers and arrays
    pub namespace: Option<String>,
    /// `TypeDef` row the type was created from, 0 for synthesized types
    pub definition_index: u32,
    /// Link to the documentation of the native type
    pub documentation_url: Option<String>,
    /// Kind specific data
    pub kind: TypeKind,
}

impl Type {
    pub(crate) fn new(
        name: &str,
        namespace: Option<&str>,
        definition_index: u32,
        kind: TypeKind,
    ) -> Type {
        Type {
            name: name.to_string(),
            native_name: name.to_string(),
            namespace: namespace.map(str::to_string),
            definition_index,
            documentation_url: None,
            kind,
        }
    }

    /// A nested type the native headers declare without a name.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.namespace.is_none() && self.name.to_ascii_lowercase().contains("anonymous")
    }

    /// Namespace and display name, `None` for types without a namespace.
    #[must_use]
    pub fn qualified_name(&self) -> Option<QualifiedName> {
        self.namespace
            .as_ref()
            .map(|namespace| QualifiedName::new(namespace, &self.name))
    }

    /// The struct data, if this is a struct or union.
    #[must_use]
    pub fn as_struct(&self) -> Option<&Struct> {
        match &self.kind {
            TypeKind::Struct(data) => Some(data),
            _ => None,
        }
    }

    /// The enumeration data, if this is an enumeration.
    #[must_use]
    pub fn as_enum(&self) -> Option<&EnumType> {
        match &self.kind {
            TypeKind::Enum(data) => Some(data),
            _ => None,
        }
    }

    /// The primitive kind, if this is a primitive.
    #[must_use]
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match &self.kind {
            TypeKind::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub(crate) fn as_struct_mut(&mut self) -> Option<&mut Struct> {
        match &mut self.kind {
            TypeKind::Struct(data) => Some(data),
            _ => None,
        }
    }
}

/// The eight kinds of types.
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// One of the fixed primitive kinds
    Primitive(PrimitiveKind),
    /// A struct or union
    Struct(Struct),
    /// An enumeration
    Enum(EnumType),
    /// A function pointer shape
    Delegate(Delegate),
    /// A COM interface
    ComInterface(ComInterface),
    /// Pointer to the referenced type, interned per referenced type
    Pointer(TypeId),
    /// Fixed length array
    Array(ArrayType),
    /// Transparent rename of a primitive or a pointer to one
    Alias(TypeAlias),
}

/// Struct or union data.
#[derive(Debug, Clone, Default)]
pub struct Struct {
    /// All members start at offset 0
    pub is_union: bool,
    /// Enforced alignment once layout is done, declared packing before (0 = natural)
    pub packing_size: u32,
    /// Size in bytes once layout is done, declared class size before (0 = unknown)
    pub size: u32,
    /// Enclosing type of a nested struct
    pub enclosing: Option<TypeId>,
    /// Nested types by name
    pub nested_types: BTreeMap<String, TypeId>,
    /// Members in declaration order
    pub members: Vec<Member>,
    /// Members have been decoded
    pub fields_built: bool,
    /// Offsets, padding, size and packing are final
    pub layout_done: bool,
    /// Depends on architecture-specific data
    pub architecture_specific: bool,
    /// Trailing member of variable length, found through nested structs
    pub flexible_array_member: Option<FlexibleArrayMember>,
    /// Name of a member that must hold the struct size
    pub struct_size_member: Option<String>,
    /// GUID associated with the struct
    pub guid: Option<Guid>,
}

impl Struct {
    /// True unless the struct ends in a flexible array.
    #[must_use]
    pub fn has_fixed_size(&self) -> bool {
        self.flexible_array_member.is_none()
    }

    /// Member by name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.name == name)
    }
}

/// Location of a flexible array member: the struct that declares it and its index in that
/// struct's members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlexibleArrayMember {
    /// The declaring struct, possibly a nested struct of the one this is attached to
    pub owner: TypeId,
    /// Index into the owner's members
    pub index: usize,
}

/// A struct member or an enumeration constant.
#[derive(Debug, Clone)]
pub struct Member {
    /// Member name
    pub name: String,
    /// `Field` row of the member
    pub field_index: u32,
    /// Member type
    pub ty: TypeId,
    /// Literal value of enumeration members
    pub value: Option<Literal>,
    /// Offset in bytes, computed by layout
    pub offset: u32,
    /// Gap to the next member or to the struct end, computed by layout
    pub padding_after: u32,
}

impl Member {
    /// Bitfield storage member.
    #[must_use]
    pub fn is_bitfield(&self) -> bool {
        self.name == "_bitfield"
    }
}

/// Enumeration data.
#[derive(Debug, Clone, Default)]
pub struct EnumType {
    /// Underlying integer primitive
    pub base: Option<TypeId>,
    /// Members can be combined as bit flags
    pub is_flags: bool,
    /// Members in declaration order
    pub members: Vec<Member>,
    /// Members have been decoded
    pub fields_built: bool,
}

impl EnumType {
    /// Member by name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.name == name)
    }
}

/// Delegate data.
#[derive(Debug, Clone, Default)]
pub struct Delegate {
    /// The `Invoke` method describing the callable shape
    pub signature: Option<MethodId>,
}

/// COM interface data.
#[derive(Debug, Clone, Default)]
pub struct ComInterface {
    /// Interface identifier
    pub iid: Option<Guid>,
    /// Declared methods, inherited ones excluded
    pub methods: Vec<MethodId>,
    /// Parent interface
    pub implemented: Option<TypeId>,
}

/// Array data.
#[derive(Debug, Clone)]
pub struct ArrayType {
    /// Element type
    pub item: TypeId,
    /// Declared number of elements
    pub length: u32,
    /// The real length is given by the allocation size
    pub flexible: bool,
}

/// Alias data.
#[derive(Debug, Clone, Default)]
pub struct TypeAlias {
    /// The aliased primitive or pointer
    pub aliased: Option<TypeId>,
}
