//! The type graph model.
//!
//! All entities live in arenas owned by [`crate::Metadata`] and refer to each other through the
//! copyable ids of this module. Types are a tagged sum over eight kinds ([`TypeKind`]), so every
//! walk over the graph matches exhaustively.
//!
//! # Key Components
//!
//! - [`Type`] / [`TypeKind`]: a type and its kind specific data
//! - [`Method`]: functions, delegate signatures and COM methods
//! - [`Namespace`]: the name to entity maps of one namespace
//! - [`Constant`] / [`Literal`]: namespace constants and their values
//! - [`PrimitiveKind`] / [`Architecture`]: fixed enumerations of the encoding

mod base;
mod literal;
mod method;
mod namespace;
mod types;

pub use base::{Architecture, PrimitiveKind, ELEMENT_TYPE};
pub use literal::{ConstantValue, Literal};
pub use method::{Method, Parameter};
pub use namespace::{Constant, Namespace, QualifiedName};
pub use types::{
    ArrayType, ComInterface, Delegate, EnumType, FlexibleArrayMember, Member, Struct, Type,
    TypeAlias, TypeKind,
};

/// Identity of a type within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

/// Identity of a method within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub(crate) usize);

/// Identity of a constant within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstantId(pub(crate) usize);
