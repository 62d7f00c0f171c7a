//! # winmdscope Prelude
//!
//! The most commonly used types of the crate in one glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all winmdscope operations
pub use crate::Error;

/// The result type used throughout winmdscope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The loaded type graph and its configuration
pub use crate::{LoaderConfig, Metadata};

/// Low-level file parsing utilities
pub use crate::{File, Parser};

// ================================================================================================
// Type System
// ================================================================================================

/// Entities of the graph and the ids referencing them
pub use crate::metadata::typesystem::{
    Architecture, ArrayType, ComInterface, Constant, ConstantId, ConstantValue, Delegate,
    EnumType, FlexibleArrayMember, Literal, Member, Method, MethodId, Namespace, Parameter,
    PrimitiveKind, QualifiedName, Struct, Type, TypeAlias, TypeId, TypeKind,
};

// ================================================================================================
// Scopes
// ================================================================================================

/// Name-based selections and the events they report
pub use crate::scope::{Event, EventListener, Scope};
