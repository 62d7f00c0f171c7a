//! ECMA-335 metadata tables (II.22).
//!
//! Each consumed table has a raw row type that decodes one packed row of the `#~` stream. Rows
//! hold heap indexes and row references exactly as stored, resolving them into strings, blobs
//! and model entities is left to the metadata builder.
//!
//! Only the tables that describe native metadata are decoded. All other tables are still sized
//! correctly (see [`TableInfo::row_size`]) so the stream can be walked past them.

mod types;

mod classlayout;
mod constant;
mod customattribute;
mod field;
mod fieldlayout;
mod implmap;
mod interfaceimpl;
mod memberref;
mod methoddef;
mod module;
mod moduleref;
mod nestedclass;
mod param;
mod typedef;
mod typeref;

pub use types::*;
pub(crate) use types::impl_table_access;

pub use classlayout::ClassLayoutRaw;
pub use constant::ConstantRaw;
pub use customattribute::CustomAttributeRaw;
pub use field::{FieldAttributes, FieldRaw};
pub use fieldlayout::FieldLayoutRaw;
pub use implmap::{ImplMapRaw, PInvokeAttributes};
pub use interfaceimpl::InterfaceImplRaw;
pub use memberref::MemberRefRaw;
pub use methoddef::MethodDefRaw;
pub use module::ModuleRaw;
pub use moduleref::ModuleRefRaw;
pub use nestedclass::NestedClassRaw;
pub use param::ParamRaw;
pub use typedef::{TypeAttributes, TypeDefRaw};
pub use typeref::TypeRefRaw;
