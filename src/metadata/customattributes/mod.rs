//! Custom attribute decoding.
//!
//! Native metadata attaches most of its C-level information through custom attributes: GUIDs,
//! documentation links, architecture masks, typedef markers, flexible arrays and so on. Each
//! attribute is constructed through a `MemberRef` whose parent `TypeRef` names the attribute
//! type; the value blob holds the constructor arguments (II.23.3).
//!
//! Attributes are split into three groups:
//! - the interpreted ones ([`AttributeKind`]), folded into an [`AttributeData`]
//! - a fixed list of ignored ones ([`IGNORED_ATTRIBUTES`])
//! - everything else, which is treated as malformed input
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 23.3 - Custom Attributes

mod parser;
mod types;

pub use parser::parse_custom_attribute_data;
pub use types::*;
