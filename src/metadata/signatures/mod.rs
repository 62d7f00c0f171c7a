//! Signature and constant blob decoding.
//!
//! Native metadata only uses a small part of the ECMA-335 signature grammar: primitives,
//! unmanaged pointers, value and class types referenced through `TypeDefOrRef`, and fixed-size
//! single dimensional arrays. Everything else (generics, by-refs, custom modifiers, `SZARRAY`)
//! is rejected with [`crate::Error::NotSupported`].
//!
//! Decoding yields [`TypeSignature`] trees that still hold raw table references, the builder
//! resolves them into graph types.
//!
//! # Examples
//!
//! ```rust
//! use winmdscope::metadata::signatures::{parse_field_signature, TypeSignature};
//! use winmdscope::metadata::typesystem::PrimitiveKind;
//!
//! let field = parse_field_signature(&[0x06, 0x09])?;
//! assert_eq!(field.base, TypeSignature::Primitive(PrimitiveKind::UInt32));
//! # Ok::<(), winmdscope::Error>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 23.2 - Blobs and Signatures
//! - ECMA-335 6th Edition, Partition II, Section 22.9 - Constant

mod parser;
mod types;

pub use parser::*;
pub use types::*;

use crate::{
    file::parser::Parser,
    metadata::typesystem::{Literal, ELEMENT_TYPE},
    Result,
};

/// Parse a `MethodDefSig` or `MethodRefSig` from a blob.
///
/// # Errors
/// Returns an error if the signature is malformed, unsupported or has trailing data.
pub fn parse_method_signature(data: &[u8]) -> Result<SignatureMethod> {
    let mut parser = SignatureParser::new(data);
    parser.parse_method_signature()
}

/// Parse a `FieldSig` from a blob.
///
/// # Errors
/// Returns an error if the signature is malformed, unsupported or has trailing data.
pub fn parse_field_signature(data: &[u8]) -> Result<SignatureField> {
    let mut parser = SignatureParser::new(data);
    parser.parse_field_signature()
}

/// Decode the value blob of a `Constant` row with element type `base`.
///
/// String constants span the whole blob as UTF-16LE, all other kinds must consume it exactly.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for class constants, unknown element types or a blob
/// whose length does not match the element type.
pub fn parse_constant(base: u8, data: &[u8]) -> Result<Literal> {
    let mut parser = Parser::new(data);

    let value = match base {
        ELEMENT_TYPE::STRING => Literal::String(Some(parser.read_utf16_to_end()?)),
        ELEMENT_TYPE::BOOLEAN => Literal::Bool(parser.read_le::<u8>()? != 0),
        ELEMENT_TYPE::CHAR => Literal::Char(parser.read_le::<u16>()?),
        ELEMENT_TYPE::I1 => Literal::I1(parser.read_le::<i8>()?),
        ELEMENT_TYPE::U1 => Literal::U1(parser.read_le::<u8>()?),
        ELEMENT_TYPE::I2 => Literal::I2(parser.read_le::<i16>()?),
        ELEMENT_TYPE::U2 => Literal::U2(parser.read_le::<u16>()?),
        ELEMENT_TYPE::I4 => Literal::I4(parser.read_le::<i32>()?),
        ELEMENT_TYPE::U4 => Literal::U4(parser.read_le::<u32>()?),
        ELEMENT_TYPE::I8 => Literal::I8(parser.read_le::<i64>()?),
        ELEMENT_TYPE::U8 => Literal::U8(parser.read_le::<u64>()?),
        ELEMENT_TYPE::R4 => Literal::R4(parser.read_le::<f32>()?),
        ELEMENT_TYPE::R8 => Literal::R8(parser.read_le::<f64>()?),
        ELEMENT_TYPE::CLASS => return Err(malformed_error!("Constant of class type")),
        _ => return Err(malformed_error!("Constant of element type {:#04x}", base)),
    };

    if parser.has_more_data() {
        return Err(malformed_error!(
            "Constant blob has {} trailing bytes",
            parser.remaining()
        ));
    }

    Ok(value)
}
