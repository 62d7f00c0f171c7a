use crate::{
    file::parser::Parser,
    metadata::{
        customattributes::CustomAttributeValue,
        typesystem::{Literal, PrimitiveKind},
    },
    Result,
};

/// Custom attribute blob prolog
const PROLOG: u16 = 0x0001;

/// Parse a custom attribute value blob whose constructor takes `params`.
///
/// Enumeration parameters have to be passed as their underlying primitive. Named arguments
/// are not used by native metadata, a non-zero count is treated as malformed.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a missing prolog, named arguments, a `void`
/// parameter or trailing data, and [`crate::Error::OutOfBounds`] for a truncated blob.
///
/// # Examples
///
/// ```rust
/// use winmdscope::metadata::customattributes::parse_custom_attribute_data;
/// use winmdscope::metadata::typesystem::{Literal, PrimitiveKind};
///
/// let blob = &[0x01, 0x00, 0x04, b'a', b'n', b's', b'i', 0x00, 0x00];
/// let value = parse_custom_attribute_data(blob, &[PrimitiveKind::String])?;
/// assert_eq!(value.fixed_args, vec![Literal::String(Some("ansi".to_string()))]);
/// # Ok::<(), winmdscope::Error>(())
/// ```
pub fn parse_custom_attribute_data(data: &[u8], params: &[PrimitiveKind]) -> Result<CustomAttributeValue> {
    let mut parser = Parser::new(data);

    let prolog = parser.read_le::<u16>()?;
    if prolog != PROLOG {
        return Err(malformed_error!("Invalid custom attribute prolog - {:#06x}", prolog));
    }

    let mut fixed_args = Vec::with_capacity(params.len());
    for param in params {
        fixed_args.push(read_fixed_arg(&mut parser, *param)?);
    }

    let named_args = parser.read_le::<u16>()?;
    if named_args != 0 {
        return Err(malformed_error!("Custom attribute with {} named arguments", named_args));
    }

    if parser.has_more_data() {
        return Err(malformed_error!(
            "Custom attribute blob has {} trailing bytes",
            parser.remaining()
        ));
    }

    Ok(CustomAttributeValue { fixed_args })
}

fn read_fixed_arg(parser: &mut Parser, kind: PrimitiveKind) -> Result<Literal> {
    let value = match kind {
        PrimitiveKind::String => Literal::String(parser.read_ser_string()?),
        PrimitiveKind::Bool => Literal::Bool(parser.read_le::<u8>()? != 0),
        PrimitiveKind::Char => Literal::Char(parser.read_le::<u16>()?),
        PrimitiveKind::SByte => Literal::I1(parser.read_le::<i8>()?),
        PrimitiveKind::Byte => Literal::U1(parser.read_le::<u8>()?),
        PrimitiveKind::Int16 => Literal::I2(parser.read_le::<i16>()?),
        PrimitiveKind::UInt16 => Literal::U2(parser.read_le::<u16>()?),
        PrimitiveKind::Int32 => Literal::I4(parser.read_le::<i32>()?),
        PrimitiveKind::UInt32 => Literal::U4(parser.read_le::<u32>()?),
        PrimitiveKind::Int64 => Literal::I8(parser.read_le::<i64>()?),
        PrimitiveKind::UInt64 => Literal::U8(parser.read_le::<u64>()?),
        PrimitiveKind::Single => Literal::R4(parser.read_le::<f32>()?),
        PrimitiveKind::Double => Literal::R8(parser.read_le::<f64>()?),
        PrimitiveKind::Void | PrimitiveKind::IntPtr | PrimitiveKind::UIntPtr => {
            return Err(malformed_error!("Invalid custom attribute argument type {}", kind))
        }
    };

    Ok(value)
}
