use std::fmt;

use uguid::Guid;

use crate::metadata::typesystem::PrimitiveKind;

/// A literal value of a constant, an enumeration member or an attribute argument, keeping the
/// exact encoded kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `bool`
    Bool(bool),
    /// UTF-16 code unit
    Char(u16),
    /// `i8`
    I1(i8),
    /// `u8`
    U1(u8),
    /// `i16`
    I2(i16),
    /// `u16`
    U2(u16),
    /// `i32`
    I4(i32),
    /// `u32`
    U4(u32),
    /// `i64`
    I8(i64),
    /// `u64`
    U8(u64),
    /// `f32`
    R4(f32),
    /// `f64`
    R8(f64),
    /// String, `None` for the serialized null string of attribute arguments
    String(Option<String>),
}

impl Literal {
    /// The primitive kind of the value.
    #[must_use]
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Literal::Bool(_) => PrimitiveKind::Bool,
            Literal::Char(_) => PrimitiveKind::Char,
            Literal::I1(_) => PrimitiveKind::SByte,
            Literal::U1(_) => PrimitiveKind::Byte,
            Literal::I2(_) => PrimitiveKind::Int16,
            Literal::U2(_) => PrimitiveKind::UInt16,
            Literal::I4(_) => PrimitiveKind::Int32,
            Literal::U4(_) => PrimitiveKind::UInt32,
            Literal::I8(_) => PrimitiveKind::Int64,
            Literal::U8(_) => PrimitiveKind::UInt64,
            Literal::R4(_) => PrimitiveKind::Single,
            Literal::R8(_) => PrimitiveKind::Double,
            Literal::String(_) => PrimitiveKind::String,
        }
    }

    /// True for integer, floating point, boolean and character values.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Literal::String(_))
    }

    /// Integer value sign-extended or zero-extended to `i64`, `None` for non-integers and
    /// `u64` values above `i64::MAX`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Literal::Bool(value) => Some(i64::from(value)),
            Literal::Char(value) => Some(i64::from(value)),
            Literal::I1(value) => Some(i64::from(value)),
            Literal::U1(value) => Some(i64::from(value)),
            Literal::I2(value) => Some(i64::from(value)),
            Literal::U2(value) => Some(i64::from(value)),
            Literal::I4(value) => Some(i64::from(value)),
            Literal::U4(value) => Some(i64::from(value)),
            Literal::I8(value) => Some(value),
            Literal::U8(value) => i64::try_from(value).ok(),
            Literal::R4(_) | Literal::R8(_) | Literal::String(_) => None,
        }
    }

    /// The string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(value) => value.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Char(value) => write!(f, "{value}"),
            Literal::I1(value) => write!(f, "{value}"),
            Literal::U1(value) => write!(f, "{value}"),
            Literal::I2(value) => write!(f, "{value}"),
            Literal::U2(value) => write!(f, "{value}"),
            Literal::I4(value) => write!(f, "{value}"),
            Literal::U4(value) => write!(f, "{value}"),
            Literal::I8(value) => write!(f, "{value}"),
            Literal::U8(value) => write!(f, "{value}"),
            Literal::R4(value) => write!(f, "{value}"),
            Literal::R8(value) => write!(f, "{value}"),
            Literal::String(Some(value)) => write!(f, "{value:?}"),
            Literal::String(None) => write!(f, "null"),
        }
    }
}

/// The value of a namespace constant.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// Numeric or string literal
    Literal(Literal),
    /// GUID, for constants of type `System.Guid`
    Guid(Guid),
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Literal(literal) => literal.fmt(f),
            ConstantValue::Guid(guid) => write!(f, "{guid}"),
        }
    }
}
