use bitflags::bitflags;
use strum::{Display, EnumIter};

#[allow(non_snake_case, dead_code, missing_docs)]
/// Element type bytes of the signature encoding (II.23.1.16)
pub mod ELEMENT_TYPE {
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    pub const PTR: u8 = 0x0f;
    pub const VALUETYPE: u8 = 0x11;
    pub const CLASS: u8 = 0x12;
    pub const ARRAY: u8 = 0x14;
    pub const I: u8 = 0x18;
    pub const U: u8 = 0x19;
}

/// The fixed set of primitive kinds. Each kind exists exactly once in a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum PrimitiveKind {
    /// No value, only valid as a return type
    #[strum(serialize = "void")]
    Void,
    /// 1-byte boolean
    #[strum(serialize = "bool")]
    Bool,
    /// UTF-16 code unit
    Char,
    /// Signed 8-bit integer
    SByte,
    /// Unsigned 8-bit integer
    Byte,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 32-bit integer
    UInt32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// 32-bit IEEE float
    Single,
    /// 64-bit IEEE float
    Double,
    /// String, only seen in constants and attribute arguments
    String,
    /// Pointer-sized signed integer
    IntPtr,
    /// Pointer-sized unsigned integer
    UIntPtr,
}

impl PrimitiveKind {
    /// Map a signature element type to its primitive kind.
    #[must_use]
    pub fn from_element_type(element_type: u8) -> Option<PrimitiveKind> {
        let kind = match element_type {
            ELEMENT_TYPE::VOID => PrimitiveKind::Void,
            ELEMENT_TYPE::BOOLEAN => PrimitiveKind::Bool,
            ELEMENT_TYPE::CHAR => PrimitiveKind::Char,
            ELEMENT_TYPE::I1 => PrimitiveKind::SByte,
            ELEMENT_TYPE::U1 => PrimitiveKind::Byte,
            ELEMENT_TYPE::I2 => PrimitiveKind::Int16,
            ELEMENT_TYPE::U2 => PrimitiveKind::UInt16,
            ELEMENT_TYPE::I4 => PrimitiveKind::Int32,
            ELEMENT_TYPE::U4 => PrimitiveKind::UInt32,
            ELEMENT_TYPE::I8 => PrimitiveKind::Int64,
            ELEMENT_TYPE::U8 => PrimitiveKind::UInt64,
            ELEMENT_TYPE::R4 => PrimitiveKind::Single,
            ELEMENT_TYPE::R8 => PrimitiveKind::Double,
            ELEMENT_TYPE::STRING => PrimitiveKind::String,
            ELEMENT_TYPE::I => PrimitiveKind::IntPtr,
            ELEMENT_TYPE::U => PrimitiveKind::UIntPtr,
            _ => return None,
        };

        Some(kind)
    }

    /// The signature element type of this kind.
    #[must_use]
    pub fn element_type(self) -> u8 {
        match self {
            PrimitiveKind::Void => ELEMENT_TYPE::VOID,
            PrimitiveKind::Bool => ELEMENT_TYPE::BOOLEAN,
            PrimitiveKind::Char => ELEMENT_TYPE::CHAR,
            PrimitiveKind::SByte => ELEMENT_TYPE::I1,
            PrimitiveKind::Byte => ELEMENT_TYPE::U1,
            PrimitiveKind::Int16 => ELEMENT_TYPE::I2,
            PrimitiveKind::UInt16 => ELEMENT_TYPE::U2,
            PrimitiveKind::Int32 => ELEMENT_TYPE::I4,
            PrimitiveKind::UInt32 => ELEMENT_TYPE::U4,
            PrimitiveKind::Int64 => ELEMENT_TYPE::I8,
            PrimitiveKind::UInt64 => ELEMENT_TYPE::U8,
            PrimitiveKind::Single => ELEMENT_TYPE::R4,
            PrimitiveKind::Double => ELEMENT_TYPE::R8,
            PrimitiveKind::String => ELEMENT_TYPE::STRING,
            PrimitiveKind::IntPtr => ELEMENT_TYPE::I,
            PrimitiveKind::UIntPtr => ELEMENT_TYPE::U,
        }
    }

    /// Size and natural alignment in bytes, `None` for kinds without a memory representation.
    #[must_use]
    pub fn size(self) -> Option<u32> {
        match self {
            PrimitiveKind::Int64
            | PrimitiveKind::UInt64
            | PrimitiveKind::Double
            | PrimitiveKind::IntPtr
            | PrimitiveKind::UIntPtr => Some(8),
            PrimitiveKind::Int32 | PrimitiveKind::UInt32 | PrimitiveKind::Single => Some(4),
            PrimitiveKind::Int16 | PrimitiveKind::UInt16 | PrimitiveKind::Char => Some(2),
            PrimitiveKind::Byte | PrimitiveKind::SByte | PrimitiveKind::Bool => Some(1),
            PrimitiveKind::Void | PrimitiveKind::String => None,
        }
    }
}

bitflags! {
    /// Processor architectures of the `SupportedArchitecture` attribute.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Architecture: u32 {
        /// 32-bit x86, never generated for
        const X86 = 0x1;
        /// x86-64
        const X64 = 0x2;
        /// AArch64
        const ARM64 = 0x4;
    }
}

impl Architecture {
    /// The architectures bindings are generated for.
    pub const SUPPORTED: Architecture = Architecture::X64.union(Architecture::ARM64);

    /// Name suffix appended to entities specific to this single architecture.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        if self == Architecture::ARM64 {
            "_ARM64"
        } else {
            "_X64"
        }
    }

    /// Offset added to the definition index of a duplicate created for this architecture.
    #[must_use]
    pub fn index_offset(self) -> u32 {
        if self == Architecture::ARM64 {
            1_000_000
        } else {
            0
        }
    }
}

impl Default for Architecture {
    fn default() -> Self {
        Architecture::all()
    }
}
