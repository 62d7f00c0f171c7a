use uguid::Guid;

use crate::{
    metadata::typesystem::{Architecture, Literal},
    Result,
};

const SYSTEM: &str = "System";
const METADATA: &str = "Windows.Win32.Foundation.Metadata";

/// Attributes that carry no information for native bindings.
pub const IGNORED_ATTRIBUTES: [(&str, &str); 22] = [
    (SYSTEM, "AttributeUsageAttribute"),
    ("System.Diagnostics.CodeAnalysis", "DoesNotReturnAttribute"),
    ("System.Runtime.InteropServices", "ComVisibleAttribute"),
    ("System.Runtime.InteropServices", "UnmanagedFunctionPointerAttribute"),
    (METADATA, "AgileAttribute"),
    (METADATA, "AlsoUsableForAttribute"),
    (METADATA, "AnsiAttribute"),
    (METADATA, "AssociatedConstantAttribute"),
    (METADATA, "AssociatedEnumAttribute"),
    (METADATA, "CanReturnErrorsAsSuccessAttribute"),
    (METADATA, "CanReturnMultipleSuccessValuesAttribute"),
    (METADATA, "ConstAttribute"),
    (METADATA, "InvalidHandleValueAttribute"),
    (METADATA, "MetadataTypedefAttribute"),
    (METADATA, "NativeArrayInfoAttribute"),
    (METADATA, "NativeBitfieldAttribute"),
    (METADATA, "NotNullTerminatedAttribute"),
    (METADATA, "NullNullTerminatedAttribute"),
    (METADATA, "RAIIFreeAttribute"),
    (METADATA, "ScopedEnumAttribute"),
    (METADATA, "SupportedOSPlatformAttribute"),
    (METADATA, "UnicodeAttribute"),
];

/// Returns true if the attribute type `namespace.name` is skipped.
#[must_use]
pub fn is_ignored(namespace: &str, name: &str) -> bool {
    IGNORED_ATTRIBUTES
        .iter()
        .any(|(ignored_namespace, ignored_name)| *ignored_namespace == namespace && *ignored_name == name)
}

/// The attributes the builder interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// `System.FlagsAttribute`
    Flags,
    /// `System.ObsoleteAttribute`
    Obsolete,
    /// Marks a struct as a typedef of its single `Value` field
    NativeTypedef,
    /// Documentation URL
    Documentation,
    /// Architecture bitmask
    SupportedArchitecture,
    /// GUID given as 11 arguments
    Guid,
    /// Constant value given as a string
    Constant,
    /// Character set of a string constant
    NativeEncoding,
    /// Array member of variable length
    FlexibleArray,
    /// Member holding the struct size
    StructSizeField,
}

impl AttributeKind {
    /// The kind of attribute type `namespace.name`, if it is interpreted.
    #[must_use]
    pub fn from_name(namespace: &str, name: &str) -> Option<AttributeKind> {
        let kind = match (namespace, name) {
            (SYSTEM, "FlagsAttribute") => AttributeKind::Flags,
            (SYSTEM, "ObsoleteAttribute") => AttributeKind::Obsolete,
            (METADATA, "NativeTypedefAttribute") => AttributeKind::NativeTypedef,
            (METADATA, "DocumentationAttribute") => AttributeKind::Documentation,
            (METADATA, "SupportedArchitectureAttribute") => AttributeKind::SupportedArchitecture,
            (METADATA, "GuidAttribute") => AttributeKind::Guid,
            (METADATA, "ConstantAttribute") => AttributeKind::Constant,
            (METADATA, "NativeEncodingAttribute") => AttributeKind::NativeEncoding,
            (METADATA, "FlexibleArrayAttribute") => AttributeKind::FlexibleArray,
            (METADATA, "StructSizeFieldAttribute") => AttributeKind::StructSizeField,
            _ => return None,
        };

        Some(kind)
    }

    /// Returns true if the attribute's arguments have to be decoded.
    #[must_use]
    pub fn has_value(self) -> bool {
        !matches!(
            self,
            AttributeKind::Flags
                | AttributeKind::Obsolete
                | AttributeKind::NativeTypedef
                | AttributeKind::FlexibleArray
        )
    }
}

/// Decoded value blob of a custom attribute (II.23.3), fixed arguments only.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeValue {
    /// Fixed arguments in constructor parameter order
    pub fixed_args: Vec<Literal>,
}

impl CustomAttributeValue {
    fn first(&self) -> Result<&Literal> {
        self.fixed_args
            .first()
            .ok_or_else(|| malformed_error!("Custom attribute without arguments"))
    }

    fn first_string(&self) -> Result<Option<String>> {
        match self.first()? {
            Literal::String(value) => Ok(value.clone()),
            other => Err(malformed_error!("Expected string argument, got {:?}", other)),
        }
    }
}

/// The information collected from all attributes of one type, method or field.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeData {
    /// `NativeTypedef` present
    pub is_typedef: bool,
    /// `Obsolete` present
    pub is_obsolete: bool,
    /// `Flags` present
    pub is_flags: bool,
    /// Value of `Guid`
    pub guid: Option<Guid>,
    /// Value of `SupportedArchitecture`, all architectures if absent
    pub supported_architecture: Architecture,
    /// Value of `Documentation`
    pub documentation_url: Option<String>,
    /// Value of `Constant`
    pub constant_value: Option<Literal>,
    /// `NativeEncoding("ansi")` present
    pub is_ansi: bool,
    /// `FlexibleArray` present
    pub is_flexible_array: bool,
    /// Value of `StructSizeField`
    pub struct_size_field: Option<String>,
}

impl Default for AttributeData {
    fn default() -> Self {
        AttributeData {
            is_typedef: false,
            is_obsolete: false,
            is_flags: false,
            guid: None,
            supported_architecture: Architecture::all(),
            documentation_url: None,
            constant_value: None,
            is_ansi: false,
            is_flexible_array: false,
            struct_size_field: None,
        }
    }
}

impl AttributeData {
    /// Record one attribute. `value` must be present for kinds that [`AttributeKind::has_value`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the arguments do not match the attribute.
    pub fn apply(&mut self, kind: AttributeKind, value: Option<&CustomAttributeValue>) -> Result<()> {
        let value = match (kind.has_value(), value) {
            (false, _) => None,
            (true, Some(value)) => Some(value),
            (true, None) => return Err(malformed_error!("Missing value of {:?}", kind)),
        };

        match (kind, value) {
            (AttributeKind::Flags, _) => self.is_flags = true,
            (AttributeKind::Obsolete, _) => self.is_obsolete = true,
            (AttributeKind::NativeTypedef, _) => self.is_typedef = true,
            (AttributeKind::FlexibleArray, _) => self.is_flexible_array = true,
            (AttributeKind::Documentation, Some(value)) => {
                self.documentation_url = value.first_string()?;
            }
            (AttributeKind::SupportedArchitecture, Some(value)) => {
                let Some(bits) = value.first()?.as_i64() else {
                    return Err(malformed_error!("Invalid architecture {:?}", value.fixed_args));
                };
                // Only the low bits carry architectures
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let bits = bits as u32;
                self.supported_architecture = Architecture::from_bits_truncate(bits);
            }
            (AttributeKind::Guid, Some(value)) => self.guid = Some(guid_from_args(&value.fixed_args)?),
            (AttributeKind::Constant, Some(value)) => {
                self.constant_value = Some(Literal::String(value.first_string()?));
            }
            (AttributeKind::NativeEncoding, Some(value)) => {
                self.is_ansi = value.first_string()?.as_deref() == Some("ansi");
            }
            (AttributeKind::StructSizeField, Some(value)) => {
                self.struct_size_field = value.first_string()?;
            }
            (_, None) => {}
        }

        Ok(())
    }
}

/// Build a GUID from the `(u32, u16, u16, u8 x 8)` arguments of a `Guid` attribute.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn guid_from_args(args: &[Literal]) -> Result<Guid> {
    let mut values = [0u64; 11];
    if args.len() != values.len() {
        return Err(malformed_error!("Guid attribute with {} arguments", args.len()));
    }

    for (slot, arg) in values.iter_mut().zip(args) {
        let Some(value) = arg.as_i64() else {
            return Err(malformed_error!("Invalid Guid argument {:?}", arg));
        };
        *slot = value as u64;
    }

    let byte = |index: usize| values[index] as u8;
    Ok(Guid::new(
        (values[0] as u32).to_le_bytes(),
        (values[1] as u16).to_le_bytes(),
        (values[2] as u16).to_le_bytes(),
        byte(3),
        byte(4),
        [byte(5), byte(6), byte(7), byte(8), byte(9), byte(10)],
    ))
}
