//! Loader configuration.
//!
//! The native metadata contains a handful of conventions and known inconsistencies that the
//! loader has to special-case. They are collected here instead of being scattered through the
//! builder, so they stay documented and can be adjusted for other inputs.

use crate::metadata::typesystem::{Architecture, QualifiedName};

/// Structs whose flexible-array attribute contradicts a fixed-size interpretation elsewhere in
/// the metadata. They keep a fixed size.
pub const FLEXIBLE_ARRAY_EXEMPTIONS: [&str; 5] = [
    "IMAGEHLP_SYMBOL64_PACKAGE",
    "IMAGEHLP_SYMBOLW64_PACKAGE",
    "SYMBOL_INFO_PACKAGE",
    "SYMBOL_INFO_PACKAGEW",
    "KSSTREAMALLOCATOR_STATUS_EX",
];

/// Struct types whose constants are given as a string through `ConstantAttribute`.
pub const STATIC_INITIALIZER_TYPES: [&str; 6] = [
    "PROPERTYKEY",
    "DEVPROPKEY",
    "SID_IDENTIFIER_AUTHORITY",
    "CONDITION_VARIABLE",
    "SRWLOCK",
    "INIT_ONCE",
];

/// Settings of a metadata load.
///
/// # Examples
///
/// ```rust
/// use winmdscope::{metadata::typesystem::Architecture, LoaderConfig};
///
/// let config = LoaderConfig {
///     architectures: Architecture::X64,
///     ..LoaderConfig::default()
/// };
/// assert!(config.is_flexible_array_exempt("SYMBOL_INFO_PACKAGE"));
/// assert!(!LoaderConfig::without_exemptions().is_flexible_array_exempt("SYMBOL_INFO_PACKAGE"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Architectures to generate for, a non-empty subset of [`Architecture::SUPPORTED`]
    pub architectures: Architecture,
    /// Struct names exempt from flexible-array treatment
    pub flexible_array_exemptions: Vec<String>,
    /// Struct names whose constants take their value from `ConstantAttribute`
    pub static_initializer_types: Vec<String>,
    /// Library name marking an inlined constant instead of an export
    pub inline_library: String,
    /// Error-code enumeration needed by functions supporting last-error capture
    pub last_error_type: QualifiedName,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            architectures: Architecture::SUPPORTED,
            flexible_array_exemptions: FLEXIBLE_ARRAY_EXEMPTIONS
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            static_initializer_types: STATIC_INITIALIZER_TYPES
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            inline_library: "FORCEINLINE".to_string(),
            last_error_type: QualifiedName::new("Windows.Win32.Foundation", "WIN32_ERROR"),
        }
    }
}

impl LoaderConfig {
    /// The default configuration without flexible-array exemptions.
    #[must_use]
    pub fn without_exemptions() -> Self {
        LoaderConfig {
            flexible_array_exemptions: Vec::new(),
            ..LoaderConfig::default()
        }
    }

    /// Returns true if struct `name` keeps a fixed size despite a flexible array member.
    #[must_use]
    pub fn is_flexible_array_exempt(&self, name: &str) -> bool {
        self.flexible_array_exemptions.iter().any(|exempt| exempt == name)
    }

    /// Returns true if constants of struct type `name` are given through `ConstantAttribute`.
    #[must_use]
    pub fn is_static_initializer(&self, name: &str) -> bool {
        self.static_initializer_types.iter().any(|ty| ty == name)
    }

    /// The configured architectures restricted to the supported ones.
    #[must_use]
    pub fn supported_architectures(&self) -> Architecture {
        self.architectures & Architecture::SUPPORTED
    }
}
