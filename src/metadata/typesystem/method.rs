use crate::metadata::typesystem::{Literal, TypeId};

/// A function, delegate signature or COM interface method.
#[derive(Debug, Clone)]
pub struct Method {
    /// Display name, suffixed for architecture-specific functions
    pub name: String,
    /// Declared name
    pub native_name: String,
    /// Owning namespace
    pub namespace: Option<String>,
    /// `MethodDef` row of the method
    pub definition_index: u32,
    /// Return type, `None` for `void`
    pub return_type: Option<TypeId>,
    /// Parameters in order
    pub parameters: Vec<Parameter>,
    /// Native library exporting the function
    pub library: Option<String>,
    /// The function reports errors through the thread's last-error value
    pub supports_last_error: bool,
    /// Value of a macro-like function that is not exported by any library
    pub constant_value: Option<Literal>,
    /// Link to the documentation of the native function
    pub documentation_url: Option<String>,
}

impl Method {
    pub(crate) fn new(name: &str, namespace: Option<&str>, definition_index: u32) -> Method {
        Method {
            name: name.to_string(),
            native_name: name.to_string(),
            namespace: namespace.map(str::to_string),
            definition_index,
            return_type: None,
            parameters: Vec::new(),
            library: None,
            supports_last_error: false,
            constant_value: None,
            documentation_url: None,
        }
    }

    /// False for methods returning `void`.
    #[must_use]
    pub fn has_return_type(&self) -> bool {
        self.return_type.is_some()
    }

    /// The return type followed by all parameter types.
    #[must_use]
    pub fn referenced_types(&self) -> Vec<TypeId> {
        self.return_type
            .into_iter()
            .chain(self.parameters.iter().map(|parameter| parameter.ty))
            .collect()
    }
}

/// A named method parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: TypeId,
}
