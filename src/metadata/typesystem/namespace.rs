use std::{collections::BTreeMap, fmt};

use crate::{
    metadata::typesystem::{ConstantId, ConstantValue, MethodId, TypeId},
    Result,
};

/// A namespace and the entities registered in it, keyed by display name.
///
/// Registration never overwrites: adding a second method or constant under a taken name is an
/// error, and a second type under a taken name is rejected so the caller can decide.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    /// Namespace name, empty for the unnamed namespace of the primitives
    pub name: String,
    types: BTreeMap<String, TypeId>,
    methods: BTreeMap<String, MethodId>,
    constants: BTreeMap<String, ConstantId>,
}

impl Namespace {
    pub(crate) fn new(name: &str) -> Namespace {
        Namespace {
            name: name.to_string(),
            ..Namespace::default()
        }
    }

    /// Types by display name.
    #[must_use]
    pub fn types(&self) -> &BTreeMap<String, TypeId> {
        &self.types
    }

    /// Functions by display name.
    #[must_use]
    pub fn methods(&self) -> &BTreeMap<String, MethodId> {
        &self.methods
    }

    /// Constants by name.
    #[must_use]
    pub fn constants(&self) -> &BTreeMap<String, ConstantId> {
        &self.constants
    }

    /// Type by display name.
    #[must_use]
    pub fn type_by_name(&self, name: &str) -> Option<TypeId> {
        self.types.get(name).copied()
    }

    /// Register `id` under `name`. Returns false, leaving the registration untouched, if the
    /// name is taken.
    pub(crate) fn add_type(&mut self, name: &str, id: TypeId) -> bool {
        if self.types.contains_key(name) {
            return false;
        }

        self.types.insert(name.to_string(), id);
        true
    }

    /// Remove the registration of `name` if it refers to `id`.
    pub(crate) fn remove_type(&mut self, name: &str, id: TypeId) -> bool {
        if self.types.get(name) == Some(&id) {
            self.types.remove(name);
            return true;
        }

        false
    }

    pub(crate) fn add_method(&mut self, name: &str, id: MethodId) -> Result<()> {
        if self.methods.contains_key(name) {
            return Err(malformed_error!(
                "Duplicate function {} in namespace {}",
                name,
                self.name
            ));
        }

        self.methods.insert(name.to_string(), id);
        Ok(())
    }

    pub(crate) fn add_constant(&mut self, name: &str, id: ConstantId) -> Result<()> {
        if self.constants.contains_key(name) {
            return Err(malformed_error!(
                "Duplicate constant {} in namespace {}",
                name,
                self.name
            ));
        }

        self.constants.insert(name.to_string(), id);
        Ok(())
    }
}

/// A namespace constant.
#[derive(Debug, Clone)]
pub struct Constant {
    /// Constant name
    pub name: String,
    /// Owning namespace
    pub namespace: String,
    /// Type of the constant
    pub ty: TypeId,
    /// Value of the constant
    pub value: ConstantValue,
    /// String constant declared for the ANSI character set
    pub is_ansi: bool,
}

/// Namespace and name of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Namespace
    pub namespace: String,
    /// Name
    pub name: String,
}

impl QualifiedName {
    /// Create a new `QualifiedName`.
    #[must_use]
    pub fn new(namespace: &str, name: &str) -> QualifiedName {
        QualifiedName {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}
