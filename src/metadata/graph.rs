//! The loaded type graph.
//!
//! [`Metadata`] owns every entity of a load in three arenas (types, methods, constants) and the
//! indexes over them: namespaces by name, types and functions by definition index, primitives
//! by kind and pointers by referenced type. Entities are never freed; removing a type only
//! drops it from the indexes, so ids handed out earlier stay valid.
//!
//! A graph is built once by the loader and is read-only afterwards. It is `Send + Sync` and can
//! be shared between threads evaluating independent scopes.
//!
//! # Examples
//!
//! ```rust,no_run
//! use winmdscope::Metadata;
//! use std::{collections::BTreeSet, path::Path};
//!
//! let metadata = Metadata::load(Path::new("Windows.Win32.winmd"))?;
//!
//! let names: BTreeSet<String> = ["RECT".to_string()].into();
//! for id in metadata.find_structs(&names) {
//!     let ty = metadata.get_type(id);
//!     let data = ty.as_struct().unwrap();
//!     println!("{} is {} bytes", ty.name, data.size);
//! }
//! # Ok::<(), winmdscope::Error>(())
//! ```

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::Path,
};

use rayon::prelude::*;
use strum::IntoEnumIterator;

use crate::{
    file::File,
    metadata::{
        builder::MetadataBuilder,
        config::LoaderConfig,
        typesystem::{
            ArrayType, Constant, ConstantId, Member, Method, MethodId, Namespace, PrimitiveKind,
            Struct, Type, TypeId, TypeKind,
        },
        winmd::WinmdFile,
    },
    Error, Result,
};

/// Definition index of the synthesized `System.Guid` struct.
pub const GUID_DEFINITION_INDEX: u32 = 9_999_999;

/// A fully built, cross-referenced type graph.
pub struct Metadata {
    version: String,
    config: LoaderConfig,
    types: Vec<Type>,
    methods: Vec<Method>,
    constants: Vec<Constant>,
    namespaces: BTreeMap<String, Namespace>,
    unnamed: Namespace,
    primitives: BTreeMap<PrimitiveKind, TypeId>,
    pointers: HashMap<TypeId, TypeId>,
    types_by_definition_index: BTreeMap<u32, TypeId>,
    methods_by_definition_index: BTreeMap<u32, MethodId>,
    guid_type: TypeId,
}

impl Metadata {
    /// An empty graph holding only the primitives and `System.Guid`.
    pub(crate) fn new(version: &str, config: LoaderConfig) -> Metadata {
        let mut metadata = Metadata {
            version: version.to_string(),
            config,
            types: Vec::new(),
            methods: Vec::new(),
            constants: Vec::new(),
            namespaces: BTreeMap::new(),
            unnamed: Namespace::new(""),
            primitives: BTreeMap::new(),
            pointers: HashMap::new(),
            types_by_definition_index: BTreeMap::new(),
            methods_by_definition_index: BTreeMap::new(),
            guid_type: TypeId(0),
        };

        for kind in PrimitiveKind::iter() {
            let name = kind.to_string();
            let id = metadata.alloc_type(Type::new(&name, None, 0, TypeKind::Primitive(kind)));
            metadata.unnamed.add_type(&name, id);
            metadata.primitives.insert(kind, id);
        }

        metadata.guid_type = metadata.create_system_guid();
        metadata
    }

    fn create_system_guid(&mut self) -> TypeId {
        let member = |name: &str, ty: TypeId| Member {
            name: name.to_string(),
            field_index: 0,
            ty,
            value: None,
            offset: 0,
            padding_after: 0,
        };

        let byte = self.primitive(PrimitiveKind::Byte);
        let data4 = self.make_array(byte, 8);
        let members = vec![
            member("Data1", self.primitive(PrimitiveKind::UInt32)),
            member("Data2", self.primitive(PrimitiveKind::UInt16)),
            member("Data3", self.primitive(PrimitiveKind::UInt16)),
            member("Data4", data4),
        ];

        let mut guid = Type::new(
            "GUID",
            Some("System"),
            GUID_DEFINITION_INDEX,
            TypeKind::Struct(Struct {
                members,
                fields_built: true,
                ..Struct::default()
            }),
        );
        guid.name = "Guid".to_string();

        let id = self.alloc_type(guid);
        self.types_by_definition_index.insert(GUID_DEFINITION_INDEX, id);
        self.namespace_mut("System").add_type("Guid", id);
        id
    }

    /// Loads a metadata file from disk with the default configuration.
    ///
    /// The file is memory-mapped, its metadata located and decoded, and the complete graph
    /// built: types, functions, constants, architecture variants and struct layouts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileError`] if the file cannot be opened or mapped, and
    /// [`Error::Malformed`] or [`Error::OutOfBounds`] if its contents are not valid metadata.
    pub fn load(path: &Path) -> Result<Metadata> {
        Self::load_with_config(path, LoaderConfig::default())
    }

    /// Loads a metadata file from disk with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`Metadata::load`]. Additionally returns [`Error::NotSupported`] if `config` selects
    /// no supported architecture.
    pub fn load_with_config(path: &Path, config: LoaderConfig) -> Result<Metadata> {
        let file = File::from_file(path)?;
        Self::from_file(&file, config)
    }

    /// Builds a graph from an in-memory copy of a metadata file.
    ///
    /// # Errors
    ///
    /// See [`Metadata::load_with_config`].
    pub fn from_bytes(data: &[u8], config: LoaderConfig) -> Result<Metadata> {
        let file = File::from_mem(data.to_vec())?;
        Self::from_file(&file, config)
    }

    fn from_file(file: &File, config: LoaderConfig) -> Result<Metadata> {
        if config.supported_architectures().is_empty() {
            return Err(Error::NotSupported(
                "no supported architecture configured".to_string(),
            ));
        }

        let winmd = WinmdFile::read(file.metadata())?;
        MetadataBuilder::new(&winmd, config).build()
    }

    /// Version string of the metadata root the graph was built from.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The configuration the graph was built with.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The type with id `id`.
    #[must_use]
    pub fn get_type(&self, id: TypeId) -> &Type {
        &self.types[id.0]
    }

    /// The method with id `id`.
    #[must_use]
    pub fn get_method(&self, id: MethodId) -> &Method {
        &self.methods[id.0]
    }

    /// The constant with id `id`.
    #[must_use]
    pub fn get_constant(&self, id: ConstantId) -> &Constant {
        &self.constants[id.0]
    }

    /// All registered types, nested types included, by definition index.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.types_by_definition_index
            .values()
            .map(|id| (*id, self.get_type(*id)))
    }

    /// All functions, by definition index.
    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &Method)> {
        self.methods_by_definition_index
            .values()
            .map(|id| (*id, self.get_method(*id)))
    }

    /// All constants, by namespace and name.
    pub fn constants(&self) -> impl Iterator<Item = (ConstantId, &Constant)> {
        self.namespaces
            .values()
            .flat_map(|namespace| namespace.constants().values())
            .map(|id| (*id, self.get_constant(*id)))
    }

    /// All named namespaces, by name.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    /// The namespace `name`.
    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    /// The unnamed namespace holding the primitives.
    #[must_use]
    pub fn unnamed_namespace(&self) -> &Namespace {
        &self.unnamed
    }

    /// Type `name` of namespace `namespace`.
    #[must_use]
    pub fn type_by_name(&self, namespace: &str, name: &str) -> Option<TypeId> {
        self.namespaces.get(namespace)?.type_by_name(name)
    }

    /// The type created from `TypeDef` row `index`, or a variant duplicate's synthetic index.
    #[must_use]
    pub fn type_by_definition_index(&self, index: u32) -> Option<TypeId> {
        self.types_by_definition_index.get(&index).copied()
    }

    /// The function created from `MethodDef` row `index`.
    #[must_use]
    pub fn method_by_definition_index(&self, index: u32) -> Option<MethodId> {
        self.methods_by_definition_index.get(&index).copied()
    }

    /// The singleton of primitive `kind`.
    #[must_use]
    pub fn primitive(&self, kind: PrimitiveKind) -> TypeId {
        self.primitives[&kind]
    }

    /// The synthesized `System.Guid` struct.
    #[must_use]
    pub fn guid_type(&self) -> TypeId {
        self.guid_type
    }

    /// The interned pointer to `target`, if one was created.
    #[must_use]
    pub fn pointer_to(&self, target: TypeId) -> Option<TypeId> {
        self.pointers.get(&target).copied()
    }

    /// Nested type `name` of struct `parent`.
    #[must_use]
    pub fn nested_type(&self, parent: TypeId, name: &str) -> Option<TypeId> {
        self.get_type(parent)
            .as_struct()?
            .nested_types
            .get(name)
            .copied()
    }

    /// The types `id` directly depends on: member and nested types of structs, the base of
    /// enumerations, signature types of delegates and interfaces, pointer targets and array
    /// elements. Primitives and aliases reference nothing.
    #[must_use]
    pub fn referenced_types(&self, id: TypeId) -> Vec<TypeId> {
        match &self.get_type(id).kind {
            TypeKind::Primitive(_) | TypeKind::Alias(_) => Vec::new(),
            TypeKind::Struct(data) => data
                .members
                .iter()
                .map(|member| member.ty)
                .chain(data.nested_types.values().copied())
                .collect(),
            TypeKind::Enum(data) => data.base.into_iter().collect(),
            TypeKind::Delegate(data) => data
                .signature
                .map(|method| self.get_method(method).referenced_types())
                .unwrap_or_default(),
            TypeKind::ComInterface(data) => data
                .methods
                .iter()
                .flat_map(|method| self.get_method(*method).referenced_types())
                .chain(data.implemented)
                .collect(),
            TypeKind::Pointer(target) => vec![*target],
            TypeKind::Array(data) => vec![data.item],
        }
    }

    /// Structs and unions with one of the native `names`.
    #[must_use]
    pub fn find_structs(&self, names: &BTreeSet<String>) -> Vec<TypeId> {
        self.find_types(|ty| matches!(ty.kind, TypeKind::Struct(_)) && names.contains(&ty.native_name))
    }

    /// Enumerations with one of the native `names`.
    #[must_use]
    pub fn find_enums(&self, names: &BTreeSet<String>) -> Vec<TypeId> {
        self.find_types(|ty| matches!(ty.kind, TypeKind::Enum(_)) && names.contains(&ty.native_name))
    }

    /// Delegates with one of the native `names`.
    #[must_use]
    pub fn find_delegates(&self, names: &BTreeSet<String>) -> Vec<TypeId> {
        self.find_types(|ty| {
            matches!(ty.kind, TypeKind::Delegate(_)) && names.contains(&ty.native_name)
        })
    }

    /// COM interfaces with one of the native `names`.
    #[must_use]
    pub fn find_com_interfaces(&self, names: &BTreeSet<String>) -> Vec<TypeId> {
        self.find_types(|ty| {
            matches!(ty.kind, TypeKind::ComInterface(_)) && names.contains(&ty.native_name)
        })
    }

    /// Enumerations declaring a member called `name`.
    #[must_use]
    pub fn find_enum_with_member(&self, name: &str) -> Vec<TypeId> {
        self.find_types(|ty| ty.as_enum().is_some_and(|data| data.member(name).is_some()))
    }

    /// Functions with one of the native `names`.
    #[must_use]
    pub fn find_functions(&self, names: &BTreeSet<String>) -> Vec<MethodId> {
        let ids: Vec<MethodId> = self.methods_by_definition_index.values().copied().collect();
        ids.into_par_iter()
            .filter(|id| names.contains(&self.get_method(*id).native_name))
            .collect()
    }

    /// Constants with one of the `names`.
    #[must_use]
    pub fn find_constants(&self, names: &BTreeSet<String>) -> Vec<ConstantId> {
        let ids: Vec<ConstantId> = self.constants().map(|(id, _)| id).collect();
        ids.into_par_iter()
            .filter(|id| names.contains(&self.get_constant(*id).name))
            .collect()
    }

    fn find_types<F>(&self, predicate: F) -> Vec<TypeId>
    where
        F: Fn(&Type) -> bool + Sync,
    {
        let ids: Vec<TypeId> = self.types_by_definition_index.values().copied().collect();
        ids.into_par_iter()
            .filter(|id| predicate(self.get_type(*id)))
            .collect()
    }

    pub(crate) fn get_type_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.0]
    }

    pub(crate) fn get_method_mut(&mut self, id: MethodId) -> &mut Method {
        &mut self.methods[id.0]
    }

    pub(crate) fn namespace_mut(&mut self, name: &str) -> &mut Namespace {
        self.namespaces
            .entry(name.to_string())
            .or_insert_with(|| Namespace::new(name))
    }

    /// Place `ty` into the arena without registering it anywhere.
    pub(crate) fn alloc_type(&mut self, ty: Type) -> TypeId {
        self.types.push(ty);
        TypeId(self.types.len() - 1)
    }

    /// Place `method` into the arena without registering it anywhere.
    pub(crate) fn alloc_method(&mut self, method: Method) -> MethodId {
        self.methods.push(method);
        MethodId(self.methods.len() - 1)
    }

    /// Register an allocated type by definition index and under its display name, in the
    /// enclosing struct for nested types or in its namespace otherwise.
    ///
    /// Architecture variants share a display name until they are renamed. With
    /// `name_is_unique` unset, a taken name leaves the existing registration in place.
    pub(crate) fn add_type(&mut self, id: TypeId, name_is_unique: bool) -> Result<()> {
        let ty = self.get_type(id);
        let index = ty.definition_index;
        let name = ty.name.clone();
        let namespace = ty.namespace.clone();
        let enclosing = ty.as_struct().and_then(|data| data.enclosing);

        if self.types_by_definition_index.insert(index, id).is_some() {
            return Err(malformed_error!("Duplicate type definition index {}", index));
        }

        let added = match (enclosing, namespace) {
            (Some(parent), _) => match self.get_type_mut(parent).as_struct_mut() {
                Some(data) if !data.nested_types.contains_key(&name) => {
                    data.nested_types.insert(name.clone(), id);
                    true
                }
                Some(_) => false,
                None => return Err(malformed_error!("Enclosing type of {} is no struct", name)),
            },
            (None, Some(namespace)) => self.namespace_mut(&namespace).add_type(&name, id),
            (None, None) => return Err(malformed_error!("Type {} has no namespace", name)),
        };

        if !added {
            if name_is_unique {
                return Err(malformed_error!("Duplicate type name {}", name));
            }
            log::trace!("Type {} ({}) shares its name with a variant", name, index);
        }

        Ok(())
    }

    /// Drop a type from the definition index and its namespace or enclosing struct.
    pub(crate) fn remove_type(&mut self, id: TypeId) {
        let ty = self.get_type(id);
        let index = ty.definition_index;
        let name = ty.name.clone();
        let namespace = ty.namespace.clone();
        let enclosing = ty.as_struct().and_then(|data| data.enclosing);

        if self.types_by_definition_index.get(&index) == Some(&id) {
            self.types_by_definition_index.remove(&index);
        }

        match (enclosing, namespace) {
            (Some(parent), _) => {
                if let Some(data) = self.get_type_mut(parent).as_struct_mut() {
                    if data.nested_types.get(&name) == Some(&id) {
                        data.nested_types.remove(&name);
                    }
                }
            }
            (None, Some(namespace)) => {
                if let Some(namespace) = self.namespaces.get_mut(&namespace) {
                    namespace.remove_type(&name, id);
                }
            }
            (None, None) => {}
        }
    }

    /// Drop a type from the definition index only, leaving its name registration untouched.
    pub(crate) fn forget_definition(&mut self, id: TypeId) {
        let index = self.get_type(id).definition_index;
        if self.types_by_definition_index.get(&index) == Some(&id) {
            self.types_by_definition_index.remove(&index);
        }
    }

    /// Change the display name of a registered namespace type, keeping its native name.
    pub(crate) fn rename_type(&mut self, id: TypeId, name: &str) -> Result<()> {
        self.remove_type(id);
        self.get_type_mut(id).name = name.to_string();
        if let Some(pointer) = self.pointer_to(id) {
            self.get_type_mut(pointer).name = format!("{name}*");
        }
        self.add_type(id, true)
    }

    /// Register a function by definition index and in its namespace.
    pub(crate) fn add_method(&mut self, id: MethodId) -> Result<()> {
        let method = self.get_method(id);
        let index = method.definition_index;
        let name = method.name.clone();
        let Some(namespace) = method.namespace.clone() else {
            return Err(malformed_error!("Function {} has no namespace", name));
        };

        if self.methods_by_definition_index.insert(index, id).is_some() {
            return Err(malformed_error!("Duplicate method definition index {}", index));
        }

        self.namespace_mut(&namespace).add_method(&name, id)
    }

    /// Place `constant` into the arena and register it in its namespace.
    pub(crate) fn add_constant(&mut self, constant: Constant) -> Result<ConstantId> {
        let name = constant.name.clone();
        let namespace = constant.namespace.clone();

        self.constants.push(constant);
        let id = ConstantId(self.constants.len() - 1);
        self.namespace_mut(&namespace).add_constant(&name, id)?;
        Ok(id)
    }

    /// The unique pointer to `target`, created on first request.
    pub(crate) fn make_pointer_for(&mut self, target: TypeId) -> TypeId {
        if let Some(pointer) = self.pointer_to(target) {
            return pointer;
        }

        let name = format!("{}*", self.get_type(target).name);
        let pointer = self.alloc_type(Type::new(&name, None, 0, TypeKind::Pointer(target)));
        self.pointers.insert(target, pointer);
        pointer
    }

    /// A new array of `length` elements of type `item`. Arrays are not shared, each use site
    /// owns its own so flexibility can be marked per site.
    pub(crate) fn make_array(&mut self, item: TypeId, length: u32) -> TypeId {
        let name = format!("{}[]", self.get_type(item).name);
        self.alloc_type(Type::new(
            &name,
            None,
            0,
            TypeKind::Array(ArrayType {
                item,
                length,
                flexible: false,
            }),
        ))
    }
}
