//! Builds the type graph from the decoded tables.
//!
//! The builder runs in phases, each one relying on the previous ones:
//!
//! 1. every `TypeDef` row (except the `<Module>` pseudo type) becomes a type without members;
//!    `Apis` pseudo types are only remembered
//! 2. the methods and literal fields of the `Apis` types become functions and constants
//! 3. members of structs, enumerations and aliases are decoded
//! 4. empty structs carrying only a GUID are turned into GUID constants
//! 5. function parameters, return types and libraries are decoded
//! 6. delegate signatures and COM interface methods are decoded
//! 7. architecture variants are split
//! 8. struct layout is computed
//!
//! Type references in signatures are resolved against the graph built so far, which is why
//! members are only decoded once all types exist.

use std::collections::BTreeMap;

use crate::{
    metadata::{
        config::LoaderConfig,
        customattributes::{is_ignored, parse_custom_attribute_data, AttributeData, AttributeKind},
        graph::Metadata,
        layout::StructLayouter,
        signatures::{parse_constant, parse_field_signature, parse_method_signature, TypeSignature},
        tables::{
            CodedIndex, FieldAttributes, PInvokeAttributes, TableId, TypeAttributes, TypeDefRaw,
        },
        typesystem::{
            ComInterface, Constant, ConstantValue, Delegate, EnumType, Literal, Member, Method,
            MethodId, Parameter, PrimitiveKind, Struct, Type, TypeAlias, TypeId, TypeKind,
        },
        variants::{Support, VariantTransformer},
        winmd::WinmdFile,
    },
    Result,
};

/// Pseudo type holding the functions and constants of a namespace
const APIS: &str = "Apis";
/// Namespace of the metadata attribute types
const METADATA_NAMESPACE: &str = "Windows.Win32.Foundation.Metadata";
/// Enumeration decoded eagerly, `SupportedArchitecture` arguments are typed with it
const ARCHITECTURE_ENUM: &str = "Architecture";

/// The kind a `TypeDef` row is classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Struct,
    Enum,
    Delegate,
    ComInterface,
    Alias,
}

/// Builds a [`Metadata`] graph from a [`WinmdFile`].
pub(crate) struct MetadataBuilder<'a> {
    file: &'a WinmdFile<'a>,
    metadata: Metadata,
    variants: VariantTransformer,
    api_types: BTreeMap<u32, String>,
    void_pointer: TypeId,
}

impl<'a> MetadataBuilder<'a> {
    pub(crate) fn new(file: &'a WinmdFile<'a>, config: LoaderConfig) -> MetadataBuilder<'a> {
        let variants = VariantTransformer::new(config.supported_architectures());
        let mut metadata = Metadata::new(file.version(), config);
        let void = metadata.primitive(PrimitiveKind::Void);
        let void_pointer = metadata.make_pointer_for(void);

        MetadataBuilder {
            file,
            metadata,
            variants,
            api_types: BTreeMap::new(),
            void_pointer,
        }
    }

    /// Run all phases and return the finished graph.
    pub(crate) fn build(mut self) -> Result<Metadata> {
        self.build_types()?;
        self.build_functions_and_constants()?;
        self.build_type_fields()?;
        self.convert_guid_constants()?;
        self.build_function_parameters()?;
        self.build_delegates_and_interfaces()?;
        self.variants.split(&mut self.metadata)?;
        StructLayouter::new(&mut self.metadata).layout_all()?;

        log::debug!(
            "Built {} types and {} functions from metadata {}",
            self.metadata.types().count(),
            self.metadata.methods().count(),
            self.metadata.version()
        );
        Ok(self.metadata)
    }

    fn build_types(&mut self) -> Result<()> {
        // row 1 is the <Module> pseudo type
        for rid in 2..=self.file.typedef_count() {
            self.build_type(rid)?;
        }

        Ok(())
    }

    fn build_type(&mut self, rid: u32) -> Result<()> {
        let typedef = self.file.typedef(rid)?;
        let name = self.file.string(typedef.type_name)?;
        let namespace = self.file.string(typedef.type_namespace)?;

        let nested = match typedef.flags & TypeAttributes::VISIBILITY_MASK {
            TypeAttributes::PUBLIC => false,
            TypeAttributes::NESTED_PUBLIC => true,
            visibility => {
                return Err(malformed_error!(
                    "Type {} has visibility {:#x}",
                    name,
                    visibility
                ))
            }
        };

        if name == APIS && !nested {
            self.api_types.insert(rid, namespace.to_string());
            return Ok(());
        }

        let Some(category) = self.category(&typedef, name)? else {
            log::trace!("Skipping attribute type {}.{}", namespace, name);
            return Ok(());
        };
        let attributes = self.attributes(CodedIndex::new(TableId::TypeDef, rid))?;
        let category = if attributes.is_typedef {
            Category::Alias
        } else {
            category
        };

        let enclosing = if nested {
            let Some(parent_rid) = self.file.enclosing_type(rid)? else {
                return Err(malformed_error!("Nested type {} has no enclosing type", name));
            };
            if self.variants.is_unsupported(parent_rid) {
                self.variants.mark_unsupported(rid);
                return Ok(());
            }

            let parent = self
                .metadata
                .type_by_definition_index(parent_rid)
                .filter(|parent| self.metadata.get_type(*parent).as_struct().is_some());
            match parent {
                Some(parent) if category == Category::Struct => Some(parent),
                _ => {
                    return Err(malformed_error!(
                        "Nested type {} is no struct inside a struct",
                        name
                    ))
                }
            }
        } else {
            None
        };

        let layout = typedef.flags & TypeAttributes::LAYOUT_MASK;
        let class_layout = if layout == TypeAttributes::AUTO_LAYOUT {
            None
        } else {
            self.file.class_layout(rid)?
        };

        let kind = match category {
            Category::Struct => TypeKind::Struct(Struct {
                is_union: layout == TypeAttributes::EXPLICIT_LAYOUT,
                packing_size: class_layout.as_ref().map_or(0, |row| u32::from(row.packing_size)),
                size: class_layout.as_ref().map_or(0, |row| row.class_size),
                enclosing,
                struct_size_member: attributes.struct_size_field.clone(),
                guid: attributes.guid,
                ..Struct::default()
            }),
            Category::Enum => TypeKind::Enum(EnumType {
                is_flags: attributes.is_flags,
                ..EnumType::default()
            }),
            Category::Delegate => TypeKind::Delegate(Delegate::default()),
            Category::ComInterface => TypeKind::ComInterface(ComInterface {
                iid: attributes.guid,
                ..ComInterface::default()
            }),
            Category::Alias => TypeKind::Alias(TypeAlias::default()),
        };

        let mut ty = Type::new(name, (!nested).then_some(namespace), rid, kind);
        ty.documentation_url = attributes.documentation_url;
        let id = self.metadata.alloc_type(ty);

        let support = self.variants.preprocess_type(
            &mut self.metadata,
            id,
            attributes.supported_architecture,
        )?;
        if support == Support::Unsupported {
            return Ok(());
        }
        self.metadata.add_type(id, support == Support::Neutral)?;

        if namespace == METADATA_NAMESPACE && name == ARCHITECTURE_ENUM {
            self.build_fields(id)?;
        }

        Ok(())
    }

    /// Classify a type by its base type. `None` for attribute types, which are skipped.
    fn category(&self, typedef: &TypeDefRaw, name: &str) -> Result<Option<Category>> {
        if typedef.extends.row == 0 {
            let interface =
                TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT;
            if typedef.flags == interface {
                return Ok(Some(Category::ComInterface));
            }
            return Err(malformed_error!(
                "Type {} without base type has flags {:#x}",
                name,
                typedef.flags
            ));
        }

        if typedef.extends.tag != TableId::TypeRef {
            return Err(malformed_error!("Base type of {} is no type reference", name));
        }
        let base = self.file.typeref(typedef.extends.row)?;
        let scope = base.resolution_scope;
        if scope.tag != TableId::AssemblyRef || scope.row != 1 {
            return Err(malformed_error!("Base type of {} is not a system type", name));
        }

        let base_namespace = self.file.string(base.type_namespace)?;
        let base_name = self.file.string(base.type_name)?;
        let category = match (base_namespace, base_name) {
            ("System", "Enum") => Category::Enum,
            ("System", "ValueType") => Category::Struct,
            ("System", "MulticastDelegate") => Category::Delegate,
            ("System", "Attribute") => return Ok(None),
            _ => {
                return Err(malformed_error!(
                    "Type {} has unknown base type {}.{}",
                    name,
                    base_namespace,
                    base_name
                ))
            }
        };

        Ok(Some(category))
    }

    /// Collect the interpreted custom attributes of `parent`.
    fn attributes(&mut self, parent: CodedIndex) -> Result<AttributeData> {
        let mut data = AttributeData::default();

        for attribute in self.file.custom_attributes(parent)? {
            if attribute.constructor.tag != TableId::MemberRef {
                return Err(malformed_error!(
                    "Custom attribute constructor in table {:?}",
                    attribute.constructor.tag
                ));
            }
            let constructor = self.file.memberref(attribute.constructor.row)?;
            if constructor.class.tag != TableId::TypeRef {
                return Err(malformed_error!(
                    "Custom attribute constructor parent in table {:?}",
                    constructor.class.tag
                ));
            }

            let attribute_type = self.file.typeref(constructor.class.row)?;
            let namespace = self.file.string(attribute_type.type_namespace)?;
            let name = self.file.string(attribute_type.type_name)?;
            if is_ignored(namespace, name) {
                continue;
            }
            let Some(kind) = AttributeKind::from_name(namespace, name) else {
                return Err(malformed_error!("Unknown custom attribute {}.{}", namespace, name));
            };

            let value = if kind.has_value() {
                let signature = parse_method_signature(self.file.blob(constructor.signature)?)?;
                let params = signature
                    .params
                    .iter()
                    .map(|param| self.argument_kind(param))
                    .collect::<Result<Vec<PrimitiveKind>>>()?;
                Some(parse_custom_attribute_data(
                    self.file.blob(attribute.value)?,
                    &params,
                )?)
            } else {
                None
            };

            data.apply(kind, value.as_ref())?;
        }

        Ok(data)
    }

    /// The primitive an attribute argument is encoded as, enumerations by their base type.
    fn argument_kind(&mut self, signature: &TypeSignature) -> Result<PrimitiveKind> {
        match signature {
            TypeSignature::Primitive(kind) => Ok(*kind),
            TypeSignature::ValueType(_) => {
                let id = self.resolve(signature, None)?;
                let ty = self.metadata.get_type(id);
                ty.as_enum()
                    .and_then(|data| data.base)
                    .and_then(|base| self.metadata.get_type(base).as_primitive())
                    .ok_or_else(|| {
                        malformed_error!("Attribute argument of type {} has no base type", ty.name)
                    })
            }
            other => Err(malformed_error!("Unsupported attribute argument {:?}", other)),
        }
    }

    /// Resolve a decoded signature type into a graph type. `parent` is the struct whose members
    /// are decoded, nested type references are looked up from there outwards.
    fn resolve(&mut self, signature: &TypeSignature, parent: Option<TypeId>) -> Result<TypeId> {
        match signature {
            TypeSignature::Primitive(kind) => Ok(self.metadata.primitive(*kind)),
            TypeSignature::Ptr(target) => {
                let target = self.resolve(target, parent)?;
                Ok(self.metadata.make_pointer_for(target))
            }
            TypeSignature::ValueType(index) => self.resolve_reference(*index, parent, false),
            TypeSignature::Class(index) => self.resolve_reference(*index, parent, true),
            TypeSignature::Array(array) => {
                let item = self.resolve(&array.base, parent)?;
                Ok(self.metadata.make_array(item, array.size))
            }
        }
    }

    fn resolve_reference(
        &self,
        index: CodedIndex,
        parent: Option<TypeId>,
        is_class: bool,
    ) -> Result<TypeId> {
        match index.tag {
            TableId::TypeDef => self
                .metadata
                .type_by_definition_index(index.row)
                .ok_or_else(|| malformed_error!("Reference to unknown type definition {}", index.row)),
            TableId::TypeRef => self.resolve_type_ref(index.row, parent, is_class),
            other => Err(crate::Error::NotSupported(format!(
                "type reference into table {other:?}"
            ))),
        }
    }

    fn resolve_type_ref(&self, rid: u32, parent: Option<TypeId>, is_class: bool) -> Result<TypeId> {
        let type_ref = self.file.typeref(rid)?;
        let namespace = self.file.string(type_ref.type_namespace)?;
        let name = self.file.string(type_ref.type_name)?;

        match type_ref.resolution_scope.tag {
            TableId::TypeRef => {
                let mut current = parent;
                while let Some(id) = current {
                    if let Some(nested) = self.metadata.nested_type(id, name) {
                        return Ok(nested);
                    }
                    current = self.metadata.get_type(id).as_struct().and_then(|data| data.enclosing);
                }
                Err(malformed_error!("Unknown nested type {}", name))
            }
            TableId::Module => self
                .metadata
                .type_by_name(namespace, name)
                .ok_or_else(|| malformed_error!("Unknown type {}.{}", namespace, name)),
            TableId::AssemblyRef => {
                if namespace == "System" && name == "Guid" {
                    Ok(self.metadata.guid_type())
                } else if is_class {
                    Ok(self.void_pointer)
                } else {
                    Err(malformed_error!(
                        "External value type {}.{} cannot be represented",
                        namespace,
                        name
                    ))
                }
            }
            other => Err(crate::Error::NotSupported(format!(
                "resolution scope in table {other:?}"
            ))),
        }
    }

    /// Decode the fields of `TypeDef` row `rid`. Literal fields carry their constant value.
    fn fields(&mut self, rid: u32, parent: Option<TypeId>) -> Result<Vec<Member>> {
        let mut members = Vec::new();

        for field in self.file.fields(rid)? {
            let name = self.file.string(field.name)?;
            let signature = parse_field_signature(self.file.blob(field.signature)?)?;
            let ty = self.resolve(&signature.base, parent)?;

            let mut value = None;
            if field.flags == FieldAttributes::CONSTANT {
                let constant = self.file.constant(field.rid)?;
                value = Some(parse_constant(constant.base, self.file.blob(constant.value)?)?);
            } else if matches!(self.metadata.get_type(ty).kind, TypeKind::Array(_)) {
                let attributes = self.attributes(CodedIndex::new(TableId::Field, field.rid))?;
                if attributes.is_flexible_array && !self.is_fixed_overlay(name, parent) {
                    if let TypeKind::Array(array) = &mut self.metadata.get_type_mut(ty).kind {
                        array.flexible = true;
                    }
                }
            }

            members.push(Member {
                name: name.to_string(),
                field_index: field.rid,
                ty,
                value,
                offset: 0,
                padding_after: 0,
            });
        }

        Ok(members)
    }

    /// `CachePaths` of the cache configuration structs overlays a fixed buffer.
    fn is_fixed_overlay(&self, name: &str, parent: Option<TypeId>) -> bool {
        if name != "CachePaths" {
            return false;
        }

        parent
            .and_then(|parent| self.metadata.get_type(parent).as_struct()?.enclosing)
            .is_some_and(|enclosing| {
                self.metadata
                    .get_type(enclosing)
                    .name
                    .starts_with("INTERNET_CACHE_CONFIG_INFO")
            })
    }

    fn build_type_fields(&mut self) -> Result<()> {
        let types: Vec<TypeId> = self.metadata.types().map(|(id, _)| id).collect();
        for id in types {
            self.build_fields(id)?;
        }

        Ok(())
    }

    fn build_fields(&mut self, id: TypeId) -> Result<()> {
        let ty = self.metadata.get_type(id);
        let rid = ty.definition_index;
        let name = ty.name.clone();

        match &ty.kind {
            TypeKind::Struct(data) if !data.fields_built => {
                let is_union = data.is_union;
                let members = self.fields(rid, Some(id))?;

                if is_union {
                    for member in &members {
                        if let Some(layout) = self.file.field_layout(member.field_index)? {
                            if layout.field_offset != 0 {
                                return Err(malformed_error!(
                                    "Union member {}.{} at offset {}",
                                    name,
                                    member.name,
                                    layout.field_offset
                                ));
                            }
                        }
                    }
                }

                let mut nested = Vec::new();
                if let Some(data) = self.metadata.get_type_mut(id).as_struct_mut() {
                    data.members = members;
                    data.fields_built = true;
                    nested = data.nested_types.values().copied().collect();
                }
                for child in nested {
                    self.build_fields(child)?;
                }
            }
            TypeKind::Enum(data) if !data.fields_built => {
                let mut members = self.fields(rid, None)?;
                let base = match members.first() {
                    Some(first) if first.name == "value__" => first.ty,
                    _ => return Err(malformed_error!("Enumeration {} has no value__ field", name)),
                };
                if self.metadata.get_type(base).as_primitive().is_none() {
                    return Err(malformed_error!("Enumeration {} has no primitive base", name));
                }
                members.remove(0);

                if let TypeKind::Enum(data) = &mut self.metadata.get_type_mut(id).kind {
                    data.base = Some(base);
                    data.members = members;
                    data.fields_built = true;
                }
            }
            TypeKind::Alias(alias) if alias.aliased.is_none() => {
                let members = self.fields(rid, None)?;
                let aliased = match members.first() {
                    Some(first) if first.name == "Value" => first.ty,
                    _ => return Err(malformed_error!("Alias {} has no Value field", name)),
                };

                let target = match &self.metadata.get_type(aliased).kind {
                    TypeKind::Pointer(target) => *target,
                    _ => aliased,
                };
                if self.metadata.get_type(target).as_primitive().is_none() {
                    return Err(malformed_error!(
                        "Alias {} refers to {}",
                        name,
                        self.metadata.get_type(aliased).name
                    ));
                }

                if let TypeKind::Alias(alias) = &mut self.metadata.get_type_mut(id).kind {
                    alias.aliased = Some(aliased);
                }
            }
            TypeKind::Delegate(_) | TypeKind::ComInterface(_) => {
                if !self.file.fields(rid)?.is_empty() {
                    return Err(malformed_error!("Type {} has unexpected fields", name));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Empty structs that only carry a GUID are identifiers; they become constants.
    fn convert_guid_constants(&mut self) -> Result<()> {
        let candidates: Vec<TypeId> = self
            .metadata
            .types()
            .filter(|(_, ty)| {
                ty.as_struct().is_some_and(|data| {
                    data.enclosing.is_none() && data.members.is_empty() && data.guid.is_some()
                })
            })
            .map(|(id, _)| id)
            .collect();
        log::debug!("Converting {} GUID structs into constants", candidates.len());

        let guid_type = self.metadata.guid_type();
        for id in candidates {
            self.metadata.remove_type(id);

            let ty = self.metadata.get_type(id);
            let (Some(namespace), Some(guid)) =
                (ty.namespace.clone(), ty.as_struct().and_then(|data| data.guid))
            else {
                continue;
            };

            let constant = Constant {
                name: ty.name.clone(),
                namespace,
                ty: guid_type,
                value: ConstantValue::Guid(guid),
                is_ansi: false,
            };
            self.metadata.add_constant(constant)?;
        }

        Ok(())
    }

    fn build_functions_and_constants(&mut self) -> Result<()> {
        let api_types = std::mem::take(&mut self.api_types);
        for (rid, namespace) in &api_types {
            self.build_functions(*rid, namespace)?;
            self.build_constants(*rid, namespace)?;
        }

        Ok(())
    }

    fn build_functions(&mut self, rid: u32, namespace: &str) -> Result<()> {
        for method_def in self.file.methods(rid)? {
            let name = self.file.string(method_def.name)?;
            let attributes = self.attributes(CodedIndex::new(TableId::MethodDef, method_def.rid))?;

            let mut method = Method::new(name, Some(namespace), method_def.rid);
            method.constant_value = attributes.constant_value;
            method.documentation_url = attributes.documentation_url;

            if !self
                .variants
                .preprocess_method(&mut method, attributes.supported_architecture)
            {
                log::trace!("Skipping unsupported function {}", name);
                continue;
            }

            let id = self.metadata.alloc_method(method);
            self.metadata.add_method(id)?;
        }

        Ok(())
    }

    fn build_constants(&mut self, rid: u32, namespace: &str) -> Result<()> {
        let guid_type = self.metadata.guid_type();

        for field in self.fields(rid, None)? {
            let mut is_ansi = false;
            let value = match field.value {
                Some(Literal::String(value)) => {
                    let attributes =
                        self.attributes(CodedIndex::new(TableId::Field, field.field_index))?;
                    is_ansi = attributes.is_ansi;
                    ConstantValue::Literal(Literal::String(value))
                }
                Some(literal) => ConstantValue::Literal(literal),
                None => {
                    let attributes =
                        self.attributes(CodedIndex::new(TableId::Field, field.field_index))?;
                    let type_name = &self.metadata.get_type(field.ty).native_name;

                    match (attributes.guid, attributes.constant_value) {
                        (Some(guid), _) if field.ty == guid_type => ConstantValue::Guid(guid),
                        (_, Some(literal))
                            if self.metadata.config().is_static_initializer(type_name) =>
                        {
                            ConstantValue::Literal(literal)
                        }
                        _ => {
                            return Err(malformed_error!(
                                "Constant {} of type {} has no value",
                                field.name,
                                type_name
                            ))
                        }
                    }
                }
            };

            self.metadata.add_constant(Constant {
                name: field.name,
                namespace: namespace.to_string(),
                ty: field.ty,
                value,
                is_ansi,
            })?;
        }

        Ok(())
    }

    fn build_function_parameters(&mut self) -> Result<()> {
        let methods: Vec<MethodId> = self.metadata.methods().map(|(id, _)| id).collect();
        for id in methods {
            self.build_parameters(id)?;
        }

        Ok(())
    }

    /// Decode library, return type and parameters of a method.
    fn build_parameters(&mut self, id: MethodId) -> Result<()> {
        let rid = self.metadata.get_method(id).definition_index;

        if let Some(impl_map) = self.file.impl_map(rid)? {
            let library = self.file.moduleref_name(impl_map.import_scope)?;
            let inline = library == self.metadata.config().inline_library;

            let method = self.metadata.get_method_mut(id);
            if inline {
                if method.constant_value.is_none() {
                    return Err(malformed_error!(
                        "Inlined function {} has no constant value",
                        method.name
                    ));
                }
                method.library = None;
            } else {
                method.library = Some(library.to_string());
            }
            method.supports_last_error =
                impl_map.mapping_flags & PInvokeAttributes::SUPPORTS_LAST_ERROR != 0;
        }

        let method_def = self.file.methoddef(rid)?;
        let signature = parse_method_signature(self.file.blob(method_def.signature)?)?;

        let return_type = match &signature.return_type {
            TypeSignature::Primitive(PrimitiveKind::Void) => None,
            other => Some(self.resolve(other, None)?),
        };

        let mut parameters = Vec::with_capacity(signature.params.len());
        for param in self.file.params(rid)? {
            // sequence 0 describes the return value
            if param.sequence == 0 {
                continue;
            }

            let Some(param_signature) = signature.params.get(parameters.len()) else {
                return Err(malformed_error!(
                    "Method {} has more parameters than its signature",
                    rid
                ));
            };
            let ty = self.resolve(param_signature, None)?;
            parameters.push(Parameter {
                name: self.file.string(param.name)?.to_string(),
                ty,
            });
        }

        if parameters.len() != signature.params.len() {
            return Err(malformed_error!(
                "Method {} declares {} of {} parameters",
                rid,
                parameters.len(),
                signature.params.len()
            ));
        }

        let method = self.metadata.get_method_mut(id);
        method.return_type = return_type;
        method.parameters = parameters;
        Ok(())
    }

    fn build_delegates_and_interfaces(&mut self) -> Result<()> {
        let types: Vec<TypeId> = self
            .metadata
            .types()
            .filter(|(_, ty)| {
                matches!(ty.kind, TypeKind::Delegate(_) | TypeKind::ComInterface(_))
            })
            .map(|(id, _)| id)
            .collect();

        for id in types {
            if matches!(self.metadata.get_type(id).kind, TypeKind::Delegate(_)) {
                self.build_delegate_signature(id)?;
            } else {
                self.build_interface(id)?;
            }
        }

        Ok(())
    }

    fn build_delegate_signature(&mut self, id: TypeId) -> Result<()> {
        let ty = self.metadata.get_type(id);
        let rid = ty.definition_index;
        let namespace = ty.namespace.clone();
        let name = ty.name.clone();

        let mut invoke = None;
        for method_def in self.file.methods(rid)? {
            if self.file.string(method_def.name)? == "Invoke" {
                invoke = Some(method_def.rid);
                break;
            }
        }
        let Some(invoke) = invoke else {
            return Err(malformed_error!("Delegate {} has no Invoke method", name));
        };

        let signature = self
            .metadata
            .alloc_method(Method::new("Invoke", namespace.as_deref(), invoke));
        self.build_parameters(signature)?;

        if let TypeKind::Delegate(data) = &mut self.metadata.get_type_mut(id).kind {
            data.signature = Some(signature);
        }
        Ok(())
    }

    fn build_interface(&mut self, id: TypeId) -> Result<()> {
        let ty = self.metadata.get_type(id);
        let rid = ty.definition_index;
        let namespace = ty.namespace.clone();
        let name = ty.name.clone();

        let implemented = match self.file.interface_impls(rid)?.as_slice() {
            [] => None,
            [interface_impl] => {
                if interface_impl.interface.tag != TableId::TypeRef {
                    return Err(malformed_error!("Interface {} implements a non-reference", name));
                }
                let parent = self.resolve_type_ref(interface_impl.interface.row, None, false)?;
                if !matches!(self.metadata.get_type(parent).kind, TypeKind::ComInterface(_)) {
                    return Err(malformed_error!("Interface {} implements a non-interface", name));
                }
                Some(parent)
            }
            _ => return Err(malformed_error!("Interface {} implements several interfaces", name)),
        };

        let mut methods = Vec::new();
        for method_def in self.file.methods(rid)? {
            let method_name = self.file.string(method_def.name)?;
            let method = self
                .metadata
                .alloc_method(Method::new(method_name, namespace.as_deref(), method_def.rid));
            self.build_parameters(method)?;
            methods.push(method);
        }

        if let TypeKind::ComInterface(data) = &mut self.metadata.get_type_mut(id).kind {
            data.implemented = implemented;
            data.methods = methods;
        }
        Ok(())
    }
}
