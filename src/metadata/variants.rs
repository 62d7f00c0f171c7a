//! Splitting of architecture-specific types.
//!
//! A few types and functions are declared once per processor architecture, carrying a
//! `SupportedArchitecture` attribute naming a single architecture. Other types are neutral on
//! the surface but embed such a type by value. The transformer makes both kinds explicit:
//!
//! 1. While building, entities without any supported architecture are dropped, single
//!    architecture types are collected into variant groups and single architecture functions are
//!    renamed right away (`_X64` / `_ARM64`).
//! 2. After building, every namespace struct that transitively embeds a variant (through
//!    members, nested types, array elements and delegate signatures, but never through
//!    pointers) is replaced by one copy per architecture.
//! 3. Variants are renamed with their architecture suffix.
//! 4. Copies, variants and renamed functions are rewired so that every type they reference is
//!    the counterpart for their own architecture.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
    metadata::{
        graph::Metadata,
        typesystem::{Architecture, Method, MethodId, TypeId, TypeKind},
    },
    Result,
};

/// Architecture support of an entity relative to the configured architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Support {
    /// None of the configured architectures
    Unsupported,
    /// All configured architectures
    Neutral,
    /// Exactly one of two configured architectures
    Specific(Architecture),
}

type VariantKey = (String, String);
type Replacements = HashMap<TypeId, TypeId>;

/// Collects variants while the graph is built and splits them once it is complete.
pub(crate) struct VariantTransformer {
    architectures: Architecture,
    variants: BTreeMap<VariantKey, BTreeMap<u32, TypeId>>,
    unsupported: HashSet<u32>,
}

impl VariantTransformer {
    pub(crate) fn new(architectures: Architecture) -> VariantTransformer {
        VariantTransformer {
            architectures: architectures & Architecture::SUPPORTED,
            variants: BTreeMap::new(),
            unsupported: HashSet::new(),
        }
    }

    pub(crate) fn support(&self, mask: Architecture) -> Support {
        let mask = mask & self.architectures;
        if mask.is_empty() {
            Support::Unsupported
        } else if mask == self.architectures {
            Support::Neutral
        } else {
            Support::Specific(mask)
        }
    }

    /// Record the architecture support of a freshly created type. Returns the support level;
    /// unsupported types must not be added to the graph.
    pub(crate) fn preprocess_type(
        &mut self,
        metadata: &mut Metadata,
        id: TypeId,
        mask: Architecture,
    ) -> Result<Support> {
        let ty = metadata.get_type(id);
        let support = self.support(mask);

        match support {
            Support::Unsupported => {
                log::trace!("Skipping unsupported type {}", ty.native_name);
                self.unsupported.insert(ty.definition_index);
            }
            Support::Neutral => {}
            Support::Specific(architecture) => {
                let Some(namespace) = ty.namespace.clone() else {
                    return Ok(Support::Neutral);
                };
                if !matches!(ty.kind, TypeKind::Struct(_) | TypeKind::Delegate(_)) {
                    return Err(malformed_error!(
                        "Architecture-specific type {} is neither struct nor delegate",
                        ty.native_name
                    ));
                }

                self.variants
                    .entry((namespace, ty.native_name.clone()))
                    .or_default()
                    .insert(architecture.bits(), id);
                if let Some(data) = metadata.get_type_mut(id).as_struct_mut() {
                    data.architecture_specific = true;
                }
            }
        }

        Ok(support)
    }

    /// Mark a type as skipped, so its nested types are skipped as well.
    pub(crate) fn mark_unsupported(&mut self, definition_index: u32) {
        self.unsupported.insert(definition_index);
    }

    pub(crate) fn is_unsupported(&self, definition_index: u32) -> bool {
        self.unsupported.contains(&definition_index)
    }

    /// Apply the architecture support to a function. Returns false if it has to be dropped.
    pub(crate) fn preprocess_method(&self, method: &mut Method, mask: Architecture) -> bool {
        match self.support(mask) {
            Support::Unsupported => false,
            Support::Neutral => true,
            Support::Specific(architecture) => {
                method.name = format!("{}{}", method.native_name, architecture.suffix());
                true
            }
        }
    }

    /// Split the collected variants and everything depending on them.
    pub(crate) fn split(&self, metadata: &mut Metadata) -> Result<()> {
        let architectures: Vec<Architecture> = self.architectures.iter().collect();
        if architectures.len() < 2 {
            return Ok(());
        }

        let mut replacements: Vec<(Architecture, Replacements)> = architectures
            .iter()
            .map(|architecture| (*architecture, Replacements::new()))
            .collect();

        let indirect = self.indirectly_specific(metadata);
        log::debug!("{} indirectly architecture-specific types", indirect.len());

        let mut copies: Vec<(Architecture, TypeId)> = Vec::new();
        for original in indirect {
            let ty = metadata.get_type(original);
            if !matches!(ty.kind, TypeKind::Struct(_)) {
                log::warn!(
                    "Indirectly architecture-specific {} is no struct and stays shared",
                    ty.native_name
                );
                continue;
            }

            metadata.remove_type(original);
            forget_nested(metadata, original);

            for (architecture, map) in &mut replacements {
                let copy = duplicate(metadata, original, None, *architecture, map)?;
                copies.push((*architecture, copy));
            }
        }

        for group in self.variants.values() {
            for (bits, id) in group {
                let architecture = Architecture::from_bits_truncate(*bits);
                let name = format!(
                    "{}{}",
                    metadata.get_type(*id).native_name,
                    architecture.suffix()
                );
                log::trace!("Renaming variant to {}", name);
                metadata.rename_type(*id, &name)?;
            }

            for (architecture, map) in &mut replacements {
                if let Some(target) = group.get(&architecture.bits()) {
                    for member in group.values() {
                        map.insert(*member, *target);
                    }
                }
            }
        }

        for (architecture, map) in &replacements {
            for (copy_architecture, copy) in &copies {
                if copy_architecture == architecture {
                    replace_types(metadata, *copy, map);
                }
            }

            for group in self.variants.values() {
                if let Some(variant) = group.get(&architecture.bits()) {
                    replace_types(metadata, *variant, map);
                }
            }

            let functions: Vec<MethodId> = metadata
                .methods()
                .filter(|(_, method)| method.name.ends_with(architecture.suffix()))
                .map(|(id, _)| id)
                .collect();
            for function in functions {
                replace_method_types(metadata, function, map);
            }
        }

        Ok(())
    }

    /// Namespace types outside the variant groups that depend on a variant, in definition order.
    fn indirectly_specific(&self, metadata: &Metadata) -> Vec<TypeId> {
        let mut visited: HashMap<TypeId, Option<bool>> = HashMap::new();

        let candidates: Vec<TypeId> = metadata
            .types()
            .filter(|(_, ty)| match &ty.namespace {
                Some(namespace) => !self
                    .variants
                    .contains_key(&(namespace.clone(), ty.native_name.clone())),
                None => false,
            })
            .map(|(id, _)| id)
            .collect();

        candidates
            .into_iter()
            .filter(|id| self.is_architecture_specific(metadata, *id, &mut visited))
            .collect()
    }

    fn is_architecture_specific(
        &self,
        metadata: &Metadata,
        id: TypeId,
        visited: &mut HashMap<TypeId, Option<bool>>,
    ) -> bool {
        if let Some(Some(specific)) = visited.get(&id) {
            return *specific;
        }

        match self.specific_without_recursion(metadata, id) {
            Some(specific) => specific,
            None => self.specific_with_recursion(metadata, id, visited),
        }
    }

    /// Decide from the type alone, `None` if its references have to be inspected.
    fn specific_without_recursion(&self, metadata: &Metadata, id: TypeId) -> Option<bool> {
        let ty = metadata.get_type(id);
        match &ty.kind {
            TypeKind::Primitive(_) | TypeKind::Enum(_) | TypeKind::Pointer(_) => Some(false),
            TypeKind::Struct(_) | TypeKind::Delegate(_) => {
                let namespace = ty.namespace.as_ref()?;
                if self
                    .variants
                    .contains_key(&(namespace.clone(), ty.native_name.clone()))
                {
                    Some(true)
                } else {
                    None
                }
            }
            TypeKind::Alias(alias) => match alias.aliased {
                Some(aliased) => self.specific_without_recursion(metadata, aliased),
                None => Some(false),
            },
            TypeKind::ComInterface(_) | TypeKind::Array(_) => None,
        }
    }

    fn specific_with_recursion(
        &self,
        metadata: &Metadata,
        id: TypeId,
        visited: &mut HashMap<TypeId, Option<bool>>,
    ) -> bool {
        // Structs and interfaces can be part of cycles, they are tracked while visited
        let tracked = matches!(
            metadata.get_type(id).kind,
            TypeKind::Struct(_) | TypeKind::ComInterface(_)
        );
        if tracked {
            visited.insert(id, None);
        }

        for referenced in metadata.referenced_types(id) {
            let specific = match visited.get(&referenced) {
                Some(None) => continue,
                Some(Some(specific)) => *specific,
                None => match self.specific_without_recursion(metadata, referenced) {
                    Some(specific) => specific,
                    None => self.specific_with_recursion(metadata, referenced, visited),
                },
            };

            if specific {
                if tracked {
                    visited.insert(id, Some(true));
                }
                return true;
            }
        }

        if tracked {
            visited.insert(id, Some(false));
        }
        false
    }
}

/// Drop the nested types of `id` from the definition index, recursively.
fn forget_nested(metadata: &mut Metadata, id: TypeId) {
    let nested: Vec<TypeId> = metadata
        .get_type(id)
        .as_struct()
        .map(|data| data.nested_types.values().copied().collect())
        .unwrap_or_default();

    for child in nested {
        metadata.forget_definition(child);
        forget_nested(metadata, child);
    }
}

/// Copy a struct and its nested types for `architecture`, recording each copy in `map`.
fn duplicate(
    metadata: &mut Metadata,
    original: TypeId,
    enclosing: Option<TypeId>,
    architecture: Architecture,
    map: &mut Replacements,
) -> Result<TypeId> {
    let mut copy = metadata.get_type(original).clone();
    copy.definition_index += architecture.index_offset();
    if enclosing.is_none() {
        copy.name = format!("{}{}", copy.name, architecture.suffix());
    }

    let mut nested = Vec::new();
    if let Some(data) = copy.as_struct_mut() {
        nested = data.nested_types.values().copied().collect();
        data.nested_types.clear();
        data.architecture_specific = true;
        if enclosing.is_some() {
            data.enclosing = enclosing;
        }
    }

    let id = metadata.alloc_type(copy);
    metadata.add_type(id, true)?;
    map.insert(original, id);

    for child in nested {
        duplicate(metadata, child, Some(id), architecture, map)?;
    }

    Ok(id)
}

/// Counterpart of `id` for the architecture of `map`, recursing through pointers and arrays.
fn replace_type(metadata: &mut Metadata, id: TypeId, map: &Replacements) -> TypeId {
    if let Some(replacement) = map.get(&id) {
        return *replacement;
    }

    match &metadata.get_type(id).kind {
        TypeKind::Pointer(target) => {
            let target = *target;
            let replaced = replace_type(metadata, target, map);
            if replaced == target {
                id
            } else {
                metadata.make_pointer_for(replaced)
            }
        }
        TypeKind::Array(array) => {
            let (item, length, flexible) = (array.item, array.length, array.flexible);
            let replaced = replace_type(metadata, item, map);
            if replaced == item {
                return id;
            }

            let copy = metadata.make_array(replaced, length);
            if let TypeKind::Array(array) = &mut metadata.get_type_mut(copy).kind {
                array.flexible = flexible;
            }
            copy
        }
        _ => id,
    }
}

/// Rewire the references of a struct (nested types included) or delegate.
fn replace_types(metadata: &mut Metadata, id: TypeId, map: &Replacements) {
    match &metadata.get_type(id).kind {
        TypeKind::Struct(data) => {
            let members: Vec<TypeId> = data.members.iter().map(|member| member.ty).collect();
            let nested: Vec<(String, TypeId)> = data
                .nested_types
                .iter()
                .map(|(name, child)| (name.clone(), *child))
                .collect();

            let members: Vec<TypeId> = members
                .into_iter()
                .map(|member| replace_type(metadata, member, map))
                .collect();
            let nested: Vec<(String, TypeId)> = nested
                .into_iter()
                .map(|(name, child)| (name, replace_type(metadata, child, map)))
                .collect();

            if let Some(data) = metadata.get_type_mut(id).as_struct_mut() {
                for (member, ty) in data.members.iter_mut().zip(&members) {
                    member.ty = *ty;
                }
                data.nested_types = nested.iter().cloned().collect();
            }

            for (_, child) in nested {
                replace_types(metadata, child, map);
            }
        }
        TypeKind::Delegate(data) => {
            if let Some(signature) = data.signature {
                replace_method_types(metadata, signature, map);
            }
        }
        _ => {}
    }
}

fn replace_method_types(metadata: &mut Metadata, id: MethodId, map: &Replacements) {
    let method = metadata.get_method(id);
    let return_type = method.return_type;
    let parameters: Vec<TypeId> = method.parameters.iter().map(|parameter| parameter.ty).collect();

    let return_type = return_type.map(|ty| replace_type(metadata, ty, map));
    let parameters: Vec<TypeId> = parameters
        .into_iter()
        .map(|ty| replace_type(metadata, ty, map))
        .collect();

    let method = metadata.get_method_mut(id);
    method.return_type = return_type;
    for (parameter, ty) in method.parameters.iter_mut().zip(parameters) {
        parameter.ty = ty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        config::LoaderConfig,
        typesystem::{Member, Parameter, PrimitiveKind, Struct, Type},
    };

    const NAMESPACE: &str = "Windows.Win32.System.Diagnostics.Debug";

    fn member(name: &str, ty: TypeId) -> Member {
        Member {
            name: name.to_string(),
            field_index: 0,
            ty,
            value: None,
            offset: 0,
            padding_after: 0,
        }
    }

    fn add_struct(
        metadata: &mut Metadata,
        transformer: &mut VariantTransformer,
        name: &str,
        index: u32,
        members: Vec<Member>,
        mask: Architecture,
    ) -> TypeId {
        let id = metadata.alloc_type(Type::new(
            name,
            Some(NAMESPACE),
            index,
            TypeKind::Struct(Struct {
                members,
                fields_built: true,
                ..Struct::default()
            }),
        ));
        let support = transformer.preprocess_type(metadata, id, mask).unwrap();
        metadata.add_type(id, support != Support::Specific(Architecture::ARM64)).unwrap();
        id
    }

    fn setup() -> (Metadata, VariantTransformer) {
        let config = LoaderConfig::default();
        let transformer = VariantTransformer::new(config.architectures);
        (Metadata::new("v4.0.30319", config), transformer)
    }

    #[test]
    fn support_levels() {
        let transformer = VariantTransformer::new(Architecture::SUPPORTED);
        assert_eq!(transformer.support(Architecture::X86), Support::Unsupported);
        assert_eq!(transformer.support(Architecture::all()), Support::Neutral);
        assert_eq!(
            transformer.support(Architecture::X86 | Architecture::ARM64),
            Support::Specific(Architecture::ARM64)
        );

        let single = VariantTransformer::new(Architecture::X64);
        assert_eq!(single.support(Architecture::X64), Support::Neutral);
        assert_eq!(single.support(Architecture::ARM64), Support::Unsupported);
    }

    #[test]
    fn functions_are_renamed() {
        let (mut metadata, transformer) = setup();
        let mut method = Method::new("GetContext", Some(NAMESPACE), 1);

        assert!(transformer.preprocess_method(&mut method, Architecture::X64));
        assert_eq!(method.name, "GetContext_X64");
        assert_eq!(method.native_name, "GetContext");
        assert!(!transformer.preprocess_method(&mut method, Architecture::X86));

        let id = metadata.alloc_method(method);
        metadata.add_method(id).unwrap();
        assert!(metadata.namespace(NAMESPACE).unwrap().methods().contains_key("GetContext_X64"));
    }

    #[test]
    fn unsupported_types_are_recorded() {
        let (mut metadata, mut transformer) = setup();
        let id = metadata.alloc_type(Type::new(
            "LEGACY",
            Some(NAMESPACE),
            3,
            TypeKind::Struct(Struct::default()),
        ));

        let support = transformer.preprocess_type(&mut metadata, id, Architecture::X86).unwrap();
        assert_eq!(support, Support::Unsupported);
        assert!(transformer.is_unsupported(3));

        transformer.mark_unsupported(4);
        assert!(transformer.is_unsupported(4));
        assert!(!transformer.is_unsupported(5));
    }

    #[test]
    fn split_variants_and_dependents() {
        let (mut metadata, mut transformer) = setup();
        let uint = metadata.primitive(PrimitiveKind::UInt32);

        let x64 = add_struct(
            &mut metadata,
            &mut transformer,
            "CONTEXT",
            2,
            vec![member("Rax", uint)],
            Architecture::X64,
        );
        let arm64 = add_struct(
            &mut metadata,
            &mut transformer,
            "CONTEXT",
            3,
            vec![member("X0", uint)],
            Architecture::ARM64,
        );
        let pointer = metadata.make_pointer_for(x64);
        let array = metadata.make_array(x64, 2);
        let record = add_struct(
            &mut metadata,
            &mut transformer,
            "RECORD",
            4,
            vec![
                member("Context", x64),
                member("Contexts", array),
                member("Next", pointer),
            ],
            Architecture::all(),
        );
        let neutral = add_struct(
            &mut metadata,
            &mut transformer,
            "LINK",
            5,
            vec![member("Context", pointer)],
            Architecture::all(),
        );

        let mut function = Method::new("RtlCaptureContext", Some(NAMESPACE), 1);
        assert!(transformer.preprocess_method(&mut function, Architecture::ARM64));
        function.parameters.push(Parameter {
            name: "ContextRecord".to_string(),
            ty: pointer,
        });
        let function = metadata.alloc_method(function);
        metadata.add_method(function).unwrap();

        transformer.split(&mut metadata).unwrap();

        let namespace = metadata.namespace(NAMESPACE).unwrap();
        assert_eq!(namespace.type_by_name("CONTEXT"), None);
        assert_eq!(namespace.type_by_name("CONTEXT_X64"), Some(x64));
        assert_eq!(namespace.type_by_name("CONTEXT_ARM64"), Some(arm64));
        assert_eq!(namespace.type_by_name("RECORD"), None);
        assert_eq!(namespace.type_by_name("LINK"), Some(neutral));
        assert_eq!(metadata.get_type(pointer).name, "CONTEXT_X64*");

        let record_x64 = namespace.type_by_name("RECORD_X64").unwrap();
        let record_arm64 = namespace.type_by_name("RECORD_ARM64").unwrap();
        assert_ne!(record_x64, record);
        assert_eq!(metadata.get_type(record_x64).definition_index, 4);
        assert_eq!(metadata.get_type(record_arm64).definition_index, 1_000_004);
        assert_eq!(metadata.get_type(record_arm64).native_name, "RECORD");

        let data = metadata.get_type(record_arm64).as_struct().unwrap();
        assert!(data.architecture_specific);
        assert_eq!(data.members[0].ty, arm64);
        assert_eq!(data.members[2].ty, metadata.pointer_to(arm64).unwrap());
        match &metadata.get_type(data.members[1].ty).kind {
            TypeKind::Array(array) => {
                assert_eq!(array.item, arm64);
                assert_eq!(array.length, 2);
            }
            other => panic!("unexpected {other:?}"),
        }

        let data = metadata.get_type(record_x64).as_struct().unwrap();
        assert_eq!(data.members[0].ty, x64);
        assert_eq!(data.members[1].ty, array);

        // pointers do not make a type specific
        let link = metadata.get_type(neutral).as_struct().unwrap();
        assert_eq!(link.members[0].ty, pointer);

        let function = metadata.get_method(function);
        assert_eq!(function.parameters[0].ty, metadata.pointer_to(arm64).unwrap());
    }

    #[test]
    fn nested_types_are_copied() {
        let (mut metadata, mut transformer) = setup();
        let uint = metadata.primitive(PrimitiveKind::UInt32);

        let x64 = add_struct(
            &mut metadata,
            &mut transformer,
            "SLIST_HEADER",
            2,
            vec![member("Alignment", uint)],
            Architecture::X64,
        );
        add_struct(
            &mut metadata,
            &mut transformer,
            "SLIST_HEADER",
            3,
            vec![member("Next", uint)],
            Architecture::ARM64,
        );
        let outer = add_struct(
            &mut metadata,
            &mut transformer,
            "OUTER",
            4,
            Vec::new(),
            Architecture::all(),
        );

        let mut inner = Type::new(
            "_Anonymous_e__Struct",
            None,
            5,
            TypeKind::Struct(Struct {
                members: vec![member("Header", x64)],
                enclosing: Some(outer),
                fields_built: true,
                ..Struct::default()
            }),
        );
        inner.native_name = "_Anonymous_e__Struct".to_string();
        let inner = metadata.alloc_type(inner);
        metadata.add_type(inner, true).unwrap();
        if let Some(data) = metadata.get_type_mut(outer).as_struct_mut() {
            data.members.push(member("Anonymous", inner));
        }

        transformer.split(&mut metadata).unwrap();

        let copy = metadata.type_by_name(NAMESPACE, "OUTER_ARM64").unwrap();
        let nested = metadata.nested_type(copy, "_Anonymous_e__Struct").unwrap();
        assert_ne!(nested, inner);
        assert_eq!(metadata.get_type(nested).definition_index, 1_000_005);

        let data = metadata.get_type(copy).as_struct().unwrap();
        assert_eq!(data.members[0].ty, nested);

        let nested = metadata.get_type(nested).as_struct().unwrap();
        assert_eq!(nested.enclosing, Some(copy));
        assert_eq!(
            metadata.get_type(nested.members[0].ty).name,
            "SLIST_HEADER_ARM64"
        );
        assert_eq!(metadata.type_by_definition_index(5).map(|id| id == inner), Some(false));
    }
}
