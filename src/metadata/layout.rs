//! Struct and union layout.
//!
//! Computes member offsets, padding, struct size and effective packing for the 64-bit targets,
//! following the rules of the native compilers:
//!
//! - primitives are aligned to their size, pointers, delegates and interfaces take 8 bytes
//! - without declared packing, a struct is aligned to its most aligned member
//! - with declared packing, member alignment is capped at the packing
//! - union members all start at offset 0
//! - the size is rounded up to the struct alignment
//!
//! Embedded structs are laid out first, on demand. Once done, the struct is also checked for a
//! trailing flexible array, directly or through an embedded struct.

use std::collections::HashSet;

use crate::{
    metadata::{
        graph::Metadata,
        typesystem::{FlexibleArrayMember, TypeId, TypeKind},
    },
    Result,
};

/// Size and alignment a type needs as a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LayoutRequirement {
    pub size: u32,
    pub alignment: u32,
}

impl LayoutRequirement {
    const POINTER: LayoutRequirement = LayoutRequirement {
        size: 8,
        alignment: 8,
    };

    /// The requirement of `id`. Structs must have been laid out.
    pub(crate) fn for_type(metadata: &Metadata, id: TypeId) -> Result<LayoutRequirement> {
        let ty = metadata.get_type(id);
        match &ty.kind {
            TypeKind::Primitive(kind) => match kind.size() {
                Some(size) => Ok(LayoutRequirement {
                    size,
                    alignment: size,
                }),
                None => Err(malformed_error!("Primitive {} has no layout", kind)),
            },
            TypeKind::Struct(data) => {
                if !data.layout_done {
                    return Err(malformed_error!("Layout of {} is not done", ty.name));
                }
                Ok(LayoutRequirement {
                    size: data.size,
                    alignment: data.packing_size,
                })
            }
            TypeKind::Enum(data) => match data.base {
                Some(base) => LayoutRequirement::for_type(metadata, base),
                None => Err(malformed_error!("Enumeration {} has no base type", ty.name)),
            },
            TypeKind::Pointer(_) | TypeKind::Delegate(_) | TypeKind::ComInterface(_) => {
                Ok(LayoutRequirement::POINTER)
            }
            TypeKind::Array(array) => {
                let item = LayoutRequirement::for_type(metadata, array.item)?;
                let Some(size) = array.length.checked_mul(item.size) else {
                    return Err(malformed_error!(
                        "Array {} of {} items overflows",
                        ty.name,
                        array.length
                    ));
                };
                Ok(LayoutRequirement {
                    size,
                    alignment: item.alignment,
                })
            }
            TypeKind::Alias(alias) => match alias.aliased {
                Some(aliased) => LayoutRequirement::for_type(metadata, aliased),
                None => Err(malformed_error!("Alias {} has no target", ty.name)),
            },
        }
    }
}

/// Running offsets while members are placed.
struct LayoutState {
    forced_packing: bool,
    start: u32,
    end: u32,
    packing: u32,
}

impl LayoutState {
    fn new(packing: u32) -> LayoutState {
        let forced_packing = packing != 0;
        LayoutState {
            forced_packing,
            start: 0,
            end: 0,
            packing: if forced_packing { packing } else { 1 },
        }
    }

    fn advance(&mut self, size: u32, alignment: u32) {
        let alignment = if self.forced_packing {
            alignment.min(self.packing)
        } else {
            self.packing = self.packing.max(alignment);
            alignment
        };

        self.start = align_up(self.end, alignment);
        self.end = self.start + size;
    }

    fn overlay(&mut self, requirement: LayoutRequirement) {
        self.end = self.end.max(requirement.size);
        if !self.forced_packing {
            self.packing = self.packing.max(requirement.alignment);
        }
    }
}

fn align_up(offset: u32, alignment: u32) -> u32 {
    if alignment <= 1 {
        offset
    } else {
        offset.div_ceil(alignment) * alignment
    }
}

/// Lays out all structs of a graph.
pub(crate) struct StructLayouter<'a> {
    metadata: &'a mut Metadata,
    in_progress: HashSet<TypeId>,
}

impl<'a> StructLayouter<'a> {
    pub(crate) fn new(metadata: &'a mut Metadata) -> StructLayouter<'a> {
        StructLayouter {
            metadata,
            in_progress: HashSet::new(),
        }
    }

    /// Lay out every registered struct, nested structs and variant copies included.
    pub(crate) fn layout_all(&mut self) -> Result<()> {
        let structs: Vec<TypeId> = self
            .metadata
            .types()
            .filter(|(_, ty)| matches!(ty.kind, TypeKind::Struct(_)))
            .map(|(id, _)| id)
            .collect();

        for id in structs {
            self.layout(id)?;
        }

        Ok(())
    }

    /// Lay out struct `id` unless it already is.
    pub(crate) fn layout(&mut self, id: TypeId) -> Result<()> {
        let ty = self.metadata.get_type(id);
        let Some(data) = ty.as_struct() else {
            return Ok(());
        };
        if data.layout_done {
            return Ok(());
        }
        if !self.in_progress.insert(id) {
            return Err(malformed_error!("Struct {} contains itself", ty.name));
        }

        let is_union = data.is_union;
        let declared_size = data.size;
        let declared_packing = data.packing_size;
        let members: Vec<TypeId> = data.members.iter().map(|member| member.ty).collect();

        for member in &members {
            self.ensure_layout_done(*member)?;
        }

        let mut state = LayoutState::new(declared_packing);
        let mut offsets = Vec::with_capacity(members.len());
        let mut paddings = vec![0; members.len()];
        let mut last_end = 0;

        for (index, member) in members.iter().enumerate() {
            let requirement = LayoutRequirement::for_type(self.metadata, *member)?;
            if is_union {
                state.overlay(requirement);
                offsets.push(0);
                last_end = requirement.size;
            } else {
                let previous_end = state.end;
                state.advance(requirement.size, requirement.alignment);
                if index > 0 {
                    paddings[index - 1] = state.start - previous_end;
                }
                offsets.push(state.start);
            }
        }

        if !is_union {
            last_end = state.end;
        }
        let packing = state.packing;
        state.advance(0, packing);
        let size = state.start;

        let ty = self.metadata.get_type(id);
        if declared_size != 0 && declared_size != size {
            log::warn!(
                "Struct {} declares size {} but its layout takes {} bytes",
                ty.name,
                declared_size,
                size
            );
        }
        if declared_packing != 0 && declared_packing != packing {
            log::warn!(
                "Struct {} declares packing {} but is aligned to {}",
                ty.name,
                declared_packing,
                packing
            );
        }
        if let Some(last) = paddings.last_mut() {
            *last = size - last_end;
        }

        let flexible = if is_union || self.metadata.config().is_flexible_array_exempt(&ty.name) {
            None
        } else {
            self.find_flexible_member(id, &members)
        };

        if let Some(data) = self.metadata.get_type_mut(id).as_struct_mut() {
            for ((member, offset), padding) in data.members.iter_mut().zip(offsets).zip(paddings) {
                member.offset = offset;
                member.padding_after = padding;
            }
            data.size = size;
            data.packing_size = packing;
            data.flexible_array_member = flexible;
            data.layout_done = true;
        }

        self.in_progress.remove(&id);
        Ok(())
    }

    fn ensure_layout_done(&mut self, id: TypeId) -> Result<()> {
        match &self.metadata.get_type(id).kind {
            TypeKind::Struct(_) => self.layout(id),
            TypeKind::Array(array) => {
                let item = array.item;
                self.ensure_layout_done(item)
            }
            _ => Ok(()),
        }
    }

    /// The last member if it is a flexible array, or the flexible member a trailing embedded
    /// struct forwards.
    fn find_flexible_member(&self, owner: TypeId, members: &[TypeId]) -> Option<FlexibleArrayMember> {
        let (index, last) = members.iter().enumerate().last()?;
        match &self.metadata.get_type(*last).kind {
            TypeKind::Array(array) if array.flexible => Some(FlexibleArrayMember { owner, index }),
            TypeKind::Struct(data) if !data.is_union => data.flexible_array_member,
            _ => None,
        }
    }
}
