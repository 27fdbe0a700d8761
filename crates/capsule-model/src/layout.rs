//! C-compatible size and offset arithmetic.
//!
//! Payload descriptors carry byte offsets into the structures the target
//! compiler will lay out, so the arithmetic here follows the usual C rules:
//! each member is placed at the next multiple of its alignment, the aggregate
//! is padded to a multiple of its strictest member alignment, and arrays
//! multiply the element size by the bound.
//!
//! Pointer members occupy a pointer regardless of pointee, and component
//! (capsule) types are rejected outright: a component is not payload data.

use thiserror::Error;

use crate::model::{Field, Model, RtTypeKind, TypeId};

const POINTER_SIZE: usize = 8;
const POINTER_ALIGN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("field `{field}` has a component type and cannot be serialized")]
    ComponentField { field: String },
}

/// The computed layout of an ordered field list: one byte offset per field,
/// plus the padded overall size and alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateLayout {
    pub size: usize,
    pub align: usize,
    pub offsets: Vec<usize>,
}

impl AggregateLayout {
    /// Lay out the given fields in order. Static members must be filtered
    /// out by the caller; every field passed in gets an offset.
    pub fn of_fields(model: &Model, fields: &[Field]) -> Result<Self, LayoutError> {
        let mut offsets = Vec::with_capacity(fields.len());
        let mut size = 0usize;
        let mut align = 1usize;
        for field in fields {
            let (field_size, field_align) = field_size_align(model, field)?;
            size = round_up(size, field_align);
            offsets.push(size);
            size += field_size;
            align = align.max(field_align);
        }
        size = round_up(size, align);
        Ok(Self {
            size,
            align,
            offsets,
        })
    }

    /// The size of a single value of the given type.
    pub fn size_of(model: &Model, ty: TypeId) -> Result<usize, LayoutError> {
        type_size_align(model, ty, None).map(|(size, _)| size)
    }
}

fn field_size_align(model: &Model, field: &Field) -> Result<(usize, usize), LayoutError> {
    let (elem_size, elem_align) = if field.ptr_indirection > 0 {
        (POINTER_SIZE, POINTER_ALIGN)
    } else {
        type_size_align(model, field.ty, Some(&field.name))?
    };
    Ok((elem_size * field.array.assume() as usize, elem_align))
}

fn type_size_align(
    model: &Model,
    ty: TypeId,
    field: Option<&str>,
) -> Result<(usize, usize), LayoutError> {
    let rt_type = model.rt_type(ty);
    match &rt_type.kind {
        RtTypeKind::Primitive { size, align } => Ok((*size, *align)),
        RtTypeKind::Structured { fields } => {
            let layout = AggregateLayout::of_fields(model, fields)?;
            Ok((layout.size, layout.align))
        }
        RtTypeKind::Capsule(_) => Err(LayoutError::ComponentField {
            field: field.unwrap_or(&rt_type.name).to_string(),
        }),
    }
}

fn round_up(offset: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (offset + align - 1) & !(align - 1)
}
