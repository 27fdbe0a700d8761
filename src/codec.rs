//! Message codec descriptor generation.
//!
//! Every signal with parameters and every serializable structured type gets
//! a static descriptor record the runtime's generic marshalling logic walks
//! at encode/decode time: a field table with byte offsets, the total payload
//! size, and the procedure symbols for the per-type operations.
//!
//! Signal payloads come in three shapes. A parameterless signal has an empty
//! field table and literal-zero size, with a dummy zeroed field entry kept
//! behind a guard for targets that reject empty arrays. A single parameter
//! is described in place at offset 0. Two or more parameters are packed into
//! a synthesized aggregate, one member per parameter in declaration order,
//! and the offsets are the members' byte offsets within that aggregate.

use serde::{Deserialize, Serialize};
use tracing::trace;

use capsule_model::{
    AggregateLayout, Bound, Field, Model, RtTypeKind, SignalRef, TypeId,
};

use crate::errors::GenerationError;

/// One entry of a payload or structured-type field table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Name of the type descriptor this field refers to.
    pub descriptor: String,
    pub offset: usize,
    pub array_size: Bound,
    pub ptr_indirection: u32,
}

/// The static descriptor for one signal's parameter payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadDescriptor {
    pub signal: String,
    pub signal_id: u32,
    pub size: usize,
    pub fields: Vec<FieldDescriptor>,
    /// True for parameterless signals: the emitted field array still holds
    /// one dummy zeroed entry, guarded so the count stays 0.
    pub guard_dummy_field: bool,
    /// Name of the synthesized packing aggregate when the signal has two or
    /// more parameters.
    pub aggregate: Option<String>,
}

/// Procedure symbols for the per-type marshalling operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeProcs {
    pub initialize: String,
    pub copy: String,
    pub decode: String,
    pub encode: String,
    pub destroy: String,
}

impl TypeProcs {
    /// The runtime's generic field-walking implementations, used for every
    /// generated descriptor.
    pub fn generic() -> Self {
        Self {
            initialize: "object_initialize".to_string(),
            copy: "object_copy".to_string(),
            decode: "object_decode".to_string(),
            encode: "object_encode".to_string(),
            destroy: "object_destroy".to_string(),
        }
    }
}

/// The static descriptor record for a structured type, mirroring the
/// runtime's object-class layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptorRecord {
    pub name: String,
    pub super_descriptor: Option<String>,
    pub procs: TypeProcs,
    pub size: usize,
    pub fields: Vec<FieldDescriptor>,
    pub version: u32,
    pub backwards: u32,
}

/// Build the payload descriptor for one signal.
pub fn signal_payload(
    model: &Model,
    signal: SignalRef,
    signal_id: u32,
) -> Result<PayloadDescriptor, GenerationError> {
    let decl = model.signal(signal);
    let name = decl.name.clone();
    trace!(signal = %name, params = decl.params.len(), "payload descriptor");

    match decl.params.len() {
        0 => Ok(PayloadDescriptor {
            signal: name,
            signal_id,
            size: 0,
            fields: Vec::new(),
            guard_dummy_field: true,
            aggregate: None,
        }),
        1 => {
            let param = &decl.params[0];
            let size = AggregateLayout::size_of(model, param.ty)?;
            let fields = vec![FieldDescriptor {
                name: param.name.clone(),
                descriptor: descriptor_name(model, param.ty, &param.name)?,
                offset: 0,
                array_size: Bound::Literal(1),
                ptr_indirection: 0,
            }];
            Ok(PayloadDescriptor {
                signal: name,
                signal_id,
                size,
                fields,
                guard_dummy_field: false,
                aggregate: None,
            })
        }
        _ => {
            let members: Vec<Field> = decl
                .params
                .iter()
                .map(|p| Field::new(p.name.clone(), p.ty))
                .collect();
            let layout = AggregateLayout::of_fields(model, &members)?;
            let fields = members
                .iter()
                .zip(&layout.offsets)
                .map(|(member, &offset)| {
                    Ok(FieldDescriptor {
                        name: member.name.clone(),
                        descriptor: descriptor_name(model, member.ty, &member.name)?,
                        offset,
                        array_size: Bound::Literal(1),
                        ptr_indirection: 0,
                    })
                })
                .collect::<Result<_, GenerationError>>()?;
            Ok(PayloadDescriptor {
                signal: name.clone(),
                signal_id,
                size: layout.size,
                fields,
                guard_dummy_field: false,
                aggregate: Some(format!("params_{name}")),
            })
        }
    }
}

/// Build the descriptor record for a structured type. The runtime predefines
/// descriptors for primitives, so asking for one here is an error, as is a
/// component type.
pub fn type_descriptor(model: &Model, ty: TypeId) -> Result<TypeDescriptorRecord, GenerationError> {
    let rt_type = model.rt_type(ty);
    let fields = match &rt_type.kind {
        RtTypeKind::Structured { fields } => fields,
        RtTypeKind::Primitive { .. } => {
            return Err(GenerationError::UnknownTypeDescriptor {
                name: rt_type.name.clone(),
            })
        }
        RtTypeKind::Capsule(_) => {
            return Err(GenerationError::ComponentTypedField {
                field: rt_type.name.clone(),
            })
        }
    };

    // Class-scoped members carry no per-instance data.
    let serializable: Vec<Field> = fields.iter().filter(|f| !f.is_static).cloned().collect();
    let layout = AggregateLayout::of_fields(model, &serializable)?;
    let descriptors = serializable
        .iter()
        .zip(&layout.offsets)
        .map(|(field, &offset)| {
            Ok(FieldDescriptor {
                name: field.name.clone(),
                descriptor: descriptor_name(model, field.ty, &field.name)?,
                offset,
                array_size: field.array.clone(),
                ptr_indirection: field.ptr_indirection,
            })
        })
        .collect::<Result<_, GenerationError>>()?;

    Ok(TypeDescriptorRecord {
        name: rt_type.name.clone(),
        super_descriptor: None,
        procs: TypeProcs::generic(),
        size: layout.size,
        fields: descriptors,
        version: 1,
        backwards: 1,
    })
}

/// The descriptor a field of the given type refers to. Primitive and
/// structured types are referable by name; component types are not payload
/// data.
fn descriptor_name(model: &Model, ty: TypeId, field: &str) -> Result<String, GenerationError> {
    let rt_type = model.rt_type(ty);
    match &rt_type.kind {
        RtTypeKind::Primitive { .. } | RtTypeKind::Structured { .. } => Ok(rt_type.name.clone()),
        RtTypeKind::Capsule(_) => Err(GenerationError::ComponentTypedField {
            field: field.to_string(),
        }),
    }
}
