//! Generation failures.

use capsule_model::LayoutError;
use capsule_resolver::ResolveError;
use thiserror::Error;

/// Errors raised while generating artifacts for one element. Failures are
/// per-element: the batch driver records them and keeps going.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A payload or structure field has a component (capsule) type.
    /// Components are not serializable data.
    #[error("field `{field}` has a component type and cannot be serialized")]
    ComponentTypedField { field: String },

    /// A descriptor was requested for a type the generator does not emit
    /// descriptors for (the runtime predefines primitive descriptors).
    #[error("no generated type descriptor for `{name}`")]
    UnknownTypeDescriptor { name: String },
}

impl From<LayoutError> for GenerationError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::ComponentField { field } => GenerationError::ComponentTypedField { field },
        }
    }
}
