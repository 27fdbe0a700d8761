//! Code generation core for a hierarchical actor (capsule) composition
//! model.
//!
//! The crate takes an in-memory composition model — capsule types with
//! ports, contained parts, and connectors, plus protocols and payload types
//! — and produces the abstract artifacts a fixed actor-runtime ABI
//! consumes: per-capsule wiring procedures and class descriptors, and
//! per-payload codec descriptor records. It emits call/record structures,
//! not source text; printing them for a concrete target is a separate
//! concern.
//!
//! The model and the stable-id/layout rules live in `capsule-model`; the
//! instance-topology resolver (replication expansion, connector resolution,
//! relay elimination) lives in `capsule-resolver`. This crate layers the
//! generators and the batch driver on top:
//!
//! - [`wiring`]: instantiate bodies, bind/unbind dispatch, class
//!   descriptors.
//! - [`codec`]: signal payload and structured-type descriptor records.
//! - [`pattern`]: the get-or-create artifact cache.
//! - [`generator`]: the per-element batch driver with failure isolation.

pub mod codec;
pub mod errors;
pub mod generator;
pub mod pattern;
pub mod runtime;
pub mod wiring;

pub use codec::{FieldDescriptor, PayloadDescriptor, TypeDescriptorRecord, TypeProcs};
pub use errors::GenerationError;
pub use generator::{
    ElementOutcome, GenerationStatus, Generator, GeneratorConfig, StatusReport, Target,
};
pub use pattern::{Artifact, ArtifactKey, ArtifactKind, CodePattern};
pub use runtime::{IndexExpr, PortAccess, PortArray, RuntimeCall, SlotAccess};
pub use wiring::{
    BindDispatch, CapsuleClassDescriptor, CapsuleWiring, ClauseBody, IndexClause, InstantiateProc,
    PartRole, PortClause, PortRole,
};
