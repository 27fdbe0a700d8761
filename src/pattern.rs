//! Get-or-create cache for generated artifacts.
//!
//! Every artifact is keyed by `(kind, element, context)`. Requesting the
//! same key twice returns the same object, not a regenerated duplicate, so
//! downstream consumers can rely on pointer identity. Iteration follows
//! insertion order, which keeps repeated runs over an unchanged model
//! byte-identical.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use capsule_model::{CapsuleId, Model, SignalRef, TypeId};

use crate::codec::{self, PayloadDescriptor, TypeDescriptorRecord};
use crate::errors::GenerationError;
use crate::wiring::{generate_wiring, CapsuleWiring};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Wiring,
    SignalPayload,
    TypeDescriptor,
}

/// Cache key: what kind of artifact, for which element, in which context
/// (e.g. the signal within its protocol).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub kind: ArtifactKind,
    pub element: String,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Artifact {
    Wiring(Arc<CapsuleWiring>),
    SignalPayload(Arc<PayloadDescriptor>),
    TypeDescriptor(Arc<TypeDescriptorRecord>),
}

/// The insertion-ordered artifact table for one generation run.
#[derive(Debug, Default)]
pub struct CodePattern {
    artifacts: IndexMap<ArtifactKey, Artifact>,
}

impl CodePattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wiring artifacts for a capsule, generating them on first request.
    pub fn wiring_for(
        &mut self,
        model: &Model,
        capsule: CapsuleId,
    ) -> Result<Arc<CapsuleWiring>, GenerationError> {
        let key = ArtifactKey {
            kind: ArtifactKind::Wiring,
            element: model.capsule(capsule).name.clone(),
            context: None,
        };
        if let Some(Artifact::Wiring(wiring)) = self.artifacts.get(&key) {
            trace!(element = %key.element, "wiring cache hit");
            return Ok(wiring.clone());
        }
        let wiring = Arc::new(generate_wiring(model, capsule)?);
        self.artifacts.insert(key, Artifact::Wiring(wiring.clone()));
        Ok(wiring)
    }

    /// The payload descriptor for one signal of a protocol.
    pub fn payload_for(
        &mut self,
        model: &Model,
        protocol_name: &str,
        signal: SignalRef,
        signal_id: u32,
    ) -> Result<Arc<PayloadDescriptor>, GenerationError> {
        let key = ArtifactKey {
            kind: ArtifactKind::SignalPayload,
            element: protocol_name.to_string(),
            context: Some(model.signal(signal).name.clone()),
        };
        if let Some(Artifact::SignalPayload(payload)) = self.artifacts.get(&key) {
            trace!(element = %key.element, context = ?key.context, "payload cache hit");
            return Ok(payload.clone());
        }
        let payload = Arc::new(codec::signal_payload(model, signal, signal_id)?);
        self.artifacts
            .insert(key, Artifact::SignalPayload(payload.clone()));
        Ok(payload)
    }

    /// The descriptor record for a structured type.
    pub fn descriptor_for(
        &mut self,
        model: &Model,
        ty: TypeId,
    ) -> Result<Arc<TypeDescriptorRecord>, GenerationError> {
        let key = ArtifactKey {
            kind: ArtifactKind::TypeDescriptor,
            element: model.rt_type(ty).name.clone(),
            context: None,
        };
        if let Some(Artifact::TypeDescriptor(record)) = self.artifacts.get(&key) {
            trace!(element = %key.element, "type descriptor cache hit");
            return Ok(record.clone());
        }
        let record = Arc::new(codec::type_descriptor(model, ty)?);
        self.artifacts
            .insert(key, Artifact::TypeDescriptor(record.clone()));
        Ok(record)
    }

    pub fn get(&self, key: &ArtifactKey) -> Option<&Artifact> {
        self.artifacts.get(key)
    }

    /// Artifacts in insertion (generation) order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArtifactKey, &Artifact)> {
        self.artifacts.iter()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
