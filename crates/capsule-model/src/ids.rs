//! Stable, inheritance-aware feature numbering.
//!
//! Generated identifiers (signal ids, port ids, part slots) are part of the
//! runtime ABI: an already-assigned id must keep its value when the model
//! gains new siblings or when a subtype redefines an inherited feature.
//!
//! Every table here is built the same way: recurse to the super-type first to
//! obtain its ordered name-keyed map, then insert the own-level features,
//! sorted by name, on top. Overwriting an existing key in an [`IndexMap`]
//! never changes its position, which is exactly the redefinition rule:
//! a redefined feature keeps its inherited slot, a new feature goes to the
//! end.

use indexmap::IndexMap;

use crate::model::{CapsuleId, Model, PartRef, PortRef, ProtocolId, SignalRef};

/// First id available to user-defined protocol signals. The runtime reserves
/// the ids below it for its rtBound and rtUnbound notifications.
pub const FIRST_PROTOCOL_SIGNAL_ID: u32 = 2;

/// Ordered signal table for a protocol, including inherited signals.
#[derive(Debug, Clone)]
pub struct SignalIdTable {
    entries: IndexMap<String, SignalRef>,
    base: u32,
}

impl SignalIdTable {
    pub fn build(model: &Model, protocol: ProtocolId) -> Self {
        Self::build_with_base(model, protocol, FIRST_PROTOCOL_SIGNAL_ID)
    }

    /// Build with a non-default reserved base, for runtimes that claim more
    /// (or fewer) notification ids.
    pub fn build_with_base(model: &Model, protocol: ProtocolId, base: u32) -> Self {
        let mut entries = IndexMap::new();
        collect_signals(model, protocol, &mut entries);
        Self { entries, base }
    }

    /// The runtime signal id for a signal name, offset past the reserved
    /// notification ids.
    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.entries.get_index_of(name).map(|i| i as u32 + self.base)
    }

    pub fn get(&self, name: &str) -> Option<SignalRef> {
        self.entries.get(name).copied()
    }

    /// Signals in id order, with their runtime ids.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, SignalRef)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, (name, sig))| (i as u32 + self.base, name.as_str(), *sig))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn collect_signals(model: &Model, id: ProtocolId, out: &mut IndexMap<String, SignalRef>) {
    let protocol = model.protocol(id);
    if let Some(super_id) = protocol.redefines {
        collect_signals(model, super_id, out);
    }
    for index in sorted_by_name(protocol.signals.iter().map(|s| s.name.as_str())) {
        let name = protocol.signals[index].name.clone();
        out.insert(name, SignalRef { protocol: id, index });
    }
}

/// Ordered port table for a capsule type, including inherited ports, with
/// dense sub-numberings for border and internal ports.
#[derive(Debug, Clone)]
pub struct PortIdTable {
    entries: IndexMap<String, PortRef>,
    border: IndexMap<String, PortRef>,
    internal: IndexMap<String, PortRef>,
}

impl PortIdTable {
    pub fn build(model: &Model, capsule: CapsuleId) -> Self {
        let mut entries = IndexMap::new();
        collect_ports(model, capsule, &mut entries);

        let mut border = IndexMap::new();
        let mut internal = IndexMap::new();
        for (name, port_ref) in &entries {
            if model.port(*port_ref).border {
                border.insert(name.clone(), *port_ref);
            } else {
                internal.insert(name.clone(), *port_ref);
            }
        }
        Self {
            entries,
            border,
            internal,
        }
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.entries.get_index_of(name).map(|i| i as u32)
    }

    /// Dense id among border ports only; the index into the generated border
    /// port array.
    pub fn border_id_of(&self, name: &str) -> Option<u32> {
        self.border.get_index_of(name).map(|i| i as u32)
    }

    /// Dense id among internal ports only.
    pub fn internal_id_of(&self, name: &str) -> Option<u32> {
        self.internal.get_index_of(name).map(|i| i as u32)
    }

    pub fn get(&self, name: &str) -> Option<PortRef> {
        self.entries.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, PortRef)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, (name, port))| (i as u32, name.as_str(), *port))
    }

    pub fn border(&self) -> impl Iterator<Item = (u32, &str, PortRef)> {
        self.border
            .iter()
            .enumerate()
            .map(|(i, (name, port))| (i as u32, name.as_str(), *port))
    }

    pub fn internal(&self) -> impl Iterator<Item = (u32, &str, PortRef)> {
        self.internal
            .iter()
            .enumerate()
            .map(|(i, (name, port))| (i as u32, name.as_str(), *port))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn border_len(&self) -> usize {
        self.border.len()
    }

    pub fn internal_len(&self) -> usize {
        self.internal.len()
    }
}

fn collect_ports(model: &Model, id: CapsuleId, out: &mut IndexMap<String, PortRef>) {
    let capsule = model.capsule(id);
    if let Some(super_id) = capsule.redefines {
        collect_ports(model, super_id, out);
    }
    for index in sorted_by_name(capsule.ports.iter().map(|p| p.name.as_str())) {
        let name = capsule.ports[index].name.clone();
        out.insert(name, PortRef { capsule: id, index });
    }
}

/// Ordered part table for a capsule type, including inherited parts.
#[derive(Debug, Clone)]
pub struct PartIdTable {
    entries: IndexMap<String, PartRef>,
}

impl PartIdTable {
    pub fn build(model: &Model, capsule: CapsuleId) -> Self {
        let mut entries = IndexMap::new();
        collect_parts(model, capsule, &mut entries);
        Self { entries }
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.entries.get_index_of(name).map(|i| i as u32)
    }

    pub fn get(&self, name: &str) -> Option<PartRef> {
        self.entries.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, PartRef)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, (name, part))| (i as u32, name.as_str(), *part))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn collect_parts(model: &Model, id: CapsuleId, out: &mut IndexMap<String, PartRef>) {
    let capsule = model.capsule(id);
    if let Some(super_id) = capsule.redefines {
        collect_parts(model, super_id, out);
    }
    for index in sorted_by_name(capsule.parts.iter().map(|p| p.name.as_str())) {
        let name = capsule.parts[index].name.clone();
        out.insert(name, PartRef { capsule: id, index });
    }
}

/// Indices of the input names, ordered so the names come out sorted.
fn sorted_by_name<'a>(names: impl Iterator<Item = &'a str>) -> Vec<usize> {
    let names: Vec<&str> = names.collect();
    let mut indices: Vec<usize> = (0..names.len()).collect();
    indices.sort_by(|&a, &b| names[a].cmp(names[b]));
    indices
}
