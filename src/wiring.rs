//! The wiring code generator.
//!
//! For one concrete capsule type, [`generate_wiring`] shallow-resolves the
//! capsule's own structure and emits the three artifacts its class needs:
//! the `instantiate` procedure body, the bind/unbind dispatch tables, and
//! the static class descriptor the runtime's generic instantiation logic
//! consumes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use capsule_model::{Bound, CapsuleId, Model, PartIdTable, PartKind, PortIdTable, PortRef};
use capsule_resolver::{resolve_shallow, InstanceId, InstanceTree, PortInstanceId};

use crate::errors::GenerationError;
use crate::runtime::{IndexExpr, PortAccess, PortArray, RuntimeCall, SlotAccess};

/// Everything the wiring generator emits for one capsule type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapsuleWiring {
    pub capsule: String,
    pub instantiate: InstantiateProc,
    pub bind: BindDispatch,
    pub unbind: BindDispatch,
    pub descriptor: CapsuleClassDescriptor,
}

/// The body of the generated `instantiate` procedure: internal port
/// allocation, far-end connection calls, sub-slot instantiation, and the
/// final capsule construction, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantiateProc {
    pub capsule: String,
    pub body: Vec<RuntimeCall>,
}

/// The bind or unbind dispatch: a border branch switching on port id (and,
/// for relay ports, on the replication index), plus a default branch that
/// notifies every wired internal port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindDispatch {
    pub bind: bool,
    pub border: Vec<PortClause>,
    /// Actions of the internal-port default branch. The runtime dispatches
    /// internal binds without a port id, so every wired internal port is
    /// notified here.
    pub internal: Vec<RuntimeCall>,
}

/// One border-port case of the dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortClause {
    pub border_id: u32,
    pub port: String,
    pub body: ClauseBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClauseBody {
    /// A plain behaviour port: one action list.
    Calls(Vec<RuntimeCall>),
    /// A relay port: a nested switch on the replication index.
    PerIndex(Vec<IndexClause>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexClause {
    pub index: u32,
    pub calls: Vec<RuntimeCall>,
}

/// The static per-capsule descriptor record consumed by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapsuleClassDescriptor {
    pub name: String,
    pub super_class: Option<String>,
    pub parts: Vec<PartRole>,
    pub border_ports: Vec<PortRole>,
    pub internal_ports: Vec<PortRole>,
}

/// One entry of the part-role table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartRole {
    pub name: String,
    pub class: String,
    pub lower: u32,
    pub upper: Bound,
    pub optional: bool,
    pub plugin: bool,
}

/// One entry of a port-role table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortRole {
    pub id: u32,
    pub name: String,
    pub protocol: String,
    pub registration_override: Option<String>,
    pub bound: Bound,
    pub conjugated: bool,
    pub notification: bool,
    pub sap: bool,
    pub spp: bool,
    pub wired: bool,
}

/// Generate the wiring artifacts for one capsule type.
pub fn generate_wiring(
    model: &Model,
    capsule: CapsuleId,
) -> Result<CapsuleWiring, GenerationError> {
    let tree = resolve_shallow(model, capsule)?;
    let cx = Context::new(model, capsule, &tree);

    let wiring = CapsuleWiring {
        capsule: cx.name().to_string(),
        instantiate: cx.generate_instantiate(),
        bind: cx.generate_dispatch(true),
        unbind: cx.generate_dispatch(false),
        descriptor: cx.generate_descriptor(),
    };
    debug!(
        capsule = %wiring.capsule,
        calls = wiring.instantiate.body.len(),
        "wiring generated"
    );
    Ok(wiring)
}

/// Shared lookup state for one capsule's generation.
struct Context<'a> {
    model: &'a Model,
    capsule: CapsuleId,
    tree: &'a InstanceTree,
    ports: PortIdTable,
    parts: PartIdTable,
}

impl<'a> Context<'a> {
    fn new(model: &'a Model, capsule: CapsuleId, tree: &'a InstanceTree) -> Self {
        Self {
            model,
            capsule,
            tree,
            ports: PortIdTable::build(model, capsule),
            parts: PartIdTable::build(model, capsule),
        }
    }

    fn name(&self) -> &str {
        &self.model.capsule(self.capsule).name
    }

    fn port_decl(&self, id: PortInstanceId) -> &capsule_model::Port {
        self.model.port(self.tree.port(id).port)
    }

    fn is_root(&self, id: InstanceId) -> bool {
        id == self.tree.root()
    }

    /// Access to one of the capsule's own ports through the matching array.
    fn own_access(&self, port: PortRef, name: &str) -> PortAccess {
        if self.model.port(port).border {
            PortAccess::Border {
                id: self.ports.border_id_of(name).unwrap_or(0),
                port: name.to_string(),
            }
        } else {
            PortAccess::Internal {
                id: self.ports.internal_id_of(name).unwrap_or(0),
                port: name.to_string(),
            }
        }
    }

    fn slot_access(&self, instance: InstanceId) -> SlotAccess {
        let inst = self.tree.instance(instance);
        let part = inst.part_name.clone().unwrap_or_default();
        SlotAccess {
            part_id: self.parts.id_of(&part).unwrap_or(0),
            part,
            index: inst.index(),
        }
    }

    /// Access to the far side of a connection: the capsule's own internal
    /// array for internal ports, its border array for top-level ports, and
    /// a sub-slot access otherwise.
    fn far_access(&self, far: capsule_resolver::FarEndId) -> PortAccess {
        let far_end = self.tree.far_end(far);
        let port = self.tree.port(far_end.owner);
        let name = port.name.clone();
        if !self.model.port(port.port).border {
            PortAccess::Internal {
                id: self.ports.internal_id_of(&name).unwrap_or(0),
                port: name,
            }
        } else if self.is_root(port.owner) {
            PortAccess::Border {
                id: self.ports.border_id_of(&name).unwrap_or(0),
                port: name,
            }
        } else {
            let owner_capsule = self.tree.instance(port.owner).capsule;
            PortAccess::SubSlot {
                slot: self.slot_access(port.owner),
                id: PortIdTable::build(self.model, owner_capsule)
                    .border_id_of(&name)
                    .unwrap_or(0),
                port: name,
            }
        }
    }

    /// Whether a far-end owner is the collapsed half of a pass-through
    /// pair: a relay port of this capsule itself.
    fn is_pass_through(&self, id: PortInstanceId) -> bool {
        let port = self.tree.port(id);
        self.is_root(port.owner) && self.model.port(port.port).is_relay()
    }

    fn generate_instantiate(&self) -> InstantiateProc {
        let mut body = Vec::new();
        let has_internal = self.ports.internal_len() > 0;
        if has_internal {
            body.push(RuntimeCall::CreateInternalPorts {
                class: self.name().to_string(),
            });
        }

        // Far-end connections of the capsule's own ports.
        let root = self.tree.instance(self.tree.root());
        let mut pass_through: HashSet<PortInstanceId> = HashSet::new();
        for (name, &port_id) in &root.ports {
            let decl = self.port_decl(port_id);
            let own = self.own_access(self.tree.port(port_id).port, name);
            let mut local_index = 0u32;
            for &far in self.tree.port(port_id).peers() {
                let far_owner = self.tree.far_end(far).owner;
                let far_index = IndexExpr::Literal(self.tree.far_end(far).index);
                if !decl.border {
                    body.push(RuntimeCall::ConnectPorts {
                        p1: own.clone(),
                        i1: IndexExpr::Literal(local_index),
                        p2: self.far_access(far),
                        i2: far_index,
                    });
                    local_index += 1;
                } else if decl.is_relay() {
                    if self.is_pass_through(far_owner) {
                        // One collapsed call per pass-through pair.
                        if pass_through.contains(&port_id) {
                            continue;
                        }
                        pass_through.insert(far_owner);
                        body.push(RuntimeCall::ConnectFarEnds {
                            p1: own.clone(),
                            i1: IndexExpr::Literal(local_index),
                            p2: self.far_access(far),
                            i2: far_index,
                        });
                        local_index += 1;
                    } else {
                        body.push(RuntimeCall::ConnectRelayPort {
                            relay: own.clone(),
                            relay_index: IndexExpr::Literal(local_index),
                            target: self.far_access(far),
                            target_index: far_index,
                        });
                        local_index += 1;
                    }
                } else {
                    body.push(RuntimeCall::ConnectPorts {
                        p1: own.clone(),
                        i1: IndexExpr::Literal(local_index),
                        p2: self.far_access(far),
                        i2: far_index,
                    });
                    local_index += 1;
                }
            }
        }

        // Interconnect sub-part border ports, skipping pairs whose other
        // side was already emitted.
        let mut connected: HashSet<InstanceId> = HashSet::new();
        connected.insert(self.tree.root());
        for sub in self.sub_instances() {
            for &port_id in self.tree.instance(sub).ports.values() {
                if !self.port_decl(port_id).border {
                    continue;
                }
                let mut local_id: i64 = -1;
                for &far in self.tree.port(port_id).peers() {
                    // Incremented first so skipped far ends still consume
                    // their index.
                    local_id += 1;
                    let far_owner_instance = self.tree.port(self.tree.far_end(far).owner).owner;
                    if connected.contains(&far_owner_instance) {
                        continue;
                    }
                    let port = self.tree.port(port_id);
                    let owner_capsule = self.tree.instance(sub).capsule;
                    body.push(RuntimeCall::ConnectPorts {
                        p1: PortAccess::SubSlot {
                            slot: self.slot_access(sub),
                            id: PortIdTable::build(self.model, owner_capsule)
                                .border_id_of(&port.name)
                                .unwrap_or(0),
                            port: port.name.clone(),
                        },
                        i1: IndexExpr::Literal(local_id as u32),
                        p2: self.far_access(far),
                        i2: IndexExpr::Literal(self.tree.far_end(far).index),
                    });
                }
            }
            connected.insert(sub);
        }

        // Instantiate every non-dynamic contained instance.
        for sub in self.sub_instances() {
            let inst = self.tree.instance(sub);
            if inst.dynamic {
                continue;
            }
            body.push(RuntimeCall::InstantiateSub {
                class: inst.capsule_name.clone(),
                slot: self.slot_access(sub),
                border_count: PortIdTable::build(self.model, inst.capsule).border_len() as u32,
            });
        }

        body.push(RuntimeCall::ConstructCapsule {
            class: self.name().to_string(),
            with_internal_ports: has_internal,
        });

        InstantiateProc {
            capsule: self.name().to_string(),
            body,
        }
    }

    /// Contained instances of the root, flattened in part-name order.
    fn sub_instances(&self) -> Vec<InstanceId> {
        self.tree
            .instance(self.tree.root())
            .contained
            .values()
            .flatten()
            .copied()
            .collect()
    }

    fn generate_dispatch(&self, bind: bool) -> BindDispatch {
        let mut border = Vec::new();
        let mut internal = Vec::new();
        let mut pass_through: HashSet<PortInstanceId> = HashSet::new();

        let root = self.tree.instance(self.tree.root());
        for (name, &port_id) in &root.ports {
            let decl = self.port_decl(port_id);
            if !decl.wired {
                continue;
            }

            if !decl.border {
                let internal_id = self.ports.internal_id_of(name).unwrap_or(0);
                internal.push(RuntimeCall::SendBoundUnbound {
                    array: PortArray::Internal,
                    port_id: internal_id,
                    index: IndexExpr::Param,
                    bind,
                });
                if !bind {
                    internal.push(RuntimeCall::DisconnectPort {
                        port: PortAccess::Internal {
                            id: internal_id,
                            port: name.to_string(),
                        },
                        index: Some(IndexExpr::Param),
                    });
                }
            } else if decl.is_relay() {
                if let Some(clause) = self.relay_clause(name, port_id, bind, &mut pass_through) {
                    border.push(clause);
                }
            } else {
                let border_id = self.ports.border_id_of(name).unwrap_or(0);
                let mut calls = vec![RuntimeCall::SendBoundUnbound {
                    array: PortArray::Border,
                    port_id: border_id,
                    index: IndexExpr::Param,
                    bind,
                }];
                if !bind {
                    calls.push(RuntimeCall::DisconnectPort {
                        port: PortAccess::Border {
                            id: border_id,
                            port: name.to_string(),
                        },
                        index: Some(IndexExpr::Param),
                    });
                }
                border.push(PortClause {
                    border_id,
                    port: name.to_string(),
                    body: ClauseBody::Calls(calls),
                });
            }
        }

        BindDispatch {
            bind,
            border,
            internal,
        }
    }

    /// The per-index switch for a relay border port, or `None` when it has
    /// no connections.
    fn relay_clause(
        &self,
        name: &str,
        port_id: PortInstanceId,
        bind: bool,
        pass_through: &mut HashSet<PortInstanceId>,
    ) -> Option<PortClause> {
        let peers = self.tree.port(port_id).peers();
        if peers.is_empty() {
            return None;
        }

        let own = self.own_access(self.tree.port(port_id).port, name);
        let mut cases = Vec::new();
        for (far_end_index, &far) in peers.iter().enumerate() {
            let far_owner = self.tree.far_end(far).owner;
            let far_index = IndexExpr::Literal(self.tree.far_end(far).index);
            let mut calls = Vec::new();

            if self.is_pass_through(far_owner) {
                if bind {
                    if pass_through.contains(&port_id) {
                        continue;
                    }
                    pass_through.insert(far_owner);
                    let peer = self.far_access(far);
                    calls.push(RuntimeCall::ConnectFarEnds {
                        p1: own.clone(),
                        i1: IndexExpr::Param,
                        p2: peer.clone(),
                        i2: far_index,
                    });
                    calls.push(RuntimeCall::SendBoundUnboundFarEnd {
                        port: own.clone(),
                        index: IndexExpr::Param,
                        bind: true,
                    });
                    calls.push(RuntimeCall::SendBoundUnboundFarEnd {
                        port: peer,
                        index: far_index,
                        bind: true,
                    });
                } else {
                    calls.push(RuntimeCall::SendBoundUnboundForPortIndex {
                        port: own.clone(),
                        index: IndexExpr::Param,
                        bind: false,
                    });
                    calls.push(RuntimeCall::DisconnectPort {
                        port: own.clone(),
                        index: Some(IndexExpr::Param),
                    });
                }
            } else if bind {
                let far_owner_instance = self.tree.port(far_owner).owner;
                calls.push(RuntimeCall::ConnectRelayPort {
                    relay: own.clone(),
                    relay_index: IndexExpr::Param,
                    target: self.far_access(far),
                    target_index: far_index,
                });
                calls.push(RuntimeCall::BindSubcapsulePort {
                    is_border: true,
                    slot: self.slot_access(far_owner_instance),
                    port_id: IndexExpr::Param,
                    far_end_index: IndexExpr::Param,
                });
            } else if !self.tree.port(far_owner).is_relay() {
                let far_owner_instance = self.tree.port(far_owner).owner;
                calls.push(RuntimeCall::UnbindSubcapsulePort {
                    is_border: true,
                    slot: self.slot_access(far_owner_instance),
                    port_id: IndexExpr::Param,
                    far_end_index: IndexExpr::Param,
                });
            }

            cases.push(IndexClause {
                index: far_end_index as u32,
                calls,
            });
        }

        Some(PortClause {
            border_id: self.ports.border_id_of(name).unwrap_or(0),
            port: name.to_string(),
            body: ClauseBody::PerIndex(cases),
        })
    }

    fn generate_descriptor(&self) -> CapsuleClassDescriptor {
        let capsule = self.model.capsule(self.capsule);

        let parts = self
            .parts
            .iter()
            .map(|(_, name, part_ref)| {
                let part = self.model.part(part_ref);
                let plugin = part.kind == PartKind::Plugin;
                PartRole {
                    name: name.to_string(),
                    class: self.model.capsule(part.capsule).name.clone(),
                    lower: part.lower,
                    upper: part.upper.clone(),
                    optional: !plugin && part.upper.assume() > part.lower,
                    plugin,
                }
            })
            .collect();

        let mut border_ports = Vec::new();
        let mut internal_ports = Vec::new();
        for (id, name, port_ref) in self.ports.iter() {
            let port = self.model.port(port_ref);
            let role = PortRole {
                id,
                name: name.to_string(),
                protocol: self.model.protocol(port.protocol).name.clone(),
                registration_override: port.registration_override.clone(),
                bound: port.replication.clone(),
                conjugated: port.conjugated,
                notification: port.notification,
                sap: port.is_sap(),
                spp: port.is_spp(),
                wired: port.wired,
            };
            if port.border {
                border_ports.push(role);
            } else {
                internal_ports.push(role);
            }
        }

        CapsuleClassDescriptor {
            name: capsule.name.clone(),
            super_class: capsule
                .redefines
                .map(|id| self.model.capsule(id).name.clone()),
            parts,
            border_ports,
            internal_ports,
        }
    }
}
