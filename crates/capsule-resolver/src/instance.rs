//! The resolved instance topology.
//!
//! [`InstanceTree`] is an arena: capsule instances, port instances and far
//! ends live in flat vectors and reference each other through copyable ids.
//! The tree is built and wired by [`crate::topology::resolve`], then consumed
//! read-only by the wiring generator and discarded.
//!
//! A far end is one half of a connection, owned by the port that minted it.
//! Each port instance keeps the list of its *peers'* far ends in connection
//! order, so `peers[i]` directly names the port and replication index that
//! connection `i` is bound to.

use indexmap::IndexMap;
use smallvec::SmallVec;

use capsule_model::{CapsuleId, PartRef, PortRef};

/// Index of a capsule instance in an [`InstanceTree`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InstanceId(pub(crate) usize);

/// Index of a port instance in an [`InstanceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortInstanceId(pub(crate) usize);

/// Index of a far end in an [`InstanceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FarEndId(pub(crate) usize);

/// One half of a connection: a replication slot of a concrete port instance.
#[derive(Debug, Clone)]
pub struct FarEnd {
    pub owner: PortInstanceId,
    pub index: u32,
}

/// A concrete port of a concrete capsule instance.
#[derive(Debug, Clone)]
pub struct PortInstance {
    pub owner: InstanceId,
    pub port: PortRef,
    pub name: String,
    /// Replication of the port, i.e. how many far ends it can mint.
    pub capacity: u32,
    /// Mintable slots remaining.
    pub(crate) unconnected: u32,
    /// Far ends of the peer ports, in connection order.
    pub(crate) peers: SmallVec<[FarEndId; 2]>,
    /// Once this port has been collapsed into a pass-through, the far end
    /// that outside connections should reuse.
    pub(crate) relay: Option<FarEndId>,
}

impl PortInstance {
    /// Whether this port has been collapsed into a pass-through.
    pub fn is_relay(&self) -> bool {
        self.relay.is_some()
    }

    /// The peers' far ends, indexed by this port's connection order.
    pub fn peers(&self) -> &[FarEndId] {
        &self.peers
    }
}

/// A concrete capsule instance occupying one replication slot of a part.
#[derive(Debug, Clone)]
pub struct CapsuleInstance {
    pub capsule: CapsuleId,
    pub capsule_name: String,
    /// The part this instance occupies, `None` for the top instance.
    pub part: Option<PartRef>,
    pub part_name: Option<String>,
    /// Replication index within the part, `None` when the part's bound is 1.
    pub index: Option<u32>,
    pub dynamic: bool,
    pub container: Option<InstanceId>,
    /// Contained instances per part, keyed by part name in name order.
    pub contained: IndexMap<String, Vec<InstanceId>>,
    /// Port instances in stable port-table order.
    pub ports: IndexMap<String, PortInstanceId>,
}

impl CapsuleInstance {
    pub fn index(&self) -> u32 {
        self.index.unwrap_or(0)
    }
}

/// A resolved connector pairing, recorded in resolution order for
/// diagnostics and connection reports.
#[derive(Debug, Clone)]
pub struct Connection {
    pub connector: String,
    pub ends: [FarEndId; 2],
}

/// The resolved tree for one top capsule type.
#[derive(Debug, Default)]
pub struct InstanceTree {
    pub(crate) instances: Vec<CapsuleInstance>,
    pub(crate) ports: Vec<PortInstance>,
    pub(crate) far_ends: Vec<FarEnd>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) root: InstanceId,
}

impl InstanceTree {
    pub fn root(&self) -> InstanceId {
        self.root
    }

    pub fn instance(&self, id: InstanceId) -> &CapsuleInstance {
        &self.instances[id.0]
    }

    pub fn port(&self, id: PortInstanceId) -> &PortInstance {
        &self.ports[id.0]
    }

    pub fn far_end(&self, id: FarEndId) -> &FarEnd {
        &self.far_ends[id.0]
    }

    /// Every connector pairing made during resolution, in order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// All instances, root first, in creation order.
    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, &CapsuleInstance)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, inst)| (InstanceId(i), inst))
    }

    /// A port of the top instance has no enclosing part. Such a port can
    /// never become a pass-through: the instance is resolved in isolation
    /// and there is no outside to forward to.
    pub fn is_top_level_port(&self, id: PortInstanceId) -> bool {
        self.instance(self.ports[id.0].owner).part.is_none()
    }

    /// Dotted or separator-joined path of an instance, with replication
    /// indices. Used in diagnostics and generated slot names.
    pub fn qualified_name(&self, id: InstanceId, sep: char) -> String {
        let instance = self.instance(id);
        let mut base = match &instance.part_name {
            Some(name) => name.clone(),
            None if instance.capsule_name.is_empty() => "Top".to_string(),
            None => instance.capsule_name.clone(),
        };
        if let Some(container) = instance.container {
            base = format!("{}{}{}", self.qualified_name(container, sep), sep, base);
        }
        match instance.index {
            None => base,
            Some(i) if sep == '.' => format!("{}[{}]", base, i),
            Some(i) => format!("{}{}{}", base, sep, i),
        }
    }

    /// Diagnostic name of a port instance, `path#port`.
    pub fn port_qualified_name(&self, id: PortInstanceId) -> String {
        let port = self.port(id);
        format!("{}#{}", self.qualified_name(port.owner, '.'), port.name)
    }

    pub(crate) fn add_instance(&mut self, instance: CapsuleInstance) -> InstanceId {
        self.instances.push(instance);
        InstanceId(self.instances.len() - 1)
    }

    pub(crate) fn add_port(&mut self, port: PortInstance) -> PortInstanceId {
        self.ports.push(port);
        PortInstanceId(self.ports.len() - 1)
    }

    /// Take the next free replication slot of a port, or `None` when the
    /// port is fully connected. The slot index is the port's connection
    /// count at mint time.
    pub(crate) fn mint_far_end(&mut self, id: PortInstanceId) -> Option<FarEndId> {
        let port = &mut self.ports[id.0];
        if port.unconnected == 0 {
            return None;
        }
        port.unconnected -= 1;
        let index = port.peers.len() as u32;
        self.far_ends.push(FarEnd { owner: id, index });
        Some(FarEndId(self.far_ends.len() - 1))
    }

    /// Record a reciprocal connection between two far ends.
    pub(crate) fn connect(&mut self, a: FarEndId, b: FarEndId) {
        let owner_a = self.far_ends[a.0].owner;
        let owner_b = self.far_ends[b.0].owner;
        self.ports[owner_a.0].peers.push(b);
        self.ports[owner_b.0].peers.push(a);
    }

    /// Collapse a port into a pass-through and return the far end outside
    /// connections should use instead.
    ///
    /// The first conversion detaches the port's first connection and
    /// re-exposes the peer's far end, or mints a fresh one when the port is
    /// still unconnected. Later conversions return the same far end, so a
    /// port touched by several connectors fans out through one slot.
    pub fn convert_to_relay(
        &mut self,
        id: PortInstanceId,
    ) -> Result<FarEndId, crate::error::ResolveError> {
        if self.is_top_level_port(id) {
            return Err(crate::error::ResolveError::TopLevelRelay {
                port: self.port_qualified_name(id),
            });
        }
        if let Some(slot) = self.ports[id.0].relay {
            return Ok(slot);
        }

        let slot = if self.ports[id.0].peers.is_empty() {
            self.mint_far_end(id)
                .ok_or_else(|| crate::error::ResolveError::OutOfRelaySlots {
                    port: self.port_qualified_name(id),
                })?
        } else {
            // Detach the first connection on both sides and hand the peer's
            // far end back to the caller.
            let peer_end = self.ports[id.0].peers.remove(0);
            let peer_port = self.far_ends[peer_end.0].owner;
            if let Some(pos) = self.ports[peer_port.0]
                .peers
                .iter()
                .position(|fe| self.far_ends[fe.0].owner == id)
            {
                self.ports[peer_port.0].peers.remove(pos);
            }
            peer_end
        };

        self.ports[id.0].relay = Some(slot);
        Ok(slot)
    }
}
