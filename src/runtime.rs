//! Abstract model of the actor runtime's frame-service ABI.
//!
//! The wiring generator does not print target source; it emits sequences of
//! [`RuntimeCall`] records whose argument order and meaning match the
//! runtime's frame service exactly. A downstream printer maps each record
//! onto one call site.
//!
//! Port and slot operands are symbolic: a [`PortAccess`] names a port either
//! through the capsule's own border/internal arrays or through the slot of a
//! contained instance, and an [`IndexExpr`] is either a literal replication
//! index or the `index` parameter of the bind/unbind dispatch.

use serde::{Deserialize, Serialize};

/// Symbolic access to a concrete port at wiring time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortAccess {
    /// `borderPorts[id]` — the capsule's own border port array.
    Border { id: u32, port: String },
    /// `internalPorts[id]` — the capsule's own internal port array.
    Internal { id: u32, port: String },
    /// `slot->parts[part].slots[index]->ports[id]` — a border port of a
    /// contained instance.
    SubSlot {
        slot: SlotAccess,
        id: u32,
        port: String,
    },
}

/// Symbolic access to the slot of a contained instance,
/// `slot->parts[part].slots[index]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAccess {
    pub part_id: u32,
    pub part: String,
    pub index: u32,
}

/// A replication index operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexExpr {
    Literal(u32),
    /// The `index` parameter of the enclosing bind/unbind dispatch.
    Param,
}

impl From<u32> for IndexExpr {
    fn from(n: u32) -> Self {
        IndexExpr::Literal(n)
    }
}

/// Which of the capsule's two port arrays an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortArray {
    Border,
    Internal,
}

/// One call against the runtime's frame service. Argument order mirrors the
/// ABI and is part of the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeCall {
    /// Direct point-to-point bind of two far ends.
    ConnectPorts {
        p1: PortAccess,
        i1: IndexExpr,
        p2: PortAccess,
        i2: IndexExpr,
    },
    /// Bind through a still-present relay hop.
    ConnectRelayPort {
        relay: PortAccess,
        relay_index: IndexExpr,
        target: PortAccess,
        target_index: IndexExpr,
    },
    /// Collapsed relay bind: both hops eliminated.
    ConnectFarEnds {
        p1: PortAccess,
        i1: IndexExpr,
        p2: PortAccess,
        i2: IndexExpr,
    },
    /// rtBound/rtUnbound notification against a port array entry.
    SendBoundUnbound {
        array: PortArray,
        port_id: u32,
        index: IndexExpr,
        bind: bool,
    },
    /// rtBound/rtUnbound notification to the far end of a connection.
    SendBoundUnboundFarEnd {
        port: PortAccess,
        index: IndexExpr,
        bind: bool,
    },
    /// rtBound/rtUnbound notification for one replication index of a port.
    SendBoundUnboundForPortIndex {
        port: PortAccess,
        index: IndexExpr,
        bind: bool,
    },
    DisconnectPort {
        port: PortAccess,
        index: Option<IndexExpr>,
    },
    /// Allocate the internal port array of the capsule under construction.
    CreateInternalPorts { class: String },
    /// Delegate a bind to the capsule occupying a sub-slot.
    BindSubcapsulePort {
        is_border: bool,
        slot: SlotAccess,
        port_id: IndexExpr,
        far_end_index: IndexExpr,
    },
    /// Delegate an unbind to the capsule occupying a sub-slot.
    UnbindSubcapsulePort {
        is_border: bool,
        slot: SlotAccess,
        port_id: IndexExpr,
        far_end_index: IndexExpr,
    },
    /// `class->instantiate(slot, createBorderPorts(slot, border_count))` for
    /// a non-dynamic contained instance.
    InstantiateSub {
        class: String,
        slot: SlotAccess,
        border_count: u32,
    },
    /// `slot->capsule = new Class(class, slot, borderPorts, internalPorts
    /// or null, /*isStat=*/false)` — always last in an instantiate body.
    ConstructCapsule {
        class: String,
        with_internal_ports: bool,
    },
}
