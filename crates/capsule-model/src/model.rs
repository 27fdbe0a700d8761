//! The composition model proper.
//!
//! A [`Model`] is the fully-formed input handed over by the front-end
//! translator: capsule types, protocols and runtime type descriptors, all
//! validated upstream for acyclic redefinition chains and protocol
//! compatibility. Everything here is plain data; resolution and generation
//! live in the downstream crates.

use serde::{Deserialize, Serialize};

use crate::bounds::Bound;

/// Index of a capsule type in a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapsuleId(pub usize);

/// Index of a protocol in a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtocolId(pub usize);

/// Index of a runtime type descriptor in a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub usize);

/// Handle to a port declared by a specific capsule type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub capsule: CapsuleId,
    pub index: usize,
}

/// Handle to a part declared by a specific capsule type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartRef {
    pub capsule: CapsuleId,
    pub index: usize,
}

/// Handle to a signal declared by a specific protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalRef {
    pub protocol: ProtocolId,
    pub index: usize,
}

/// The composition model: an arena of capsule types, protocols and runtime
/// type descriptors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    capsules: Vec<Capsule>,
    protocols: Vec<Protocol>,
    types: Vec<RtType>,
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a model pre-populated with the runtime's predefined primitive
    /// type descriptors (LP64 sizes, matching the runtime library's set).
    pub fn standard() -> Self {
        let mut model = Self::new();
        for &(name, size, align) in &[
            ("bool", 1, 1),
            ("char", 1, 1),
            ("short", 2, 2),
            ("int", 4, 4),
            ("long", 8, 8),
            ("longlong", 8, 8),
            ("float", 4, 4),
            ("double", 8, 8),
            ("longdouble", 16, 16),
            ("ptr", 8, 8),
            ("charptr", 8, 8),
        ] {
            model.add_type(RtType::primitive(name, size, align));
        }
        model
    }

    pub fn add_capsule(&mut self, capsule: Capsule) -> CapsuleId {
        self.capsules.push(capsule);
        CapsuleId(self.capsules.len() - 1)
    }

    pub fn add_protocol(&mut self, protocol: Protocol) -> ProtocolId {
        self.protocols.push(protocol);
        ProtocolId(self.protocols.len() - 1)
    }

    pub fn add_type(&mut self, ty: RtType) -> TypeId {
        self.types.push(ty);
        TypeId(self.types.len() - 1)
    }

    pub fn capsule(&self, id: CapsuleId) -> &Capsule {
        &self.capsules[id.0]
    }

    pub fn capsule_mut(&mut self, id: CapsuleId) -> &mut Capsule {
        &mut self.capsules[id.0]
    }

    pub fn protocol(&self, id: ProtocolId) -> &Protocol {
        &self.protocols[id.0]
    }

    pub fn protocol_mut(&mut self, id: ProtocolId) -> &mut Protocol {
        &mut self.protocols[id.0]
    }

    pub fn rt_type(&self, id: TypeId) -> &RtType {
        &self.types[id.0]
    }

    pub fn port(&self, port: PortRef) -> &Port {
        &self.capsules[port.capsule.0].ports[port.index]
    }

    pub fn part(&self, part: PartRef) -> &Part {
        &self.capsules[part.capsule.0].parts[part.index]
    }

    pub fn signal(&self, signal: SignalRef) -> &Signal {
        &self.protocols[signal.protocol.0].signals[signal.index]
    }

    /// Look up a type descriptor by name.
    pub fn find_type(&self, name: &str) -> Option<TypeId> {
        self.types
            .iter()
            .position(|t| t.name == name)
            .map(TypeId)
    }

    /// Look up a capsule type by name.
    pub fn find_capsule(&self, name: &str) -> Option<CapsuleId> {
        self.capsules
            .iter()
            .position(|c| c.name == name)
            .map(CapsuleId)
    }

    pub fn capsules(&self) -> impl Iterator<Item = (CapsuleId, &Capsule)> {
        self.capsules
            .iter()
            .enumerate()
            .map(|(i, c)| (CapsuleId(i), c))
    }

    pub fn protocols(&self) -> impl Iterator<Item = (ProtocolId, &Protocol)> {
        self.protocols
            .iter()
            .enumerate()
            .map(|(i, p)| (ProtocolId(i), p))
    }
}

/// A capsule type: a component owning ports, parts and connectors, with at
/// most one super-type in its redefinition chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capsule {
    pub name: String,
    /// The redefined (super) capsule type, if any.
    pub redefines: Option<CapsuleId>,
    pub parts: Vec<Part>,
    pub ports: Vec<Port>,
    pub connectors: Vec<Connector>,
}

impl Capsule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            redefines: None,
            parts: Vec::new(),
            ports: Vec::new(),
            connectors: Vec::new(),
        }
    }

    pub fn redefining(name: impl Into<String>, super_type: CapsuleId) -> Self {
        let mut capsule = Self::new(name);
        capsule.redefines = Some(super_type);
        capsule
    }

    pub fn add_port(&mut self, port: Port) -> usize {
        self.ports.push(port);
        self.ports.len() - 1
    }

    pub fn add_part(&mut self, part: Part) -> usize {
        self.parts.push(part);
        self.parts.len() - 1
    }

    pub fn add_connector(&mut self, connector: Connector) -> usize {
        self.connectors.push(connector);
        self.connectors.len() - 1
    }
}

/// The kind of a part, deciding whether its occupants exist from startup or
/// are incarnated on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartKind {
    Fixed,
    Optional,
    Plugin,
}

/// A named slot inside a capsule type, holding replicated sub-capsule
/// instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub name: String,
    /// The capsule type occupying this part.
    pub capsule: CapsuleId,
    pub kind: PartKind,
    pub lower: u32,
    pub upper: Bound,
}

impl Part {
    /// A fixed part with bounds 1..1.
    pub fn new(name: impl Into<String>, capsule: CapsuleId) -> Self {
        Self {
            name: name.into(),
            capsule,
            kind: PartKind::Fixed,
            lower: 1,
            upper: Bound::Literal(1),
        }
    }

    pub fn with_bounds(mut self, lower: u32, upper: impl Into<Bound>) -> Self {
        self.lower = lower;
        self.upper = upper.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.kind = PartKind::Optional;
        self.lower = 0;
        self
    }

    pub fn plugin(mut self) -> Self {
        self.kind = PartKind::Plugin;
        self.lower = 0;
        self
    }
}

/// A typed, replicated communication endpoint implementing one side of a
/// protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub protocol: ProtocolId,
    /// True for the conjugate side of the protocol.
    pub conjugated: bool,
    /// Border ports are visible outside the capsule; internal ports are only
    /// reachable from the capsule's own behaviour.
    pub border: bool,
    /// True when the capsule's behaviour receives messages on this port. A
    /// wired border port without behaviour is a pure pass-through (relay).
    pub behaviour: bool,
    /// Unwired ports are service access points resolved by the runtime's
    /// registry rather than by structural connectors.
    pub wired: bool,
    /// For unwired ports, whether this side provides the service (SPP)
    /// rather than accessing it (SAP).
    pub publish: bool,
    /// Whether the behaviour wants rtBound/rtUnbound notifications.
    pub notification: bool,
    /// Registry name overriding the default for unwired ports.
    pub registration_override: Option<String>,
    pub replication: Bound,
}

impl Port {
    /// A wired border port with behaviour and replication 1.
    pub fn new(name: impl Into<String>, protocol: ProtocolId) -> Self {
        Self {
            name: name.into(),
            protocol,
            conjugated: false,
            border: true,
            behaviour: true,
            wired: true,
            publish: false,
            notification: false,
            registration_override: None,
            replication: Bound::Literal(1),
        }
    }

    pub fn conjugated(mut self) -> Self {
        self.conjugated = true;
        self
    }

    pub fn internal(mut self) -> Self {
        self.border = false;
        self
    }

    /// A pass-through border port: no behaviour behind it.
    pub fn relay(mut self) -> Self {
        self.border = true;
        self.behaviour = false;
        self
    }

    /// An unwired service access point.
    pub fn unwired(mut self) -> Self {
        self.wired = false;
        self
    }

    /// An unwired service provision point.
    pub fn unwired_publish(mut self) -> Self {
        self.wired = false;
        self.publish = true;
        self
    }

    pub fn with_notification(mut self) -> Self {
        self.notification = true;
        self
    }

    pub fn with_registration_override(mut self, name: impl Into<String>) -> Self {
        self.registration_override = Some(name.into());
        self
    }

    /// Service access point: unwired, accessing side.
    pub fn is_sap(&self) -> bool {
        !self.wired && !self.publish
    }

    /// Service provision point: unwired, providing side.
    pub fn is_spp(&self) -> bool {
        !self.wired && self.publish
    }

    pub fn with_replication(mut self, bound: impl Into<Bound>) -> Self {
        self.replication = bound.into();
        self
    }

    /// Whether this port is a pure pass-through at the model level.
    pub fn is_relay(&self) -> bool {
        self.border && self.wired && !self.behaviour
    }
}

/// One end of a connector: a port role, optionally on a named part. An end
/// without a part names a port of the capsule that owns the connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorEnd {
    pub part: Option<String>,
    pub port: String,
}

impl ConnectorEnd {
    /// An end on the owning capsule's own port.
    pub fn own(port: impl Into<String>) -> Self {
        Self {
            part: None,
            port: port.into(),
        }
    }

    /// An end on a port of the named part.
    pub fn on_part(part: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            part: Some(part.into()),
            port: port.into(),
        }
    }
}

/// A structural link between two port roles of a capsule type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    pub name: String,
    pub ends: [ConnectorEnd; 2],
}

impl Connector {
    pub fn between(name: impl Into<String>, end0: ConnectorEnd, end1: ConnectorEnd) -> Self {
        Self {
            name: name.into(),
            ends: [end0, end1],
        }
    }
}

/// Direction of a signal as seen from the protocol's base role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalDirection {
    In,
    Out,
    InOut,
}

/// A message contract: an ordered set of directional signals, with at most
/// one super-protocol in its redefinition chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    pub name: String,
    pub redefines: Option<ProtocolId>,
    pub signals: Vec<Signal>,
}

impl Protocol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            redefines: None,
            signals: Vec::new(),
        }
    }

    pub fn redefining(name: impl Into<String>, super_protocol: ProtocolId) -> Self {
        let mut protocol = Self::new(name);
        protocol.redefines = Some(super_protocol);
        protocol
    }

    pub fn add_signal(&mut self, signal: Signal) -> usize {
        self.signals.push(signal);
        self.signals.len() - 1
    }
}

/// A directional message kind with an ordered parameter list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    pub direction: SignalDirection,
    pub params: Vec<SignalParam>,
}

impl Signal {
    pub fn new(name: impl Into<String>, direction: SignalDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeId) -> Self {
        self.params.push(SignalParam {
            name: name.into(),
            ty,
        });
        self
    }
}

/// A signal parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalParam {
    pub name: String,
    pub ty: TypeId,
}

/// The shape of a runtime type descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RtTypeKind {
    /// An opaque block of memory with a fixed size and alignment.
    Primitive { size: usize, align: usize },
    /// A composite type with ordered fields.
    Structured { fields: Vec<Field> },
    /// A component (capsule) type. Never a serializable payload.
    Capsule(CapsuleId),
}

/// A named runtime type descriptor referenced by signal parameters and
/// structured payload fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtType {
    pub name: String,
    pub kind: RtTypeKind,
}

impl RtType {
    pub fn primitive(name: impl Into<String>, size: usize, align: usize) -> Self {
        Self {
            name: name.into(),
            kind: RtTypeKind::Primitive { size, align },
        }
    }

    pub fn structured(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            kind: RtTypeKind::Structured { fields },
        }
    }

    pub fn capsule_backed(name: impl Into<String>, capsule: CapsuleId) -> Self {
        Self {
            name: name.into(),
            kind: RtTypeKind::Capsule(capsule),
        }
    }
}

/// A field of a structured type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    pub array: Bound,
    /// Class-scoped data; excluded from serialization.
    pub is_static: bool,
    pub ptr_indirection: u32,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            array: Bound::Literal(1),
            is_static: false,
            ptr_indirection: 0,
        }
    }

    pub fn array(mut self, bound: impl Into<Bound>) -> Self {
        self.array = bound.into();
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn indirect(mut self, levels: u32) -> Self {
        self.ptr_indirection = levels;
        self
    }
}
