//! Composition model for capsule-based actor systems.
//!
//! This crate holds the input side of the code generator: capsule types with
//! their parts, ports and connectors, protocols with their signals, and the
//! runtime type descriptors referenced by signal parameters and structured
//! payload fields.
//!
//! The model is arena-shaped: a [`Model`] owns flat vectors of capsules,
//! protocols and types, addressed by the id newtypes in [`model`]. Features
//! owned by a capsule or protocol (ports, parts, connectors, signals) are
//! addressed by local index through the `*Ref` handle types.
//!
//! # Core Modules
//!
//! - [`model`]: the composition model proper
//! - [`bounds`]: multiplicity bounds and their defensive evaluation
//! - [`layout`]: C-compatible size/offset arithmetic for payload packing
//! - [`ids`]: stable, inheritance-aware feature numbering

pub mod bounds;
pub mod ids;
pub mod layout;
pub mod model;

pub use bounds::Bound;
pub use ids::{PartIdTable, PortIdTable, SignalIdTable, FIRST_PROTOCOL_SIGNAL_ID};
pub use layout::{AggregateLayout, LayoutError};
pub use model::{
    Capsule, CapsuleId, Connector, ConnectorEnd, Field, Model, Part, PartKind, PartRef, Port,
    PortRef, Protocol, ProtocolId, RtType, RtTypeKind, Signal, SignalDirection, SignalParam,
    SignalRef, TypeId,
};
