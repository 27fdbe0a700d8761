//! Resolution failures.

use thiserror::Error;

/// Errors raised while resolving a capsule type into an instance topology.
///
/// Every variant names the offending model element so the batch driver can
/// report the failure against that element and move on to the next capsule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// A connector end names a part the owning capsule type does not declare
    /// or inherit.
    #[error("connector `{connector}` references unknown part `{part}`")]
    UnknownPart { connector: String, part: String },

    /// A connector end names a port its target capsule type does not declare
    /// or inherit.
    #[error("connector `{connector}` references unknown port `{port}`")]
    UnknownPort { connector: String, port: String },

    /// Round-robin fan-out ran out of secondary instances before every
    /// primary far end was paired.
    #[error("not enough instances of `{secondary}` to connect `{primary}` with `{connector}`")]
    InsufficientInstances {
        connector: String,
        primary: String,
        secondary: String,
    },

    /// A connector consumed more far ends of a port than its replication
    /// bound allows.
    #[error("connector `{connector}` exceeds the replication of port `{port}`")]
    CapacityExceeded { connector: String, port: String },

    /// A pass-through conversion was requested on a port whose replication
    /// is already fully connected.
    #[error("out of far-end slots, cannot create relay port for `{port}`")]
    OutOfRelaySlots { port: String },

    /// A pass-through conversion was requested on a port of the top
    /// instance. The top instance is resolved in isolation; its ports have
    /// no outside to forward to.
    #[error("top-level port `{port}` cannot become a relay")]
    TopLevelRelay { port: String },
}
