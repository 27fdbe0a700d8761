//! Instance topology resolution for capsule compositions.
//!
//! Given a composition model and a top capsule type, [`resolve`] expands the
//! part hierarchy into concrete instances, pairs far ends across every
//! connector, and collapses pass-through border ports so that messages never
//! hop through a relay at runtime. The resulting [`InstanceTree`] is the sole
//! input the wiring generator needs for one capsule's code.
//!
//! The tree is transient: it is built per top capsule type, consumed
//! immediately, and discarded.

pub mod error;
pub mod instance;
pub mod topology;

pub use error::ResolveError;
pub use instance::{
    CapsuleInstance, Connection, FarEnd, FarEndId, InstanceId, InstanceTree, PortInstance,
    PortInstanceId,
};
pub use topology::{resolve, resolve_shallow};
