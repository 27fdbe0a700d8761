//! Multiplicity bounds for ports, parts and array fields.
//!
//! Bounds usually come in as integer literals, but the source notation also
//! allows arbitrary constant expressions that only the target toolchain can
//! evaluate. Those are kept verbatim and treated conservatively wherever the
//! generator needs an actual count.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An upper multiplicity bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bound {
    /// A bound that evaluated to a constant.
    Literal(u32),
    /// A bound expression that could not be evaluated to a constant.
    Expr(String),
}

/// Replication count assumed for a bound that cannot be evaluated. Anything
/// greater than one forces the replicated code paths, which stay correct if
/// the expression later evaluates to one.
const UNEVALUATED_ASSUMPTION: u32 = 2;

impl Bound {
    /// The bound as a constant, if it evaluated to one.
    pub fn literal(&self) -> Option<u32> {
        match self {
            Bound::Literal(n) => Some(*n),
            Bound::Expr(_) => None,
        }
    }

    /// The replication count to use when the generator must commit to a
    /// number. Unevaluated expressions are assumed to be replicated.
    pub fn assume(&self) -> u32 {
        match self {
            Bound::Literal(n) => *n,
            Bound::Expr(_) => UNEVALUATED_ASSUMPTION,
        }
    }

    /// Whether this bound is known to be exactly one.
    pub fn is_one(&self) -> bool {
        matches!(self, Bound::Literal(1))
    }
}

impl From<u32> for Bound {
    fn from(n: u32) -> Self {
        Bound::Literal(n)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Literal(n) => write!(f, "{}", n),
            Bound::Expr(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_bound() {
        let b = Bound::Literal(3);
        assert_eq!(b.literal(), Some(3));
        assert_eq!(b.assume(), 3);
        assert!(!b.is_one());
    }

    #[test]
    fn test_unevaluated_bound_assumes_replication() {
        let b = Bound::Expr("NUM_WORKERS".into());
        assert_eq!(b.literal(), None);
        assert!(b.assume() > 1);
        assert!(!b.is_one());
    }

    #[test]
    fn test_display() {
        assert_eq!(Bound::Literal(1).to_string(), "1");
        assert_eq!(Bound::Expr("N + 1".into()).to_string(), "N + 1");
    }
}
