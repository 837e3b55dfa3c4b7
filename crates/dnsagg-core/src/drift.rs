//! Drift detection
//!
//! The target is *stale* when at least one source address is missing from
//! the target's current address set. The check is intentionally one-sided:
//! addresses that only the target carries do not by themselves make it
//! stale. They disappear anyway whenever a missing address triggers a
//! replace, because the replace writes exactly the source set.
//!
//! An empty source set is never stale, so a transient lookup that yields
//! nothing can never wipe the target.

use crate::address::AddressSet;

/// Both directions of divergence between a source and a target set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drift {
    /// Source addresses the target does not carry
    pub missing: AddressSet,
    /// Target addresses no source resolves to
    pub extra: AddressSet,
}

impl Drift {
    /// Whether the target must be rewritten
    pub fn is_stale(&self) -> bool {
        !self.missing.is_empty()
    }
}

/// Whether `target` is missing any address of `source`
pub fn is_stale(source: &AddressSet, target: &AddressSet) -> bool {
    !source.is_subset(target)
}

/// Compute both directions of divergence
pub fn diff(source: &AddressSet, target: &AddressSet) -> Drift {
    Drift {
        missing: source.difference(target),
        extra: target.difference(source),
    }
}
