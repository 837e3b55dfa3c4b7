//! Address sets
//!
//! An [`AddressSet`] is the result of resolving one or more hostnames. It has
//! set semantics (duplicates collapse, order is irrelevant for equality) but
//! iterates in a stable order so that record values rendered from it are
//! deterministic within a pass.

use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::config::RecordType;

/// A set of resolved addresses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    inner: BTreeSet<IpAddr>,
}

impl AddressSet {
    /// Create an empty address set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address, returning `false` if it was already present
    pub fn insert(&mut self, addr: IpAddr) -> bool {
        self.inner.insert(addr)
    }

    /// Add every address of `other` to this set
    pub fn extend_from(&mut self, other: &AddressSet) {
        self.inner.extend(other.inner.iter().copied());
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.inner.contains(addr)
    }

    /// Whether every address of `self` is also in `other`
    pub fn is_subset(&self, other: &AddressSet) -> bool {
        self.inner.is_subset(&other.inner)
    }

    /// Addresses of `self` that are absent from `other`
    pub fn difference(&self, other: &AddressSet) -> AddressSet {
        self.inner.difference(&other.inner).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate in ascending address order (all IPv4 before IPv6)
    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.inner.iter()
    }

    /// Keep only the addresses a record of `record_type` can hold
    pub fn scoped_to(&self, record_type: RecordType) -> AddressSet {
        self.inner
            .iter()
            .copied()
            .filter(|addr| record_type.holds(addr))
            .collect()
    }

    /// Render as record values, in iteration order
    pub fn to_values(&self) -> Vec<String> {
        self.inner.iter().map(IpAddr::to_string).collect()
    }
}

impl FromIterator<IpAddr> for AddressSet {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl Extend<IpAddr> for AddressSet {
    fn extend<I: IntoIterator<Item = IpAddr>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl IntoIterator for AddressSet {
    type Item = IpAddr;
    type IntoIter = std::collections::btree_set::IntoIter<IpAddr>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a> IntoIterator for &'a AddressSet {
    type Item = &'a IpAddr;
    type IntoIter = std::collections::btree_set::Iter<'a, IpAddr>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl std::fmt::Display for AddressSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, addr) in self.inner.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", addr)?;
        }
        f.write_str("}")
    }
}
