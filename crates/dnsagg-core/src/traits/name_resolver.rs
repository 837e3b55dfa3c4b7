// # Name Resolver Trait
//
// Defines the interface for resolving a hostname to its current addresses.
//
// ## Implementations
//
// - System resolver: `dnsagg_core::resolver::SystemResolver`
// - Test doubles: `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use dnsagg_core::NameResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* NameResolver implementation */;
//
//     let addrs = resolver.resolve("example.com").await?;
//     println!("example.com -> {}", addrs);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::address::AddressSet;

/// Trait for name resolver implementations
///
/// # Contract
///
/// - Return **all** addresses the lookup yields, both families
/// - Never cache: every call reflects the current DNS state
/// - Report failures as [`crate::Error::Resolution`]; the reconciler treats
///   them as transient
///
/// Timeouts are applied by the caller, so implementations may simply await
/// the underlying lookup.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolve `hostname` to its current address set
    ///
    /// # Returns
    ///
    /// - `Ok(AddressSet)`: Every address the lookup yielded
    /// - `Err(Error)`: If the lookup failed
    async fn resolve(&self, hostname: &str) -> Result<AddressSet, crate::Error>;
}
