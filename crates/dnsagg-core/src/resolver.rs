//! System name resolution
//!
//! [`SystemResolver`] delegates to the operating system resolver (the same
//! path `getaddrinfo` takes) through `tokio::net::lookup_host`, so
//! `/etc/hosts`, search domains and the configured nameservers all apply.

use async_trait::async_trait;
use tracing::debug;

use crate::address::AddressSet;
use crate::error::{Error, Result};
use crate::traits::NameResolver;

/// Resolver backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NameResolver for SystemResolver {
    async fn resolve(&self, hostname: &str) -> Result<AddressSet> {
        if hostname.is_empty() {
            return Err(Error::resolution(hostname, "empty hostname"));
        }

        // Port is irrelevant, lookup_host only wants a socket address
        let addrs = tokio::net::lookup_host((hostname, 0))
            .await
            .map_err(|e| Error::resolution(hostname, e.to_string()))?;

        let set: AddressSet = addrs.map(|addr| addr.ip()).collect();
        if set.is_empty() {
            return Err(Error::resolution(hostname, "no such host"));
        }

        debug!("Resolved {} -> {}", hostname, set);
        Ok(set)
    }
}
