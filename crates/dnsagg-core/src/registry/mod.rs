//! Plugin-based record store registry
//!
//! The registry allows record store backends to be registered dynamically
//! at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnsagg_core::registry::StoreRegistry;
//! use dnsagg_core::config::ProviderConfig;
//!
//! // Create a registry with the built-in memory store
//! let registry = StoreRegistry::with_builtin();
//!
//! // Register providers
//! dnsagg_provider_route53::register(&registry);
//!
//! // Create store from config
//! let config = ProviderConfig::Route53 { ... };
//! let store = registry.create_store(&config)?;
//! ```
//!
//! ## Registration
//!
//! Provider crates expose a `register()` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &StoreRegistry) {
//!     registry.register_store("route53", Box::new(Route53Factory));
//! }
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::store::MemoryStoreFactory;
use crate::traits::{RecordStore, RecordStoreFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry for plugin-based record store creation
///
/// The registry maintains a map of store type names to factory objects,
/// allowing dynamic instantiation of stores based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct StoreRegistry {
    /// Registered record store factories
    stores: RwLock<HashMap<String, Box<dyn RecordStoreFactory>>>,
}

impl StoreRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the stores shipped in this crate (`memory`)
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_store("memory", Box::new(MemoryStoreFactory));
        registry
    }

    /// Register a record store factory
    ///
    /// # Parameters
    ///
    /// - `name`: Store type name (e.g., "route53", "memory")
    /// - `factory`: Factory object for creating store instances
    ///
    /// Registering a name twice replaces the earlier factory.
    pub fn register_store(&self, name: impl Into<String>, factory: Box<dyn RecordStoreFactory>) {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        stores.insert(name.into(), factory);
    }

    /// Create a record store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn RecordStore>)`: Created store instance
    /// - `Err(Error)`: If the store type is not registered or creation fails
    pub fn create_store(&self, config: &ProviderConfig) -> Result<Box<dyn RecordStore>> {
        let store_type = config.type_name();
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);

        let factory = stores
            .get(store_type)
            .ok_or_else(|| Error::config(format!("Unknown record store type: {}", store_type)))?;

        factory.create(config)
    }

    /// List all registered store types
    pub fn list_stores(&self) -> Vec<String> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = stores.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a store type is registered
    pub fn has_store(&self, name: &str) -> bool {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.contains_key(name)
    }
}
