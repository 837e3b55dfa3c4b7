// # Record Store Trait
//
// Defines the interface to the authoritative DNS backend.
//
// ## Implementations
//
// - Route 53: `dnsagg-provider-route53` crate
// - In-memory: `dnsagg_core::store::MemoryRecordStore`
//
// ## Usage
//
// ```rust,ignore
// use dnsagg_core::{RecordStore, RecordType};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* RecordStore implementation */;
//
//     let mut set = store.fetch_record_set("Z123", "all.example.com", RecordType::A).await?;
//     set.values = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];
//     store.upsert_record_set("Z123", &set).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::config::RecordType;

/// Result of an upsert operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertResult {
    /// The provider accepted the change
    Submitted {
        /// Provider change identifier, if the provider returns one
        change_id: Option<String>,
    },
    /// The store runs in dry-run mode and skipped the write
    DryRun,
}

/// A record set as held by the authoritative backend
///
/// The daemon only ever holds a transient read-then-write copy within one
/// pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    /// Record name as returned by the provider
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Time-to-live for the record
    pub ttl: Option<u32>,
    /// Rendered record values
    pub values: Vec<String>,
    /// Provider routing metadata, carried over unchanged on replace
    pub extra: BTreeMap<String, String>,
}

impl RecordSet {
    /// Create a record set without routing metadata
    pub fn new(
        name: impl Into<String>,
        record_type: RecordType,
        ttl: Option<u32>,
        values: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type,
            ttl,
            values,
            extra: BTreeMap::new(),
        }
    }

    /// Copy of this record set with its value list fully replaced
    pub fn with_values(&self, values: Vec<String>) -> Self {
        Self {
            values,
            ..self.clone()
        }
    }

    /// Whether this record set is identified by `name` (see [`normalize_name`])
    pub fn is_named(&self, name: &str) -> bool {
        normalize_name(&self.name) == normalize_name(name)
    }
}

/// Canonical form of a record name for comparisons
///
/// Lowercased, without the trailing root dot.
pub fn normalize_name(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase()
}

/// Trait for record store implementations
///
/// # Contract
///
/// - `fetch_record_set` returns [`crate::Error::NotFound`] when the zone or
///   the name/type pair does not exist; never creates anything
/// - `upsert_record_set` fully replaces the value list in a single provider
///   call; partial or incremental updates must not be attempted
/// - No retries, no caching, no background tasks: one call, one request
///
/// Timeouts are applied by the caller on top of any transport timeout the
/// implementation configures.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the current record set for `name`/`record_type` in `zone_id`
    ///
    /// # Returns
    ///
    /// - `Ok(RecordSet)`: The current record set
    /// - `Err(Error::NotFound)`: The zone or record does not exist
    /// - `Err(Error)`: Transport, auth or throttling failure
    async fn fetch_record_set(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<RecordSet, crate::Error>;

    /// Replace the record set in `zone_id` with `record_set`
    ///
    /// # Returns
    ///
    /// - `Ok(UpsertResult)`: The change was accepted (or skipped in dry-run)
    /// - `Err(Error)`: If the upsert failed
    async fn upsert_record_set(
        &self,
        zone_id: &str,
        record_set: &RecordSet,
    ) -> Result<UpsertResult, crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing record stores from configuration
pub trait RecordStoreFactory: Send + Sync {
    /// Create a RecordStore instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn RecordStore>, crate::Error>;
}
