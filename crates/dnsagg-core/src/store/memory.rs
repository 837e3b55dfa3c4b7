// # Memory Record Store
//
// In-memory implementation of RecordStore.
//
// ## Purpose
//
// Stands in for a remote DNS provider: record sets live in a HashMap keyed by
// (zone, name, type). Useful for testing and for local dry runs of the
// daemon where no provider credentials are available.
//
// ## Behavior
//
// - Fetching an absent record set is `NotFound`, same as a real provider
// - Upserts replace the stored record set wholesale
// - In dry-run mode upserts are logged and dropped
// - Clones share the same underlying map, so a test can keep a handle
//   while the reconciler owns another

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::Error;
use crate::config::{ProviderConfig, RecordType};
use crate::traits::{RecordSet, RecordStore, RecordStoreFactory, UpsertResult, normalize_name};

type RecordKey = (String, String, RecordType);

/// In-memory record store implementation
///
/// # Example
///
/// ```rust,no_run
/// use dnsagg_core::{MemoryRecordStore, RecordSet, RecordStore, RecordType};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::new();
///     store
///         .insert("Z123", RecordSet::new("all.example.com", RecordType::A, Some(300), vec![]))
///         .await;
///
///     let set = store.fetch_record_set("Z123", "all.example.com", RecordType::A).await?;
///     assert_eq!(set.ttl, Some(300));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<HashMap<RecordKey, RecordSet>>>,
    upserts: Arc<AtomicUsize>,
    dry_run: bool,
}

impl MemoryRecordStore {
    /// Create a new empty memory record store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `record_sets` in `zone_id`
    pub fn from_record_sets(
        zone_id: &str,
        record_sets: impl IntoIterator<Item = RecordSet>,
    ) -> Self {
        let map = record_sets
            .into_iter()
            .map(|set| (Self::key(zone_id, &set.name, set.record_type), set))
            .collect();

        Self {
            inner: Arc::new(RwLock::new(map)),
            ..Self::default()
        }
    }

    /// Log upserts instead of applying them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn key(zone_id: &str, name: &str, record_type: RecordType) -> RecordKey {
        (zone_id.to_string(), normalize_name(name), record_type)
    }

    /// Seed a record set, as if it had been created out of band
    pub async fn insert(&self, zone_id: &str, record_set: RecordSet) {
        let key = Self::key(zone_id, &record_set.name, record_set.record_type);
        self.inner.write().await.insert(key, record_set);
    }

    /// Read a record set without counting as a provider call
    pub async fn get(&self, zone_id: &str, name: &str, record_type: RecordType) -> Option<RecordSet> {
        let guard = self.inner.read().await;
        guard.get(&Self::key(zone_id, name, record_type)).cloned()
    }

    /// Number of upserts performed so far
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Get the number of record sets in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch_record_set(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<RecordSet, Error> {
        self.get(zone_id, name, record_type).await.ok_or_else(|| {
            Error::not_found(format!(
                "{} (type: {}) in zone {}",
                name, record_type, zone_id
            ))
        })
    }

    async fn upsert_record_set(
        &self,
        zone_id: &str,
        record_set: &RecordSet,
    ) -> Result<UpsertResult, Error> {
        if self.dry_run {
            info!(
                "[DRY-RUN] Would replace {} (type: {}) in zone {} with {:?}",
                record_set.name, record_set.record_type, zone_id, record_set.values
            );
            return Ok(UpsertResult::DryRun);
        }

        let key = Self::key(zone_id, &record_set.name, record_set.record_type);
        let mut guard = self.inner.write().await;
        guard.insert(key, record_set.clone());
        let count = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;

        debug!(
            "Memory store upsert #{}: {} -> {:?}",
            count, record_set.name, record_set.values
        );
        Ok(UpsertResult::Submitted {
            change_id: Some(format!("memory-{}", count)),
        })
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for creating memory record stores
pub struct MemoryStoreFactory;

impl RecordStoreFactory for MemoryStoreFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn RecordStore>, Error> {
        match config {
            ProviderConfig::Memory => Ok(Box::new(MemoryRecordStore::new())),
            _ => Err(Error::config("Invalid config for memory record store")),
        }
    }
}
