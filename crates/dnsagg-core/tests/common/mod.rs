//! Test doubles and common utilities for contract tests
//!
//! The doubles share their counters through `Arc`, so a test can keep one
//! clone for assertions while the reconciler owns another.

#![allow(dead_code)]

use async_trait::async_trait;
use dnsagg_core::error::{Error, Result};
use dnsagg_core::traits::{NameResolver, RecordSet, RecordStore, UpsertResult};
use dnsagg_core::{AddressSet, MemoryRecordStore, RecordType, SyncConfig, Ticker};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};

pub const ZONE: &str = "Z0TESTZONE";
pub const TARGET: &str = "all.example.com";

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn addrs(list: &[&str]) -> Vec<IpAddr> {
    list.iter().map(|s| ip(s)).collect()
}

pub fn values(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Resolver answering from a fixed table
///
/// Unknown hostnames fail with a resolution error, like NXDOMAIN.
#[derive(Clone, Default)]
pub struct StaticResolver {
    answers: Arc<Mutex<HashMap<String, std::result::Result<Vec<IpAddr>, String>>>>,
    hanging: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, host: &str, list: &[&str]) -> Self {
        self.set(host, list);
        self
    }

    /// Replace the answer for `host`
    pub fn set(&self, host: &str, list: &[&str]) {
        self.answers
            .lock()
            .unwrap()
            .insert(host.to_string(), Ok(addrs(list)));
    }

    /// Make `host` fail to resolve
    pub fn fail(&self, host: &str, message: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(host.to_string(), Err(message.to_string()));
    }

    /// Make lookups of `host` never complete
    pub fn hang(&self, host: &str) {
        self.hanging.lock().unwrap().push(host.to_string());
    }

    /// Hostnames looked up so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl NameResolver for StaticResolver {
    async fn resolve(&self, hostname: &str) -> Result<AddressSet> {
        self.calls.lock().unwrap().push(hostname.to_string());

        let hangs = self.hanging.lock().unwrap().iter().any(|h| h == hostname);
        if hangs {
            std::future::pending::<()>().await;
        }

        let answer = self.answers.lock().unwrap().get(hostname).cloned();
        match answer {
            Some(Ok(list)) => Ok(list.into_iter().collect()),
            Some(Err(message)) => Err(Error::resolution(hostname, message)),
            None => Err(Error::resolution(hostname, "NXDOMAIN")),
        }
    }
}

/// Resolver that answers the target from the store's current record set
///
/// Models a DNS view that has already caught up with every upsert. Sources
/// are answered by the wrapped [`StaticResolver`].
#[derive(Clone)]
pub struct StoreBackedResolver {
    pub sources: StaticResolver,
    store: MemoryRecordStore,
}

impl StoreBackedResolver {
    pub fn new(sources: StaticResolver, store: MemoryRecordStore) -> Self {
        Self { sources, store }
    }
}

#[async_trait]
impl NameResolver for StoreBackedResolver {
    async fn resolve(&self, hostname: &str) -> Result<AddressSet> {
        if hostname != TARGET {
            return self.sources.resolve(hostname).await;
        }

        let mut set = AddressSet::new();
        for record_type in [RecordType::A, RecordType::Aaaa] {
            if let Some(record) = self.store.get(ZONE, TARGET, record_type).await {
                for value in &record.values {
                    if let Ok(addr) = value.parse::<IpAddr>() {
                        set.insert(addr);
                    }
                }
            }
        }
        Ok(set)
    }
}

/// Store whose upsert always fails
#[derive(Clone)]
pub struct FailingStore {
    record: RecordSet,
    error: Error,
    upsert_calls: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn new(record: RecordSet, error: Error) -> Self {
        Self {
            record,
            error,
            upsert_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn upsert_count(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn fetch_record_set(
        &self,
        _zone_id: &str,
        _name: &str,
        _record_type: RecordType,
    ) -> Result<RecordSet> {
        Ok(self.record.clone())
    }

    async fn upsert_record_set(&self, _zone_id: &str, _record_set: &RecordSet) -> Result<UpsertResult> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn store_name(&self) -> &'static str {
        "failing"
    }
}

/// Store whose calls never complete
#[derive(Clone, Default)]
pub struct HangingStore {
    fetch_calls: Arc<AtomicUsize>,
}

impl HangingStore {
    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for HangingStore {
    async fn fetch_record_set(
        &self,
        _zone_id: &str,
        _name: &str,
        _record_type: RecordType,
    ) -> Result<RecordSet> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn upsert_record_set(&self, _zone_id: &str, _record_set: &RecordSet) -> Result<UpsertResult> {
        std::future::pending().await
    }

    fn store_name(&self) -> &'static str {
        "hanging"
    }
}

/// Memory store whose upsert blocks until released
///
/// `entered` is notified when an upsert starts; the upsert then waits on
/// `release` before writing.
#[derive(Clone)]
pub struct GatedStore {
    pub inner: MemoryRecordStore,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl GatedStore {
    pub fn new(inner: MemoryRecordStore) -> Self {
        Self {
            inner,
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl RecordStore for GatedStore {
    async fn fetch_record_set(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<RecordSet> {
        self.inner.fetch_record_set(zone_id, name, record_type).await
    }

    async fn upsert_record_set(&self, zone_id: &str, record_set: &RecordSet) -> Result<UpsertResult> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.upsert_record_set(zone_id, record_set).await
    }

    fn store_name(&self) -> &'static str {
        "gated"
    }
}

/// Ticker driven by the test through a channel
///
/// Once every sender is dropped the ticker never ticks again.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

impl ManualTicker {
    pub fn new() -> (Self, mpsc::UnboundedSender<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, tx)
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config(sources: &[&str]) -> SyncConfig {
    SyncConfig::new(
        ZONE,
        sources.iter().map(|s| s.to_string()).collect(),
        TARGET,
        60,
    )
}

/// A store holding the target record set with the given values
pub async fn seeded_store(list: &[&str]) -> MemoryRecordStore {
    let store = MemoryRecordStore::new();
    store
        .insert(ZONE, RecordSet::new(TARGET, RecordType::A, Some(300), values(list)))
        .await;
    store
}
