//! Reconciliation pass
//!
//! The Reconciler is responsible for:
//! - Resolving the target and every source through a NameResolver
//! - Deciding whether the target is stale (see [`crate::drift`])
//! - Replacing the target's record set through a RecordStore when it is
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────┐
//!                    │  Scheduler   │
//!                    └──────────────┘
//!                           │ run_once()
//!                           ▼
//!                    ┌──────────────┐
//!                    │  Reconciler  │
//!                    └──────────────┘
//!                           │
//!         ┌─────────────────┼─────────────────┐
//!         │                 │                 │
//!         ▼                 ▼                 ▼
//! ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//! │ NameResolver │  │    drift     │  │ RecordStore  │
//! │ (target + N) │  │ (is_stale)   │  │ (fetch+upsert│
//! └──────────────┘  └──────────────┘  └──────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! 1. Resolve target; failure aborts the pass before any mutation
//! 2. Resolve every source and union them; any failure aborts the pass
//! 3. Not stale → `UpToDate`, nothing written
//! 4. Stale → fetch the record set (must exist), replace its values with the
//!    source set, upsert
//!
//! Fetch-then-upsert is not guarded against concurrent writers; this daemon
//! is expected to be the only writer of the target record.

use std::time::Duration;

use tracing::debug;

use crate::address::AddressSet;
use crate::config::{RecordType, SyncConfig};
use crate::drift;
use crate::error::{Error, ErrorKind, Result};
use crate::traits::{NameResolver, RecordStore, UpsertResult};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// Every source address is already behind the target
    UpToDate,

    /// The target record set was replaced
    Updated {
        /// The complete new value list
        values: Vec<String>,
        /// What the store reported for the upsert
        result: UpsertResult,
    },

    /// The pass was aborted
    Failed(FailureReason),
}

/// Why a pass was aborted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    /// Failure category
    pub kind: ErrorKind,
    /// The underlying error
    pub error: Error,
}

impl From<Error> for FailureReason {
    fn from(error: Error) -> Self {
        Self {
            kind: error.kind(),
            error,
        }
    }
}

impl ReconciliationOutcome {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, ReconciliationOutcome::UpToDate)
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, ReconciliationOutcome::Updated { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ReconciliationOutcome::Failed(_))
    }

    /// Failure category, if the pass failed
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            ReconciliationOutcome::Failed(reason) => Some(reason.kind),
            _ => None,
        }
    }
}

// One human-readable status line per pass
impl std::fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconciliationOutcome::UpToDate => f.write_str("up-to-date"),
            ReconciliationOutcome::Updated { values, result } => {
                write!(f, "updated: [{}]", values.join(", "))?;
                match result {
                    UpsertResult::Submitted {
                        change_id: Some(id),
                    } => write!(f, " (change {})", id),
                    UpsertResult::Submitted { change_id: None } => Ok(()),
                    UpsertResult::DryRun => f.write_str(" (dry-run, not written)"),
                }
            }
            ReconciliationOutcome::Failed(reason) => write!(f, "failed: {}", reason.error),
        }
    }
}

/// Single-record reconciler
///
/// Holds the immutable reconciliation parameters and the injected resolver
/// and store. Every address set and record set is local to one
/// [`run_once`](Reconciler::run_once) call.
pub struct Reconciler {
    /// Resolver for sources and target
    resolver: Box<dyn NameResolver>,

    /// Authoritative backend for the target record
    store: Box<dyn RecordStore>,

    /// Hosted zone owning the target record
    hosted_zone_id: String,

    /// Hostnames whose addresses are unioned together
    source_records: Vec<String>,

    /// Hostname whose record set is rewritten
    target_record: String,

    /// Type of the target record set
    record_type: RecordType,

    /// Bound on every single lookup
    resolve_timeout: Duration,

    /// Bound on every store call
    provider_timeout: Duration,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `resolver`: Name resolver implementation
    /// - `store`: Record store implementation
    /// - `config`: Reconciliation configuration (validated here)
    pub fn new(
        resolver: Box<dyn NameResolver>,
        store: Box<dyn RecordStore>,
        config: &SyncConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            resolver,
            store,
            hosted_zone_id: config.hosted_zone_id.clone(),
            source_records: config.source_records.clone(),
            target_record: config.target_record.clone(),
            record_type: config.record_type,
            resolve_timeout: config.timeouts.resolve_timeout(),
            provider_timeout: config.timeouts.provider_timeout(),
        })
    }

    /// Override the call timeouts with sub-second precision
    pub fn with_timeouts(mut self, resolve_timeout: Duration, provider_timeout: Duration) -> Self {
        self.resolve_timeout = resolve_timeout;
        self.provider_timeout = provider_timeout;
        self
    }

    pub fn target_record(&self) -> &str {
        &self.target_record
    }

    pub fn source_records(&self) -> &[String] {
        &self.source_records
    }

    /// Run one reconciliation pass
    ///
    /// Never panics and never returns an error: every failure is folded into
    /// [`ReconciliationOutcome::Failed`] so the caller can keep ticking.
    pub async fn run_once(&self) -> ReconciliationOutcome {
        match self.reconcile().await {
            Ok(outcome) => outcome,
            Err(e) => ReconciliationOutcome::Failed(e.into()),
        }
    }

    async fn reconcile(&self) -> Result<ReconciliationOutcome> {
        let target = self
            .resolve(&self.target_record)
            .await?
            .scoped_to(self.record_type);

        let source = self.resolve_sources().await?.scoped_to(self.record_type);

        let drift = drift::diff(&source, &target);
        if !drift.is_stale() {
            if !drift.extra.is_empty() {
                debug!(
                    "Target {} carries addresses no source resolves to: {}",
                    self.target_record, drift.extra
                );
            }
            return Ok(ReconciliationOutcome::UpToDate);
        }

        debug!(
            "Target {} is stale, missing {} (target: {}, sources: {})",
            self.target_record, drift.missing, target, source
        );

        self.replace_target(&source).await
    }

    /// Resolve every source and union the results
    ///
    /// Any single failure fails the whole union, so a partial view of the
    /// sources can never be written.
    async fn resolve_sources(&self) -> Result<AddressSet> {
        let mut union = AddressSet::new();
        for source in &self.source_records {
            let addrs = self.resolve(source).await?;
            union.extend_from(&addrs);
        }
        Ok(union)
    }

    async fn resolve(&self, hostname: &str) -> Result<AddressSet> {
        match tokio::time::timeout(self.resolve_timeout, self.resolver.resolve(hostname)).await {
            Ok(Ok(addrs)) => Ok(addrs),
            Ok(Err(e @ Error::Resolution { .. })) => Err(e),
            Ok(Err(e)) => Err(Error::resolution(hostname, e.to_string())),
            Err(_) => Err(Error::resolution(
                hostname,
                format!("lookup timed out after {:?}", self.resolve_timeout),
            )),
        }
    }

    /// Fetch the target record set and fully replace its values
    async fn replace_target(&self, source: &AddressSet) -> Result<ReconciliationOutcome> {
        let store_name = self.store.store_name();

        let current = tokio::time::timeout(
            self.provider_timeout,
            self.store
                .fetch_record_set(&self.hosted_zone_id, &self.target_record, self.record_type),
        )
        .await
        .map_err(|_| {
            Error::provider(
                store_name,
                format!("fetch timed out after {:?}", self.provider_timeout),
            )
        })??;

        let values = source.to_values();
        if current.values == values {
            debug!(
                "Record set {} already holds {:?}, resolvers have not caught up yet",
                current.name, values
            );
        }

        let replacement = current.with_values(values.clone());
        debug!(
            "Upserting {} {} in zone {}: {:?} -> {:?} (ttl: {:?})",
            replacement.name,
            replacement.record_type,
            self.hosted_zone_id,
            current.values,
            replacement.values,
            replacement.ttl
        );

        let result = tokio::time::timeout(
            self.provider_timeout,
            self.store
                .upsert_record_set(&self.hosted_zone_id, &replacement),
        )
        .await
        .map_err(|_| {
            Error::provider(
                store_name,
                format!("upsert timed out after {:?}", self.provider_timeout),
            )
        })??;

        Ok(ReconciliationOutcome::Updated { values, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_status_lines() {
        assert_eq!(ReconciliationOutcome::UpToDate.to_string(), "up-to-date");

        let updated = ReconciliationOutcome::Updated {
            values: vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
            result: UpsertResult::Submitted {
                change_id: Some("C42".to_string()),
            },
        };
        assert_eq!(updated.to_string(), "updated: [10.0.0.1, 10.0.0.2] (change C42)");

        let dry = ReconciliationOutcome::Updated {
            values: vec!["10.0.0.1".to_string()],
            result: UpsertResult::DryRun,
        };
        assert_eq!(dry.to_string(), "updated: [10.0.0.1] (dry-run, not written)");

        let failed = ReconciliationOutcome::Failed(Error::not_found("all.example.com").into());
        assert_eq!(failed.to_string(), "failed: Record not found: all.example.com");
        assert_eq!(failed.failure_kind(), Some(ErrorKind::NotFound));
    }
}
