// # dnsagg-core
//
// Core library for the dnsagg reconciliation daemon.
//
// dnsagg keeps a published DNS name (the *target*) in sync with the union of
// the addresses behind a set of *source* names. Every poll interval the
// target and the sources are resolved; when a source address is missing from
// the target, the target's authoritative record set is replaced with the
// source addresses.
//
// ## Architecture Overview
//
// - **NameResolver**: Trait for resolving a hostname to its current addresses
// - **RecordStore**: Trait for reading and replacing an authoritative record set
// - **drift**: Pure staleness check between two address sets
// - **Reconciler**: One reconciliation pass (resolve → compare → replace)
// - **Scheduler**: Drives the reconciler on a fixed interval until shutdown
// - **StoreRegistry**: Plugin-based registry for record store factories
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider implementations
// 2. **Serial Passes**: One pass fully completes before the next tick is considered
// 3. **Plugin-Based**: Record stores are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Availability**: No single failed pass stops the loop

pub mod address;
pub mod config;
pub mod drift;
pub mod error;
pub mod reconciler;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use address::AddressSet;
pub use config::{ProviderConfig, RecordType, SyncConfig, TimeoutConfig};
pub use error::{Error, ErrorKind, Result};
pub use reconciler::{FailureReason, ReconciliationOutcome, Reconciler};
pub use registry::StoreRegistry;
pub use resolver::SystemResolver;
pub use scheduler::{IntervalTicker, Scheduler, SchedulerEvent, SchedulerState, Ticker};
pub use store::MemoryRecordStore;
pub use traits::{NameResolver, RecordSet, RecordStore, UpsertResult};
