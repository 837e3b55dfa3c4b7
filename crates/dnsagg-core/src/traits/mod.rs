//! Core traits for the dnsagg system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`NameResolver`]: Resolve hostnames to their current addresses
//! - [`RecordStore`]: Read and replace authoritative record sets

pub mod name_resolver;
pub mod record_store;

pub use name_resolver::NameResolver;
pub use record_store::{
    RecordSet, RecordStore, RecordStoreFactory, UpsertResult, normalize_name,
};
