//! Record store implementations
//!
//! Provides built-in implementations of the RecordStore trait.

pub mod memory;

pub use memory::{MemoryRecordStore, MemoryStoreFactory};
