//! Storage adapters for the [`crate::ports::KeyValueStore`] port.

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocks;
