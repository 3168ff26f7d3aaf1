//! Local overlay: records the remote API cannot store, kept in durable
//! key-value storage.

pub mod backend;
pub mod store;

pub use backend::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use store::OverlayStore;
