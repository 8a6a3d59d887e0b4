/// Key-value storage behind the domain registry
///
/// The registry only ever needs string blobs under string keys, so any
/// backend that can get, set and delete by key is enough:
/// - `MemoryStore` keeps everything in process memory
/// - `LibsqlStore` persists to a local libsql file or a remote libsql server
pub mod libsql_store;
pub mod memory;
mod migrations;
pub mod pool;

pub use libsql_store::LibsqlStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::StoreError;

/// Contract between the engine and whatever holds its data.
///
/// Every read-modify-write built on top of this is a plain get followed by a
/// set; two writers on the same key race and the last one wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value under `key`, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`; returns whether anything was removed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Drop every key
    async fn flush(&self) -> Result<(), StoreError>;
}
