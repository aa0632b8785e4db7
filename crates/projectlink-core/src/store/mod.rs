// ── Local persistent store ──
//
// The durable backing for the services cache. Implementations live with
// the host (IndexedDB, sqlite, a JSON file...); the core only needs keyed
// JSON records grouped into named stores.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Name of the store holding service records.
pub const SERVICES_STORE: &str = "services";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown store: {name}")]
    UnknownStore { name: String },

    #[error("Store backend failure: {message}")]
    Backend { message: String },
}

/// Keyed JSON record storage, grouped into named stores.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Every record in `store`, in key order.
    async fn get_all(&self, store: &str) -> Result<Vec<Value>, StoreError>;

    async fn get_by_key(&self, store: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Insert or replace the record under `key`.
    async fn set(&self, store: &str, key: &str, value: Value) -> Result<(), StoreError>;

    async fn remove(&self, store: &str, key: &str) -> Result<(), StoreError>;

    /// Drop every record in `store`.
    async fn clear(&self, store: &str) -> Result<(), StoreError>;

    /// Drop every record in every store.
    async fn clear_all(&self) -> Result<(), StoreError>;
}
