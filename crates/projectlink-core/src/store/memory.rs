use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{LocalStore, SERVICES_STORE, StoreError};

/// In-process [`LocalStore`]. Only declared store names are accepted.
#[derive(Debug)]
pub struct MemoryStore {
    stores: DashMap<String, BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new(names: &[&str]) -> Self {
        let stores = DashMap::new();
        for name in names {
            stores.insert((*name).to_owned(), BTreeMap::new());
        }
        Self { stores }
    }

    fn unknown(store: &str) -> StoreError {
        StoreError::UnknownStore {
            name: store.to_owned(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(&[SERVICES_STORE])
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get_all(&self, store: &str) -> Result<Vec<Value>, StoreError> {
        let records = self.stores.get(store).ok_or_else(|| Self::unknown(store))?;
        Ok(records.values().cloned().collect())
    }

    async fn get_by_key(&self, store: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let records = self.stores.get(store).ok_or_else(|| Self::unknown(store))?;
        Ok(records.get(key).cloned())
    }

    async fn set(&self, store: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let mut records = self
            .stores
            .get_mut(store)
            .ok_or_else(|| Self::unknown(store))?;
        records.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, store: &str, key: &str) -> Result<(), StoreError> {
        let mut records = self
            .stores
            .get_mut(store)
            .ok_or_else(|| Self::unknown(store))?;
        records.remove(key);
        Ok(())
    }

    async fn clear(&self, store: &str) -> Result<(), StoreError> {
        self.stores
            .get_mut(store)
            .ok_or_else(|| Self::unknown(store))?
            .clear();
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        for mut records in self.stores.iter_mut() {
            records.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn records_round_trip_by_key() {
        let store = MemoryStore::default();
        store.set(SERVICES_STORE, "b", json!({"id": "b"})).await.unwrap();
        store.set(SERVICES_STORE, "a", json!({"id": "a"})).await.unwrap();

        let all = store.get_all(SERVICES_STORE).await.unwrap();
        assert_eq!(all, vec![json!({"id": "a"}), json!({"id": "b"})]);

        store.remove(SERVICES_STORE, "a").await.unwrap();
        assert!(store.get_by_key(SERVICES_STORE, "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn undeclared_store_is_rejected() {
        let store = MemoryStore::default();
        let err = store.get_all("tags").await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownStore { name } if name == "tags"));
    }

    #[tokio::test]
    async fn clear_all_empties_every_store() {
        let store = MemoryStore::new(&["services", "tags"]);
        store.set("services", "a", json!(1)).await.unwrap();
        store.set("tags", "t", json!(2)).await.unwrap();

        store.clear_all().await.unwrap();

        assert!(store.get_all("services").await.unwrap().is_empty());
        assert!(store.get_all("tags").await.unwrap().is_empty());
    }
}
