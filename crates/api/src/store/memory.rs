//! In-memory record store for tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use super::{RecordStore, StoreError, check_id};

/// A record store keeping everything in a process-local map.
///
/// Cloning shares the underlying map, so a clone handed to a router sees
/// the same data as the original held by a test.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    collections: Arc<RwLock<HashMap<String, HashMap<String, Value>>>>,
}

impl MemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemStore {
    async fn create(&self, collection: &str, id: &str, doc: &Value) -> Result<(), StoreError> {
        check_id(id)?;
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_owned()).or_default();
        if records.contains_key(id) {
            return Err(StoreError::AlreadyExists);
        }
        records.insert(id.to_owned(), doc.clone());
        Ok(())
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StoreError> {
        check_id(id)?;
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .and_then(|records| records.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, collection: &str, id: &str, doc: &Value) -> Result<(), StoreError> {
        check_id(id)?;
        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(id))
            .ok_or(StoreError::NotFound)?;
        *record = doc.clone();
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        check_id(id)?;
        let mut collections = self.collections.write().await;
        collections
            .get_mut(collection)
            .and_then(|records| records.remove(id))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn behaves_like_the_contract() {
        let store = MemStore::new();
        let doc = json!({"order": {"Margherita": 1}});

        store.create("carts", "a@b.c", &doc).await.unwrap();
        assert!(matches!(
            store.create("carts", "a@b.c", &doc).await,
            Err(StoreError::AlreadyExists)
        ));
        assert_eq!(store.read("carts", "a@b.c").await.unwrap(), doc);

        store.update("carts", "a@b.c", &json!({})).await.unwrap();
        store.delete("carts", "a@b.c").await.unwrap();
        assert!(matches!(
            store.read("carts", "a@b.c").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn clones_share_data() {
        let store = MemStore::new();
        let clone = store.clone();
        clone.create("users", "a@b.c", &json!({})).await.unwrap();
        assert!(store.read("users", "a@b.c").await.is_ok());
    }
}
