//! In-process document store, used when no database is configured and in tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DocumentStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.collections.read().await.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn put(&self, collection: &str, id: &str, body: Value) -> Result<(), StoreError> {
        self.collections.write().await.entry(collection.to_string()).or_default().insert(id.to_string(), body);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        Ok(self.collections.write().await.get_mut(collection).and_then(|docs| docs.remove(id)).is_some())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.iter().map(|(id, body)| (id.clone(), body.clone())).collect())
            .unwrap_or_default())
    }

    async fn find_by_field(&self, collection: &str, field: &str, value: &str) -> Result<Option<(String, Value)>, StoreError> {
        Ok(self.collections.read().await.get(collection).and_then(|docs| {
            docs.iter()
                .find(|(_, body)| body.get(field).and_then(Value::as_str) == Some(value))
                .map(|(id, body)| (id.clone(), body.clone()))
        }))
    }
}
