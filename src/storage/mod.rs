//! Document storage.
//!
//! Every entity is persisted as a JSON document addressed by
//! `(collection, id)`. [`Repository`] adds typed access on top of any
//! [`DocumentStore`] backend.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;
    async fn put(&self, collection: &str, id: &str, body: Value) -> Result<(), StoreError>;
    /// Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
    /// All documents of a collection, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError>;
    /// First document whose top-level string `field` equals `value`.
    async fn find_by_field(&self, collection: &str, field: &str, value: &str) -> Result<Option<(String, Value)>, StoreError>;
}

/// A type stored in its own collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
}

/// A stored document together with its id, as returned by the API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
}

pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self { Self { store: self.store.clone(), marker: PhantomData } }
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self { Self { store, marker: PhantomData } }

    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    pub async fn put(&self, id: &str, doc: &T) -> Result<(), StoreError> {
        self.store.put(T::COLLECTION, id, serde_json::to_value(doc)?).await
    }

    /// Stores `doc` under a fresh time-ordered id.
    pub async fn insert(&self, doc: T) -> Result<Record<T>, StoreError> {
        let id = Uuid::now_v7().to_string();
        self.put(&id, &doc).await?;
        Ok(Record { id, data: doc })
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> { self.store.delete(T::COLLECTION, id).await }

    pub async fn list(&self) -> Result<Vec<Record<T>>, StoreError> {
        self.store
            .list(T::COLLECTION)
            .await?
            .into_iter()
            .map(|(id, body)| Ok(Record { id, data: serde_json::from_value(body)? }))
            .collect()
    }

    pub async fn find_by(&self, field: &str, value: &str) -> Result<Option<Record<T>>, StoreError> {
        match self.store.find_by_field(T::COLLECTION, field, value).await? {
            Some((id, body)) => Ok(Some(Record { id, data: serde_json::from_value(body)? })),
            None => Ok(None),
        }
    }
}
