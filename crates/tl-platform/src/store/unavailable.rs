//! Store used when the configured backend could not be initialized and
//! storage is not required. Every operation fails with
//! [`StoreError::Unavailable`] carrying the startup failure.

use super::{Document, DocumentStore, StoreError, StoreResult};
use async_trait::async_trait;

pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    fn fail<T>(&self) -> StoreResult<T> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl DocumentStore for UnavailableStore {
    fn backend(&self) -> &'static str {
        "unavailable"
    }

    async fn get_all(&self, _collection: &str) -> StoreResult<Vec<Document>> {
        self.fail()
    }

    async fn get_by_id(&self, _collection: &str, _id: &str) -> StoreResult<Option<Document>> {
        self.fail()
    }

    async fn create(&self, _collection: &str, _document: Document) -> StoreResult<Document> {
        self.fail()
    }

    async fn update(&self, _collection: &str, _id: &str, _document: Document) -> StoreResult<Document> {
        self.fail()
    }

    async fn delete(&self, _collection: &str, _id: &str) -> StoreResult<()> {
        self.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_call_fails() {
        let store = UnavailableStore::new("connection refused");
        assert!(matches!(
            store.get_all("productos").await,
            Err(StoreError::Unavailable(reason)) if reason == "connection refused"
        ));
        assert!(store.get_by_id("productos", "1").await.is_err());
        assert!(store.create("productos", Document::new()).await.is_err());
        assert!(store.delete("productos", "1").await.is_err());
    }
}
