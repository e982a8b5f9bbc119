//! In-memory document store.
//!
//! Collections are `IndexMap`s so `get_all` returns documents in creation
//! order. State is lost on restart; this backend exists for local
//! development and tests. The lock is never held across an `.await`.

use super::{
    generate_id, strip_managed_fields, Document, DocumentStore, StoreError, StoreResult,
    CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, IndexMap<String, Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, IndexMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

fn now_rfc3339() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn create(&self, collection: &str, document: Document) -> StoreResult<Document> {
        let id = generate_id();
        let now = now_rfc3339();

        let mut stored = Document::new();
        stored.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        stored.extend(strip_managed_fields(document));
        stored.insert(CREATED_AT_FIELD.to_string(), now.clone());
        stored.insert(UPDATED_AT_FIELD.to_string(), now);

        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, collection: &str, id: &str, document: Document) -> StoreResult<Document> {
        let mut collections = self.collections.write();
        let existing = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        existing.extend(strip_managed_fields(document));
        existing.insert(UPDATED_AT_FIELD.to_string(), now_rfc3339());
        Ok(existing.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.collections
            .write()
            .get_mut(collection)
            .and_then(|docs| docs.shift_remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(collection, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_identity() {
        let store = MemoryDocumentStore::new();
        let created = store
            .create("productos", doc(json!({"id": "forged", "title": "Yerba"})))
            .await
            .unwrap();

        let id = created["id"].as_str().unwrap();
        assert_ne!(id, "forged");
        assert_eq!(id.len(), 13);
        assert_eq!(created["title"], "Yerba");
        assert_eq!(created["createdAt"], created["updatedAt"]);

        let fetched = store.get_by_id("productos", id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_all_keeps_creation_order() {
        let store = MemoryDocumentStore::new();
        for title in ["a", "b", "c"] {
            store.create("productos", doc(json!({"title": title}))).await.unwrap();
        }

        let titles: Vec<_> = store
            .get_all("productos")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert!(store.get_all("otra").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_identity() {
        let store = MemoryDocumentStore::new();
        let created = store
            .create("productos", doc(json!({"title": "old", "price": 1})))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap();

        let updated = store
            .update(
                "productos",
                id,
                doc(json!({"id": "other", "createdAt": "never", "title": "new"})),
            )
            .await
            .unwrap();

        assert_eq!(updated["id"], id);
        assert_eq!(updated["title"], "new");
        assert_eq!(updated["price"], 1);
        assert_eq!(updated["createdAt"], created["createdAt"]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update("productos", "nope", Document::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryDocumentStore::new();
        let created = store.create("productos", doc(json!({"title": "x"}))).await.unwrap();
        let id = created["id"].as_str().unwrap();

        store.delete("productos", id).await.unwrap();
        assert!(store.is_empty("productos"));
        assert!(store.delete("productos", id).await.unwrap_err().is_not_found());
    }
}
