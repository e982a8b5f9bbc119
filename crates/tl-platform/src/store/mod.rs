//! Document Store
//!
//! Schemaless persistence seam behind the resource services. Documents are
//! JSON objects; the store owns identity and the `createdAt` / `updatedAt`
//! timestamps, and exposes the identity as the `id` field.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod id;
pub mod memory;
pub mod mongo;
pub mod unavailable;

pub use id::generate_id;
pub use memory::MemoryDocumentStore;
pub use mongo::MongoDocumentStore;
pub use unavailable::UnavailableStore;

/// A stored or to-be-stored JSON object.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {id} not found in {collection}")]
    NotFound { collection: String, id: String },

    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("document store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name reported by the health endpoint.
    fn backend(&self) -> &'static str;

    async fn get_all(&self, collection: &str) -> StoreResult<Vec<Document>>;

    async fn get_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Persist a new document. The store assigns `id`, `createdAt` and
    /// `updatedAt`; caller-supplied values for them are discarded.
    async fn create(&self, collection: &str, document: Document) -> StoreResult<Document>;

    /// Merge `document` into an existing one and refresh `updatedAt`.
    /// `id` and `createdAt` are never overwritten.
    async fn update(&self, collection: &str, id: &str, document: Document) -> StoreResult<Document>;

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
}

/// Drop the fields only the store may set.
pub(crate) fn strip_managed_fields(mut document: Document) -> Document {
    document.remove(ID_FIELD);
    document.remove("_id");
    document.remove(CREATED_AT_FIELD);
    document.remove(UPDATED_AT_FIELD);
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_managed_fields() {
        let input = json!({
            "id": "mine",
            "_id": "also-mine",
            "createdAt": "yesterday",
            "updatedAt": "today",
            "title": "Mate"
        });
        let stripped = strip_managed_fields(input.as_object().cloned().unwrap());

        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped["title"], "Mate");
    }

    #[test]
    fn test_not_found_helper() {
        let err = StoreError::not_found("productos", "abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "document abc not found in productos");
        assert!(!StoreError::Backend("boom".into()).is_not_found());
    }
}
