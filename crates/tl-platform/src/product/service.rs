//! Product Service
//!
//! Business rules over the document store. Input is validated before any
//! storage call, so a rejected request never reaches the store.

use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::entity::{NewProduct, Product};
use crate::shared::error::{AppError, Result};
use crate::store::{Document, DocumentStore, StoreError};

pub const DEFAULT_COLLECTION: &str = "productos";

pub struct ProductService {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

fn product_not_found(id: &str) -> AppError {
    AppError::not_found(format!("Producto con ID {} no encontrado", id))
}

/// Keep `NotFound` specific; everything else is an internal failure with
/// the store's message as detail.
fn classify(err: StoreError, id: Option<&str>, context: &str) -> AppError {
    match (err, id) {
        (StoreError::NotFound { .. }, Some(id)) => product_not_found(id),
        (err, _) => AppError::internal_with_detail(context, err),
    }
}

fn decode(document: Document, context: &str) -> Result<Product> {
    Product::from_document(document).map_err(|e| AppError::internal_with_detail(context, e))
}

impl ProductService {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn list(&self) -> Result<Vec<Product>> {
        const CONTEXT: &str = "Error al obtener productos desde el servicio de datos";

        let documents = self
            .store
            .get_all(&self.collection)
            .await
            .map_err(|e| classify(e, None, CONTEXT))?;

        documents
            .into_iter()
            .map(|document| decode(document, CONTEXT))
            .collect()
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Product> {
        const CONTEXT: &str = "Error al obtener el producto desde el servicio de datos";

        let document = self
            .store
            .get_by_id(&self.collection, id)
            .await
            .map_err(|e| classify(e, Some(id), CONTEXT))?
            .ok_or_else(|| product_not_found(id))?;
        decode(document, CONTEXT)
    }

    pub async fn create(&self, input: &Value) -> Result<Product> {
        const CONTEXT: &str = "Error al crear el producto en el servicio de datos";

        let product = NewProduct::from_json(input)?;
        let stored = self
            .store
            .create(&self.collection, product.into_document())
            .await
            .map_err(|e| classify(e, None, CONTEXT))?;

        let product = decode(stored, CONTEXT)?;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Replace the caller-owned fields of an existing product. The id,
    /// rating and creation time are kept.
    pub async fn update(&self, id: &str, input: &Value) -> Result<Product> {
        const CONTEXT: &str = "Error al actualizar el producto en el servicio de datos";

        let product = NewProduct::from_json(input)?;
        self.get_by_id(id).await?;

        let stored = self
            .store
            .update(&self.collection, id, product.into_fields())
            .await
            .map_err(|e| classify(e, Some(id), CONTEXT))?;

        let product = decode(stored, CONTEXT)?;
        info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.get_by_id(id).await?;

        self.store
            .delete(&self.collection, id)
            .await
            .map_err(|e| classify(e, Some(id), "Error al eliminar el producto del servicio de datos"))?;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::ErrorKind;
    use crate::store::{MemoryDocumentStore, UnavailableStore};
    use serde_json::json;

    fn service() -> ProductService {
        ProductService::new(Arc::new(MemoryDocumentStore::new()), DEFAULT_COLLECTION)
    }

    fn mate() -> Value {
        json!({
            "title": "Mate",
            "price": 12.5,
            "category": "bazar",
            "description": "Calabaza curada"
        })
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let products = service();
        let created = products.create(&mate()).await.unwrap();

        assert_eq!(created.id.len(), 13);
        assert_eq!(created.rating.rate, 0.0);
        assert_eq!(created.rating.count, 0);
        assert_eq!(created.image, "");
        assert!(created.created_at.is_some());

        let fetched = products.get_by_id(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_list() {
        let products = service();
        assert!(products.list().await.unwrap().is_empty());

        products.create(&mate()).await.unwrap();
        products.create(&mate()).await.unwrap();
        assert_eq!(products.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_document_fails_list() {
        let store = Arc::new(MemoryDocumentStore::new());
        let stored = store
            .create(
                DEFAULT_COLLECTION,
                json!({"title": "Termo", "category": "bazar"})
                    .as_object()
                    .unwrap()
                    .clone(),
            )
            .await
            .unwrap();
        let products = ProductService::new(store, DEFAULT_COLLECTION);

        let err = products.list().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "Error al obtener productos desde el servicio de datos");
        assert!(err.detail().is_some());

        let id = stored[crate::store::ID_FIELD].as_str().unwrap();
        assert_eq!(products.get_by_id(id).await.unwrap_err().kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_list_accepts_integral_double_count() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .create(
                DEFAULT_COLLECTION,
                json!({
                    "title": "Termo",
                    "price": 30,
                    "category": "bazar",
                    "rating": {"rate": 3.9, "count": 120.0}
                })
                .as_object()
                .unwrap()
                .clone(),
            )
            .await
            .unwrap();
        let products = ProductService::new(store, DEFAULT_COLLECTION);

        let listed = products.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].rating.count, 120);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let err = service().get_by_id("nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Producto con ID nope no encontrado");
    }

    #[tokio::test]
    async fn test_delete_is_not_repeatable() {
        let products = service();
        let created = products.create(&mate()).await.unwrap();

        products.delete(&created.id).await.unwrap();
        let err = products.delete(&created.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(products.get_by_id(&created.id).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_keeps_identity_and_rating() {
        let products = service();
        let created = products.create(&mate()).await.unwrap();

        let updated = products
            .update(
                &created.id,
                &json!({"title": "Mate imperial", "price": 40, "category": "bazar"}),
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "Mate imperial");
        assert_eq!(updated.price, 40.0);
        assert_eq!(updated.description, "");
        assert_eq!(updated.rating, created.rating);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_update_validates_and_checks_existence() {
        let products = service();
        assert_eq!(
            products.update("nope", &mate()).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            products.update("nope", &json!({})).await.unwrap_err().kind(),
            ErrorKind::ValidationError
        );
    }

    #[tokio::test]
    async fn test_storage_failure_is_internal() {
        let products = ProductService::new(Arc::new(UnavailableStore::new("down")), DEFAULT_COLLECTION);

        let err = products.list().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "Error al obtener productos desde el servicio de datos");
        assert_eq!(err.detail(), Some("document store unavailable: down"));

        assert_eq!(products.delete("x").await.unwrap_err().kind(), ErrorKind::Internal);
        assert_eq!(products.create(&mate()).await.unwrap_err().kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_invalid_create_is_rejected() {
        let products = ProductService::new(Arc::new(UnavailableStore::new("down")), DEFAULT_COLLECTION);
        // Validation runs first, so the unavailable store is never reached.
        let err = products.create(&json!({"title": "x"})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }
}
