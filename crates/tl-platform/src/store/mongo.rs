//! MongoDB document store
//!
//! Ids live in `_id` and timestamps are BSON datetimes. Documents leaving
//! the store are plain JSON: `_id` becomes `id`, datetimes become RFC 3339
//! strings and object ids become hex.

use super::{
    generate_id, strip_managed_fields, Document, DocumentStore, StoreError, StoreResult,
    CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson};
use futures::TryStreamExt;
use mongodb::{
    options::{ClientOptions, ReturnDocument},
    Client, Collection, Database,
};
use serde_json::Value;
use std::time::Duration;
use tl_config::MongoConfig;
use tracing::info;

const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub struct MongoDocumentStore {
    database: Database,
}

impl MongoDocumentStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Connect and ping the database so a bad URI or an unreachable server
    /// fails at startup instead of at the first request.
    pub async fn connect(config: &MongoConfig) -> StoreResult<Self> {
        let unavailable = |e: mongodb::error::Error| StoreError::Unavailable(e.to_string());

        let mut options = ClientOptions::parse(&config.uri).await.map_err(unavailable)?;
        options.app_name = Some("techlab".to_string());
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);

        let client = Client::with_options(options).map_err(unavailable)?;
        let database = client.database(&config.database);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(unavailable)?;

        info!(database = %config.database, "Connected to MongoDB");
        Ok(Self::new(database))
    }

    fn collection(&self, name: &str) -> Collection<bson::Document> {
        self.database.collection(name)
    }
}

/// Matches string ids and, for documents created outside this service,
/// the equivalent ObjectId.
fn id_filter(id: &str) -> bson::Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": { "$in": [id, oid] } },
        Err(_) => doc! { "_id": id },
    }
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or(Value::Null),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::Document(doc) => Value::Object(
            doc.into_iter()
                .map(|(key, value)| (key, bson_to_json(value)))
                .collect(),
        ),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

fn from_stored(mut stored: bson::Document) -> Document {
    let mut out = Document::new();
    if let Some(id) = stored.remove("_id") {
        out.insert(ID_FIELD.to_string(), bson_to_json(id));
    }
    for (key, value) in stored {
        out.insert(key, bson_to_json(value));
    }
    out
}

fn to_stored(document: Document) -> StoreResult<bson::Document> {
    Ok(bson::to_document(&strip_managed_fields(document))?)
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn get_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await?;
        let docs: Vec<bson::Document> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(from_stored).collect())
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let found = self.collection(collection).find_one(id_filter(id)).await?;
        Ok(found.map(from_stored))
    }

    async fn create(&self, collection: &str, document: Document) -> StoreResult<Document> {
        let id = generate_id();
        let now = bson::DateTime::now();

        let mut stored = doc! { "_id": id.as_str() };
        for (key, value) in to_stored(document)? {
            stored.insert(key, value);
        }
        stored.insert(CREATED_AT_FIELD, now);
        stored.insert(UPDATED_AT_FIELD, now);

        self.collection(collection).insert_one(&stored).await?;
        Ok(from_stored(stored))
    }

    async fn update(&self, collection: &str, id: &str, document: Document) -> StoreResult<Document> {
        let mut fields = to_stored(document)?;
        fields.insert(UPDATED_AT_FIELD, bson::DateTime::now());

        self.collection(collection)
            .find_one_and_update(id_filter(id), doc! { "$set": fields })
            .return_document(ReturnDocument::After)
            .await?
            .map(from_stored)
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let result = self.collection(collection).delete_one(id_filter(id)).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }
}
