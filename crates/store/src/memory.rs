use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::document::Document;
use crate::error::StoreError;
use crate::traits::{merge_patch, DocumentStore};

type Collections = HashMap<String, BTreeMap<String, serde_json::Value>>;

/// In-memory engine used by tests and local runs without durability.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        collections.entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn add(
        &self,
        collection: &str,
        fields: serde_json::Value,
    ) -> Result<String, StoreError> {
        let mut collections = self.collections.lock().await;
        let documents = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::unknown_collection(collection))?;
        let id = Uuid::now_v7().to_string();
        documents.insert(id.clone(), fields);
        Ok(id)
    }

    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.lock().await;
        let documents = collections
            .get(collection)
            .ok_or_else(|| StoreError::unknown_collection(collection))?;
        Ok(documents
            .iter()
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        let documents = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::unknown_collection(collection))?;
        let fields = documents
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        merge_patch(fields, patch)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        let documents = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::unknown_collection(collection))?;
        documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(collection, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn add_then_list_round_trips_fields() {
        let store = MemoryStore::new();
        store.ensure_collection("owned_books").await.unwrap();

        let id = store
            .add("owned_books", json!({"title": "Dune", "author": "Herbert"}))
            .await
            .unwrap();

        let docs = store.list_all("owned_books").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        assert_eq!(docs[0].fields["title"], "Dune");
    }

    #[tokio::test]
    async fn update_merges_top_level_keys() {
        let store = MemoryStore::new();
        store.ensure_collection("assigned_books").await.unwrap();
        let id = store
            .add("assigned_books", json!({"title": "Dune", "completed": false}))
            .await
            .unwrap();

        store
            .update("assigned_books", &id, json!({"completed": true}))
            .await
            .unwrap();

        let docs = store.list_all("assigned_books").await.unwrap();
        assert_eq!(docs[0].fields["completed"], true);
        assert_eq!(docs[0].fields["title"], "Dune");
    }

    #[tokio::test]
    async fn update_rejects_non_object_patch() {
        let store = MemoryStore::new();
        store.ensure_collection("c").await.unwrap();
        let id = store.add("c", json!({})).await.unwrap();

        let err = store.update("c", &id, json!(42)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidPatch));
    }

    #[tokio::test]
    async fn delete_missing_document_is_not_found() {
        let store = MemoryStore::new();
        store.ensure_collection("owned_books").await.unwrap();

        let err = store.delete("owned_books", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unregistered_collection_is_an_error() {
        let store = MemoryStore::new();
        let err = store.list_all("ghosts").await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownCollection { .. }));
    }
}
