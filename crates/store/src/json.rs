use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::document::Document;
use crate::error::StoreError;
use crate::traits::{merge_patch, DocumentStore};

type CollectionMap = BTreeMap<String, serde_json::Value>;

/// Durable engine backed by one JSON file per collection.
///
/// The whole store is cached in memory; every mutation rewrites the owning
/// collection file through a temp-file rename so a crash mid-write never
/// leaves a truncated collection behind.
pub struct JsonStore {
    root: PathBuf,
    collections: Mutex<HashMap<String, CollectionMap>>,
}

impl JsonStore {
    /// Open (or create) a store rooted at `root`, loading any collection
    /// files already present.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let mut collections = HashMap::new();
        let mut entries = tokio::fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = tokio::fs::read(&path).await?;
            let documents: CollectionMap = serde_json::from_slice(&raw)?;
            collections.insert(name.to_string(), documents);
        }

        tracing::debug!(
            root = %root.display(),
            collections = collections.len(),
            "opened json store"
        );

        Ok(Self {
            root,
            collections: Mutex::new(collections),
        })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{collection}.json"))
    }

    async fn persist(&self, collection: &str, documents: &CollectionMap) -> Result<(), StoreError> {
        let path = self.collection_path(collection);
        let tmp = temp_path(&path);
        let payload = serde_json::to_vec_pretty(documents)?;
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[async_trait]
impl DocumentStore for JsonStore {
    async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        if collections.contains_key(collection) {
            return Ok(());
        }
        let documents = CollectionMap::new();
        self.persist(collection, &documents).await?;
        collections.insert(collection.to_string(), documents);
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
        self.persist(collection, documents).await?;
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
        merge_patch(fields, patch)?;
        self.persist(collection, documents).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        let documents = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::unknown_collection(collection))?;
        if documents.remove(id).is_none() {
            return Err(StoreError::not_found(collection, id));
        }
        self.persist(collection, documents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = JsonStore::open(dir.path()).await.unwrap();
        store.ensure_collection("owned_books").await.unwrap();
        let id = store
            .add("owned_books", json!({"title": "Solaris", "author": "Lem"}))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonStore::open(dir.path()).await.unwrap();
        let docs = reopened.list_all("owned_books").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        assert_eq!(docs[0].fields["author"], "Lem");
    }

    #[tokio::test]
    async fn update_persists_merged_fields() {
        let dir = tempfile::tempdir().unwrap();

        let store = JsonStore::open(dir.path()).await.unwrap();
        store.ensure_collection("assigned_books").await.unwrap();
        let id = store
            .add("assigned_books", json!({"assigned_to": "a", "completed": false}))
            .await
            .unwrap();
        store
            .update("assigned_books", &id, json!({"completed": true}))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonStore::open(dir.path()).await.unwrap();
        let docs = reopened.list_all("assigned_books").await.unwrap();
        assert_eq!(docs[0].fields["completed"], true);
        assert_eq!(docs[0].fields["assigned_to"], "a");
    }

    #[tokio::test]
    async fn delete_missing_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();
        store.ensure_collection("owned_books").await.unwrap();

        let err = store.delete("owned_books", "missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();

        store.ensure_collection("owned_books").await.unwrap();
        let id = store.add("owned_books", json!({"title": "X"})).await.unwrap();
        store.ensure_collection("owned_books").await.unwrap();

        let docs = store.list_all("owned_books").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
    }
}
