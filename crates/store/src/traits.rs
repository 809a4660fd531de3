use async_trait::async_trait;

use crate::document::Document;
use crate::error::StoreError;

/// The persistence contract the application relies on.
///
/// Collections are flat, unordered bags of JSON documents keyed by an
/// engine-assigned opaque id. Every collection must be registered with
/// [`ensure_collection`](DocumentStore::ensure_collection) before use;
/// operations against an unregistered collection fail with
/// [`StoreError::UnknownCollection`].
///
/// Implementations must be `Send + Sync + 'static` so they can live in axum
/// application state and cross async task boundaries.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Register a collection, creating it if it does not exist yet.
    /// Registering an existing collection is a no-op.
    async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError>;

    /// Insert a new document and return its assigned id.
    async fn add(&self, collection: &str, fields: serde_json::Value)
        -> Result<String, StoreError>;

    /// List every document in a collection. Order is not meaningful.
    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Shallow-merge a JSON object patch into an existing document.
    ///
    /// Returns [`StoreError::NotFound`] if the id is unknown and
    /// [`StoreError::InvalidPatch`] if the patch is not a JSON object.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Remove a document. Deleting an unknown id is an error, not a no-op.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Apply a shallow object-merge patch to a document's fields.
///
/// Shared by the bundled engines so they agree on patch semantics.
pub(crate) fn merge_patch(
    fields: &mut serde_json::Value,
    patch: serde_json::Value,
) -> Result<(), StoreError> {
    let serde_json::Value::Object(patch) = patch else {
        return Err(StoreError::InvalidPatch);
    };
    if !fields.is_object() {
        *fields = serde_json::Value::Object(serde_json::Map::new());
    }
    let target = fields
        .as_object_mut()
        .ok_or(StoreError::InvalidPatch)?;
    for (key, value) in patch {
        target.insert(key, value);
    }
    Ok(())
}
