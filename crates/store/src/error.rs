/// All errors that can be returned by a [`crate::DocumentStore`] engine.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The collection was never registered with `ensure_collection`.
    #[error("collection not registered: {collection}")]
    UnknownCollection { collection: String },

    /// No document with the given id exists in the collection.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// `update` was called with a patch that is not a JSON object.
    #[error("document patch must be a JSON object")]
    InvalidPatch,

    /// A document could not be encoded or decoded.
    #[error("failed to encode or decode a document: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An engine-specific I/O failure (file system, connection, ...).
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn unknown_collection(collection: &str) -> Self {
        Self::UnknownCollection {
            collection: collection.to_string(),
        }
    }
}
