use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A stored document: an engine-assigned id plus its JSON fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: serde_json::Value,
}

impl Document {
    /// Deserialize the document fields into a typed record.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.fields.clone())?)
    }
}
