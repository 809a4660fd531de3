//! Book-search collaborator contract for TANDEM.
//!
//! The application depends on [`BookLookup`] only; [`GoogleBooksClient`] is
//! the production implementation against the Google Books volumes API.

mod google;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use google::GoogleBooksClient;

/// A single result returned by a book search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Upstream volume id, opaque to the application.
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Errors surfaced by a lookup backend.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Black-box search contract: a free-text query in, book metadata out.
#[async_trait]
pub trait BookLookup: Send + Sync + 'static {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, LookupError>;
}
