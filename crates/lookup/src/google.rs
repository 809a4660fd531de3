use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{BookLookup, LookupError, SearchHit};

/// Client for the Google Books volumes endpoint.
pub struct GoogleBooksClient {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleBooksClient {
    /// Build a client against `base_url` (e.g. `https://www.googleapis.com/books/v1`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl BookLookup for GoogleBooksClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, LookupError> {
        let url = format!("{}/volumes", self.base_url.trim_end_matches('/'));
        let response: VolumesResponse = self
            .http
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(query, hits = response.items.len(), "book lookup completed");
        Ok(response.items.into_iter().map(SearchHit::from).collect())
    }
}

// Wire shapes of the volumes payload; only the fields we read.

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: String,
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    description: Option<String>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
}

impl From<Volume> for SearchHit {
    fn from(volume: Volume) -> Self {
        let info = volume.volume_info;
        SearchHit {
            id: volume.id,
            title: info.title,
            authors: info.authors,
            description: info.description,
            thumbnail_url: info.image_links.and_then(|links| links.thumbnail),
        }
    }
}
