use serde::{Deserialize, Serialize};
use tandem_store::{Document, StoreError};

/// Fallbacks applied when a search hit is missing optional metadata.
pub const FALLBACK_AUTHOR: &str = "Unknown";
pub const FALLBACK_DESCRIPTION: &str = "No description available";
pub const FALLBACK_COVER: &str = "default-image-url";

/// An owned book in the shared pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Store document id, opaque to callers.
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub image_url: String,
}

/// The persisted portion of a book: everything except the store-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub description: String,
    pub image_url: String,
}

impl Book {
    pub fn with_id(id: String, fields: BookFields) -> Self {
        Self {
            id,
            title: fields.title,
            author: fields.author,
            description: fields.description,
            image_url: fields.image_url,
        }
    }

    pub fn from_document(document: &Document) -> Result<Self, StoreError> {
        let fields: BookFields = document.parse()?;
        Ok(Self::with_id(document.id.clone(), fields))
    }
}

impl From<&Book> for BookFields {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            description: book.description.clone(),
            image_url: book.image_url.clone(),
        }
    }
}

/// Request model for adding an owned book from a search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBookRequest {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl AddBookRequest {
    /// Collapse the hit-shaped input into persistable fields, applying the
    /// same fallbacks the search surface promises.
    pub fn into_fields(self) -> BookFields {
        BookFields {
            title: self.title,
            author: self
                .authors
                .into_iter()
                .next()
                .unwrap_or_else(|| FALLBACK_AUTHOR.to_string()),
            description: self
                .description
                .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string()),
            image_url: self
                .thumbnail_url
                .unwrap_or_else(|| FALLBACK_COVER.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_request_gets_fallbacks() {
        let request = AddBookRequest {
            title: "Roadside Picnic".to_string(),
            authors: vec![],
            description: None,
            thumbnail_url: None,
        };

        let fields = request.into_fields();
        assert_eq!(fields.author, FALLBACK_AUTHOR);
        assert_eq!(fields.description, FALLBACK_DESCRIPTION);
        assert_eq!(fields.image_url, FALLBACK_COVER);
    }

    #[test]
    fn first_author_wins() {
        let request = AddBookRequest {
            title: "Good Omens".to_string(),
            authors: vec!["Terry Pratchett".to_string(), "Neil Gaiman".to_string()],
            description: Some("An angel and a demon.".to_string()),
            thumbnail_url: Some("http://covers/omens.jpg".to_string()),
        };

        let fields = request.into_fields();
        assert_eq!(fields.author, "Terry Pratchett");
        assert_eq!(fields.description, "An angel and a demon.");
    }

    #[test]
    fn book_round_trips_through_document_fields() {
        let book = Book {
            id: "b-1".to_string(),
            title: "Solaris".to_string(),
            author: "Stanislaw Lem".to_string(),
            description: "Ocean planet.".to_string(),
            image_url: "http://covers/solaris.jpg".to_string(),
        };

        let fields = BookFields::from(&book);
        let rebuilt = Book::with_id("b-1".to_string(), fields);
        assert_eq!(rebuilt, book);
    }
}
