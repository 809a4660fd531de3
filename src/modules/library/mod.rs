pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use tandem_http::error::AppError;
use tandem_kernel::{InitCtx, Module};
use tandem_lookup::{BookLookup, SearchHit};
use tandem_store::DocumentStore;

use crate::modules::ModuleDeps;
use models::{AddBookRequest, Book};

/// Collection holding the shared pool of owned books.
pub const OWNED_BOOKS: &str = "owned_books";

/// Library module: the shared pool of owned books plus search.
pub struct LibraryModule {
    state: LibraryState,
}

#[derive(Clone)]
struct LibraryState {
    store: Arc<dyn DocumentStore>,
    lookup: Arc<dyn BookLookup>,
}

impl LibraryModule {
    pub fn new(store: Arc<dyn DocumentStore>, lookup: Arc<dyn BookLookup>) -> Self {
        Self {
            state: LibraryState { store, lookup },
        }
    }
}

#[async_trait]
impl Module for LibraryModule {
    fn name(&self) -> &'static str {
        "library"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "library module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_books).post(add_book))
            .route("/{id}", delete(delete_book))
            .route("/search", get(search_books))
            .route("/health", get(health_check))
            .with_state(self.state.clone())
    }

    fn collections(&self) -> &'static [&'static str] {
        &[OWNED_BOOKS]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "library module stopped");
        Ok(())
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "library module is healthy"
}

/// List every book in the shared pool
async fn list_books(State(state): State<LibraryState>) -> Result<Json<Vec<Book>>, AppError> {
    let documents = state.store.list_all(OWNED_BOOKS).await?;
    let mut books = Vec::with_capacity(documents.len());
    for document in &documents {
        books.push(Book::from_document(document)?);
    }
    Ok(Json(books))
}

/// Add an owned book from search-hit-shaped input
async fn add_book(
    State(state): State<LibraryState>,
    Json(request): Json<AddBookRequest>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    if request.title.trim().is_empty() {
        return Err(AppError::validation(
            vec![json!({"field": "title", "error": "required"})],
            "a book needs a title",
        ));
    }

    let fields = request.into_fields();

    // Same guard the reading-list UI applies: one pool entry per edition.
    let existing = state.store.list_all(OWNED_BOOKS).await?;
    for document in &existing {
        let book = Book::from_document(document)?;
        if book.title == fields.title && book.author == fields.author {
            return Err(AppError::conflict(
                vec![json!({"field": "title", "error": "duplicate"})],
                format!("'{}' by {} is already in the pool", book.title, book.author),
            ));
        }
    }

    let payload = serde_json::to_value(&fields).map_err(tandem_store::StoreError::from)?;
    let id = state.store.add(OWNED_BOOKS, payload).await?;
    tracing::info!(book = %fields.title, id = %id, "added owned book");

    Ok((StatusCode::CREATED, Json(Book::with_id(id, fields))))
}

/// Remove an owned book from the pool
async fn delete_book(
    State(state): State<LibraryState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete(OWNED_BOOKS, &id).await?;
    tracing::info!(id = %id, "deleted owned book");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
}

/// Search the lookup collaborator for candidate books
async fn search_books(
    State(state): State<LibraryState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, AppError> {
    if params.q.trim().is_empty() {
        return Err(AppError::validation(
            vec![json!({"field": "q", "error": "required"})],
            "search query must not be empty",
        ));
    }

    let hits = state.lookup.search(&params.q).await?;
    Ok(Json(hits))
}

fn openapi_fragment() -> serde_json::Value {
    serde_json::json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List owned books",
                    "tags": ["Library"],
                    "responses": {
                        "200": {
                            "description": "The shared pool",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": {
                                            "$ref": "#/components/schemas/Book"
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "post": {
                    "summary": "Add an owned book",
                    "tags": ["Library"],
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": {
                                    "$ref": "#/components/schemas/AddBookRequest"
                                }
                            }
                        }
                    },
                    "responses": {
                        "201": {
                            "description": "Book added to the pool",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/Book"
                                    }
                                }
                            }
                        },
                        "409": {
                            "description": "Already in the pool",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/ErrorResponse"
                                    }
                                }
                            }
                        },
                        "422": {
                            "description": "Missing title",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/ErrorResponse"
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "/{id}": {
                "delete": {
                    "summary": "Delete an owned book",
                    "tags": ["Library"],
                    "parameters": [{
                        "name": "id",
                        "in": "path",
                        "required": true,
                        "schema": {"type": "string"}
                    }],
                    "responses": {
                        "204": {
                            "description": "Deleted"
                        },
                        "404": {
                            "description": "No such book",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/ErrorResponse"
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "/search": {
                "get": {
                    "summary": "Search the book lookup service",
                    "tags": ["Library"],
                    "parameters": [{
                        "name": "q",
                        "in": "query",
                        "required": true,
                        "schema": {"type": "string"}
                    }],
                    "responses": {
                        "200": {
                            "description": "Candidate books",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": {
                                            "$ref": "#/components/schemas/SearchHit"
                                        }
                                    }
                                }
                            }
                        },
                        "502": {
                            "description": "Lookup service unavailable",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/ErrorResponse"
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Library health check",
                    "tags": ["Library"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "text/plain": {
                                    "schema": {"type": "string"}
                                }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string", "description": "Opaque pool id"},
                        "title": {"type": "string"},
                        "author": {"type": "string"},
                        "description": {"type": "string"},
                        "image_url": {"type": "string"}
                    },
                    "required": ["id", "title", "author", "description", "image_url"]
                },
                "AddBookRequest": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"},
                        "authors": {"type": "array", "items": {"type": "string"}},
                        "description": {"type": "string"},
                        "thumbnail_url": {"type": "string"}
                    },
                    "required": ["title"]
                },
                "SearchHit": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "title": {"type": "string"},
                        "authors": {"type": "array", "items": {"type": "string"}},
                        "description": {"type": "string"},
                        "thumbnail_url": {"type": "string"}
                    },
                    "required": ["id", "title", "authors"]
                }
            }
        }
    })
}

/// Create a new instance of the library module
pub fn create_module(deps: &ModuleDeps) -> Arc<dyn Module> {
    Arc::new(LibraryModule::new(deps.store.clone(), deps.lookup.clone()))
}
