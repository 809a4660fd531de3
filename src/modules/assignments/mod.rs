pub mod countdown;
pub mod models;
pub mod policy;
pub mod service;

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;

use tandem_http::error::AppError;
use tandem_kernel::settings::ParticipantSettings;
use tandem_kernel::{InitCtx, Module};

use crate::modules::ModuleDeps;
use models::{ActiveBook, CompletionLog, Participant};
use service::{
    AssignmentService, CompleteOutcome, CountdownView, DrawOutcome, ExchangeOutcome,
    RotateOutcome, ASSIGNED_BOOKS, COMPLETED_BOOKS,
};

/// Assignments module: the rotation policy engine behind the HTTP surface.
pub struct AssignmentsModule {
    state: AssignmentsState,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Clone)]
struct AssignmentsState {
    service: Arc<AssignmentService>,
    participants: ParticipantSettings,
}

impl AssignmentsModule {
    pub fn new(service: Arc<AssignmentService>, participants: ParticipantSettings) -> Self {
        Self {
            state: AssignmentsState {
                service,
                participants,
            },
            ticker: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Module for AssignmentsModule {
    fn name(&self) -> &'static str {
        "assignments"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.state.service.hydrate().await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "assignments module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(board_overview))
            .route("/draw", post(draw_assignments))
            .route("/rotate", post(rotate_assignments))
            .route("/{participant}/complete/{book_id}", post(complete_book))
            .route("/{participant}/exchange/{book_id}", post(exchange_book))
            .route("/completed", get(completed_books))
            .route("/health", get(health_check))
            .with_state(self.state.clone())
    }

    fn collections(&self) -> &'static [&'static str] {
        &[ASSIGNED_BOOKS, COMPLETED_BOOKS]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let handle = countdown::spawn_ticker(self.state.service.countdown());
        *self.ticker_slot() = Some(handle);
        tracing::info!(module = self.name(), "assignments module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        if let Some(handle) = self.ticker_slot().take() {
            handle.abort();
        }
        tracing::info!(module = self.name(), "assignments module stopped");
        Ok(())
    }
}

impl AssignmentsModule {
    fn ticker_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.ticker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "assignments module is healthy"
}

#[derive(Debug, Serialize)]
struct ParticipantNames {
    a: String,
    b: String,
}

#[derive(Debug, Serialize)]
struct OverviewResponse {
    participants: ParticipantNames,
    a: Vec<ActiveBook>,
    b: Vec<ActiveBook>,
    countdown: Option<CountdownView>,
}

/// Both active lists plus the cycle countdown
async fn board_overview(State(state): State<AssignmentsState>) -> Json<OverviewResponse> {
    let view = state.service.overview().await;
    Json(OverviewResponse {
        participants: ParticipantNames {
            a: state.participants.name_a.clone(),
            b: state.participants.name_b.clone(),
        },
        a: view.a,
        b: view.b,
        countdown: view.countdown,
    })
}

/// Bulk-draw fresh assignments for both readers
async fn draw_assignments(
    State(state): State<AssignmentsState>,
) -> Result<Json<DrawOutcome>, AppError> {
    Ok(Json(state.service.draw().await?))
}

/// Run the rotation check
async fn rotate_assignments(
    State(state): State<AssignmentsState>,
) -> Result<Json<RotateOutcome>, AppError> {
    Ok(Json(state.service.rotate().await?))
}

/// Mark a book completed for one reader
async fn complete_book(
    State(state): State<AssignmentsState>,
    Path((participant, book_id)): Path<(String, String)>,
) -> Result<Json<CompleteOutcome>, AppError> {
    let participant = parse_participant(&participant)?;
    Ok(Json(state.service.complete(participant, &book_id).await?))
}

/// Move a book to the other reader's list
async fn exchange_book(
    State(state): State<AssignmentsState>,
    Path((participant, book_id)): Path<(String, String)>,
) -> Result<Json<ExchangeOutcome>, AppError> {
    let participant = parse_participant(&participant)?;
    Ok(Json(state.service.exchange(participant, &book_id).await?))
}

/// Both completion histories
async fn completed_books(State(state): State<AssignmentsState>) -> Json<CompletionLog> {
    Json(state.service.completed().await)
}

fn parse_participant(value: &str) -> Result<Participant, AppError> {
    Participant::parse(value).ok_or_else(|| {
        AppError::validation(
            vec![json!({"field": "participant", "error": "expected 'a' or 'b'"})],
            format!("unknown participant '{value}'"),
        )
    })
}

fn openapi_fragment() -> serde_json::Value {
    serde_json::json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "Both active lists plus the cycle countdown",
                    "tags": ["Assignments"],
                    "responses": {
                        "200": {
                            "description": "Current board",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/BoardOverview"
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "/draw": {
                "post": {
                    "summary": "Bulk-draw fresh assignments for both readers",
                    "tags": ["Assignments"],
                    "responses": {
                        "200": {
                            "description": "Draw outcome; insufficient_pool when fewer than two books are eligible",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/DrawOutcome"
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "/rotate": {
                "post": {
                    "summary": "Replace finished lists per the rotation policy",
                    "tags": ["Assignments"],
                    "responses": {
                        "200": {
                            "description": "What the rotation changed, if anything",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/RotateOutcome"
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "/{participant}/complete/{book_id}": {
                "post": {
                    "summary": "Mark a book completed",
                    "tags": ["Assignments"],
                    "parameters": [
                        {
                            "name": "participant",
                            "in": "path",
                            "required": true,
                            "schema": {"type": "string", "enum": ["a", "b"]}
                        },
                        {
                            "name": "book_id",
                            "in": "path",
                            "required": true,
                            "schema": {"type": "string"}
                        }
                    ],
                    "responses": {
                        "200": {
                            "description": "completed, or already_completed on a repeat call",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/CompleteOutcome"
                                    }
                                }
                            }
                        },
                        "404": {
                            "description": "Not on that reader's list",
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
            "/{participant}/exchange/{book_id}": {
                "post": {
                    "summary": "Hand an unfinished book to the other reader",
                    "tags": ["Assignments"],
                    "parameters": [
                        {
                            "name": "participant",
                            "in": "path",
                            "required": true,
                            "schema": {"type": "string", "enum": ["a", "b"]}
                        },
                        {
                            "name": "book_id",
                            "in": "path",
                            "required": true,
                            "schema": {"type": "string"}
                        }
                    ],
                    "responses": {
                        "200": {
                            "description": "The book's new owner",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/ExchangeOutcome"
                                    }
                                }
                            }
                        },
                        "409": {
                            "description": "Completed books cannot be exchanged",
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
            "/completed": {
                "get": {
                    "summary": "Both completion histories",
                    "tags": ["Assignments"],
                    "responses": {
                        "200": {
                            "description": "Finished books per reader",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/CompletionLog"
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Assignments health check",
                    "tags": ["Assignments"],
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
                "ActiveBook": {
                    "type": "object",
                    "properties": {
                        "record_id": {"type": "string"},
                        "book": {"$ref": "#/components/schemas/Book"},
                        "completed": {"type": "boolean"}
                    },
                    "required": ["record_id", "book", "completed"]
                },
                "BoardOverview": {
                    "type": "object",
                    "properties": {
                        "participants": {
                            "type": "object",
                            "properties": {
                                "a": {"type": "string"},
                                "b": {"type": "string"}
                            }
                        },
                        "a": {"type": "array", "items": {"$ref": "#/components/schemas/ActiveBook"}},
                        "b": {"type": "array", "items": {"$ref": "#/components/schemas/ActiveBook"}},
                        "countdown": {
                            "type": "object",
                            "nullable": true,
                            "properties": {
                                "remaining_seconds": {"type": "integer"},
                                "display": {"type": "string"}
                            }
                        }
                    }
                },
                "DrawOutcome": {
                    "type": "object",
                    "properties": {
                        "outcome": {"type": "string", "enum": ["assigned", "insufficient_pool"]},
                        "a": {"type": "array", "items": {"$ref": "#/components/schemas/ActiveBook"}},
                        "b": {"type": "array", "items": {"$ref": "#/components/schemas/ActiveBook"}},
                        "countdown_seconds": {"type": "integer"},
                        "available": {"type": "integer"},
                        "required": {"type": "integer"}
                    },
                    "required": ["outcome"]
                },
                "RotateOutcome": {
                    "type": "object",
                    "properties": {
                        "outcome": {
                            "type": "string",
                            "enum": ["redrawn", "insufficient_pool", "refilled", "unchanged"]
                        },
                        "participant": {"type": "string", "enum": ["a", "b"]},
                        "book": {"$ref": "#/components/schemas/ActiveBook"}
                    },
                    "required": ["outcome"]
                },
                "CompleteOutcome": {
                    "type": "object",
                    "properties": {
                        "outcome": {"type": "string", "enum": ["completed", "already_completed"]},
                        "book": {"$ref": "#/components/schemas/ActiveBook"}
                    },
                    "required": ["outcome"]
                },
                "ExchangeOutcome": {
                    "type": "object",
                    "properties": {
                        "moved_to": {"type": "string", "enum": ["a", "b"]},
                        "book": {"$ref": "#/components/schemas/ActiveBook"}
                    },
                    "required": ["moved_to", "book"]
                },
                "CompletionLog": {
                    "type": "object",
                    "properties": {
                        "a": {"type": "array", "items": {"$ref": "#/components/schemas/CompletedBook"}},
                        "b": {"type": "array", "items": {"$ref": "#/components/schemas/CompletedBook"}}
                    }
                },
                "CompletedBook": {
                    "type": "object",
                    "properties": {
                        "record_id": {"type": "string"},
                        "book": {"$ref": "#/components/schemas/Book"},
                        "completed_at": {"type": "integer"}
                    },
                    "required": ["record_id", "book", "completed_at"]
                }
            }
        }
    })
}

/// Create a new instance of the assignments module
pub fn create_module(deps: &ModuleDeps) -> Arc<dyn Module> {
    let service = Arc::new(AssignmentService::new(
        deps.store.clone(),
        deps.settings.rotation.clone(),
    ));
    Arc::new(AssignmentsModule::new(
        service,
        deps.settings.participants.clone(),
    ))
}
