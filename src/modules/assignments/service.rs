//! Assignment engine service.
//!
//! Owns the single-writer in-memory state (board, completion log, random
//! source) behind one async mutex and funnels every persistence effect
//! through the injected document store. Store first, memory second: a failed
//! write surfaces as an error and leaves the in-memory view untouched.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;

use tandem_kernel::settings::RotationSettings;
use tandem_store::{DocumentStore, StoreError};

use super::countdown::{format_remaining, Countdown};
use super::models::{
    ActiveBook, AssignedRecord, Board, CompletedBook, CompletedRecord, CompletionLog, Participant,
};
use super::policy::{self, RotationPlan, MIN_ELIGIBLE};
use crate::modules::library::models::Book;
use crate::modules::library::OWNED_BOOKS;

/// Collection holding the current cycle's assignments.
pub const ASSIGNED_BOOKS: &str = "assigned_books";
/// Collection holding the permanent completion histories.
pub const COMPLETED_BOOKS: &str = "completed_books";

/// Errors surfaced by assignment operations.
#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("book {book_id} is not on reader {participant}'s active list")]
    NotAssigned {
        participant: Participant,
        book_id: String,
    },

    #[error("book {book_id} is completed; completed books cannot be exchanged")]
    CompletedBookExchange { book_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AssignmentError> for tandem_http::error::AppError {
    fn from(err: AssignmentError) -> Self {
        use tandem_http::error::AppError;
        match err {
            e @ AssignmentError::NotAssigned { .. } => AppError::not_found(e.to_string()),
            e @ AssignmentError::CompletedBookExchange { .. } => {
                AppError::conflict(vec![], e.to_string())
            }
            AssignmentError::Store(e) => e.into(),
        }
    }
}

/// Result of a bulk draw.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DrawOutcome {
    Assigned {
        a: Vec<ActiveBook>,
        b: Vec<ActiveBook>,
        countdown_seconds: i64,
    },
    InsufficientPool {
        available: usize,
        required: usize,
    },
}

/// Result of a rotation check.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RotateOutcome {
    Redrawn {
        a: Vec<ActiveBook>,
        b: Vec<ActiveBook>,
        countdown_seconds: i64,
    },
    InsufficientPool {
        available: usize,
        required: usize,
    },
    Refilled {
        participant: Participant,
        book: ActiveBook,
    },
    Unchanged,
}

/// Result of marking a book completed.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompleteOutcome {
    Completed { book: ActiveBook },
    AlreadyCompleted,
}

/// Result of an exchange.
#[derive(Debug, Serialize)]
pub struct ExchangeOutcome {
    pub moved_to: Participant,
    pub book: ActiveBook,
}

#[derive(Debug, Serialize)]
pub struct CountdownView {
    pub remaining_seconds: i64,
    pub display: String,
}

/// Snapshot of both active lists plus the countdown.
#[derive(Debug, Serialize)]
pub struct BoardView {
    pub a: Vec<ActiveBook>,
    pub b: Vec<ActiveBook>,
    pub countdown: Option<CountdownView>,
}

struct EngineState {
    board: Board,
    log: CompletionLog,
    rng: StdRng,
}

pub struct AssignmentService {
    store: Arc<dyn DocumentStore>,
    rotation: RotationSettings,
    countdown: Countdown,
    state: Mutex<EngineState>,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn DocumentStore>, rotation: RotationSettings) -> Self {
        Self::with_rng(store, rotation, StdRng::from_entropy())
    }

    /// Construct with an explicit random source so tests are deterministic.
    pub fn with_rng(
        store: Arc<dyn DocumentStore>,
        rotation: RotationSettings,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            rotation,
            countdown: Countdown::new(),
            state: Mutex::new(EngineState {
                board: Board::default(),
                log: CompletionLog::default(),
                rng,
            }),
        }
    }

    /// Shared handle for the ticker task.
    pub fn countdown(&self) -> Countdown {
        self.countdown.clone()
    }

    /// Rebuild the in-memory state from the store.
    ///
    /// The countdown is recovered from the newest `assigned_at`, so a
    /// restart mid-cycle resumes roughly where it left off.
    pub async fn hydrate(&self) -> Result<(), AssignmentError> {
        let mut board = Board::default();
        let mut log = CompletionLog::default();
        let mut newest_assigned_at: Option<i64> = None;

        for document in self.store.list_all(ASSIGNED_BOOKS).await? {
            let record: AssignedRecord = document.parse()?;
            newest_assigned_at = newest_assigned_at.max(Some(record.assigned_at));
            board.side_mut(record.assigned_to).push(ActiveBook {
                record_id: document.id,
                book: Book::with_id(record.book_id, record.book),
                completed: record.completed,
            });
        }

        for document in self.store.list_all(COMPLETED_BOOKS).await? {
            let record: CompletedRecord = document.parse()?;
            log.side_mut(record.completed_by).push(CompletedBook {
                record_id: document.id,
                book: Book::with_id(record.book_id, record.book),
                completed_at: record.completed_at,
            });
        }

        if let Some(started) = newest_assigned_at {
            let elapsed = now_unix() - started;
            self.countdown.restart(self.rotation.cycle_seconds() - elapsed);
        }

        tracing::info!(
            active_a = board.a.len(),
            active_b = board.b.len(),
            finished = log.a.len() + log.b.len(),
            "assignment state hydrated"
        );

        let mut state = self.state.lock().await;
        state.board = board;
        state.log = log;
        Ok(())
    }

    pub async fn overview(&self) -> BoardView {
        let state = self.state.lock().await;
        BoardView {
            a: state.board.a.clone(),
            b: state.board.b.clone(),
            countdown: self.countdown_view(),
        }
    }

    pub async fn completed(&self) -> CompletionLog {
        self.state.lock().await.log.clone()
    }

    /// Bulk draw: fresh lists for both participants.
    pub async fn draw(&self) -> Result<DrawOutcome, AssignmentError> {
        let pool = self.load_pool().await?;
        let mut guard = self.state.lock().await;
        self.redraw(&mut guard, &pool).await
    }

    /// Check both lists and rotate per policy.
    pub async fn rotate(&self) -> Result<RotateOutcome, AssignmentError> {
        let pool = self.load_pool().await?;
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let plan = policy::plan_rotation(&state.board, &pool, &state.log, &mut state.rng);
        match plan {
            RotationPlan::Redraw => Ok(match self.redraw(state, &pool).await? {
                DrawOutcome::Assigned {
                    a,
                    b,
                    countdown_seconds,
                } => RotateOutcome::Redrawn {
                    a,
                    b,
                    countdown_seconds,
                },
                DrawOutcome::InsufficientPool {
                    available,
                    required,
                } => RotateOutcome::InsufficientPool {
                    available,
                    required,
                },
            }),
            RotationPlan::Refill { participant, book } => {
                let finished: Vec<String> = state
                    .board
                    .side(participant)
                    .iter()
                    .filter(|active| active.completed)
                    .map(|active| active.record_id.clone())
                    .collect();
                for record_id in &finished {
                    self.store.delete(ASSIGNED_BOOKS, record_id).await?;
                }

                let record = AssignedRecord::new(&book, participant, now_unix());
                let payload = serde_json::to_value(&record).map_err(StoreError::from)?;
                let record_id = self.store.add(ASSIGNED_BOOKS, payload).await?;

                let side = state.board.side_mut(participant);
                side.retain(|active| !active.completed);
                let active = ActiveBook {
                    record_id,
                    book,
                    completed: false,
                };
                side.insert(0, active.clone());

                tracing::info!(
                    participant = %participant,
                    book = %active.book.title,
                    "refilled finished list"
                );
                Ok(RotateOutcome::Refilled { participant, book: active })
            }
            RotationPlan::Unchanged => Ok(RotateOutcome::Unchanged),
        }
    }

    /// Mark a book finished for a participant.
    ///
    /// Idempotent: a book already flagged completed produces no second
    /// history record.
    pub async fn complete(
        &self,
        participant: Participant,
        book_id: &str,
    ) -> Result<CompleteOutcome, AssignmentError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(index) = state.board.position(participant, book_id) else {
            return Err(AssignmentError::NotAssigned {
                participant,
                book_id: book_id.to_string(),
            });
        };
        if state.board.side(participant)[index].completed {
            return Ok(CompleteOutcome::AlreadyCompleted);
        }

        let book = state.board.side(participant)[index].book.clone();
        let record_id = state.board.side(participant)[index].record_id.clone();
        let now = now_unix();

        let record = CompletedRecord::new(&book, participant, now);
        let payload = serde_json::to_value(&record).map_err(StoreError::from)?;
        let completion_id = self.store.add(COMPLETED_BOOKS, payload).await?;
        self.store
            .update(ASSIGNED_BOOKS, &record_id, json!({"completed": true}))
            .await?;

        let active = &mut state.board.side_mut(participant)[index];
        active.completed = true;
        let snapshot = active.clone();
        state.log.side_mut(participant).push(CompletedBook {
            record_id: completion_id,
            book,
            completed_at: now,
        });

        tracing::info!(
            participant = %participant,
            book = %snapshot.book.title,
            "marked book completed"
        );
        Ok(CompleteOutcome::Completed { book: snapshot })
    }

    /// Hand a not-yet-finished book to the other participant.
    pub async fn exchange(
        &self,
        participant: Participant,
        book_id: &str,
    ) -> Result<ExchangeOutcome, AssignmentError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(index) = state.board.position(participant, book_id) else {
            return Err(AssignmentError::NotAssigned {
                participant,
                book_id: book_id.to_string(),
            });
        };
        if state.board.side(participant)[index].completed {
            return Err(AssignmentError::CompletedBookExchange {
                book_id: book_id.to_string(),
            });
        }

        let other = participant.other();
        let record_id = state.board.side(participant)[index].record_id.clone();
        self.store
            .update(
                ASSIGNED_BOOKS,
                &record_id,
                json!({"assigned_to": other.tag(), "completed": false}),
            )
            .await?;

        let mut moved = state.board.side_mut(participant).remove(index);
        moved.completed = false;
        state.board.side_mut(other).push(moved.clone());

        tracing::info!(
            from = %participant,
            to = %other,
            book = %moved.book.title,
            "exchanged book"
        );
        Ok(ExchangeOutcome {
            moved_to: other,
            book: moved,
        })
    }

    async fn redraw(
        &self,
        state: &mut EngineState,
        pool: &[Book],
    ) -> Result<DrawOutcome, AssignmentError> {
        let drawn = policy::draw(
            pool,
            &state.log,
            self.rotation.books_per_reader,
            &mut state.rng,
        );
        let Some(drawn) = drawn else {
            let available = policy::eligible_pool(pool, &state.log).len();
            tracing::info!(
                available,
                required = MIN_ELIGIBLE,
                "not enough eligible books to draw"
            );
            return Ok(DrawOutcome::InsufficientPool {
                available,
                required: MIN_ELIGIBLE,
            });
        };

        // Retire the previous cycle's records before writing the new ones;
        // the in-memory board only advances after every write lands.
        for stale in state.board.a.iter().chain(state.board.b.iter()) {
            self.store.delete(ASSIGNED_BOOKS, &stale.record_id).await?;
        }

        let now = now_unix();
        let mut next = Board::default();
        for (participant, books) in [(Participant::A, &drawn.a), (Participant::B, &drawn.b)] {
            for book in books {
                let record = AssignedRecord::new(book, participant, now);
                let payload = serde_json::to_value(&record).map_err(StoreError::from)?;
                let record_id = self.store.add(ASSIGNED_BOOKS, payload).await?;
                next.side_mut(participant).push(ActiveBook {
                    record_id,
                    book: book.clone(),
                    completed: false,
                });
            }
        }

        state.board = next;
        let cycle = self.rotation.cycle_seconds();
        self.countdown.restart(cycle);

        tracing::info!(
            a = state.board.a.len(),
            b = state.board.b.len(),
            "drew fresh assignments"
        );
        Ok(DrawOutcome::Assigned {
            a: state.board.a.clone(),
            b: state.board.b.clone(),
            countdown_seconds: cycle,
        })
    }

    async fn load_pool(&self) -> Result<Vec<Book>, AssignmentError> {
        let documents = self.store.list_all(OWNED_BOOKS).await?;
        let mut pool = Vec::with_capacity(documents.len());
        for document in &documents {
            pool.push(Book::from_document(document)?);
        }
        Ok(pool)
    }

    fn countdown_view(&self) -> Option<CountdownView> {
        self.countdown.remaining().map(|remaining_seconds| CountdownView {
            remaining_seconds,
            display: format_remaining(remaining_seconds),
        })
    }
}

fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tandem_store::{Document, MemoryStore};

    async fn store_with_books(count: usize) -> Arc<dyn DocumentStore> {
        let store = MemoryStore::new();
        prepare(&store, count).await;
        Arc::new(store)
    }

    async fn prepare(store: &dyn DocumentStore, count: usize) {
        store.ensure_collection(OWNED_BOOKS).await.unwrap();
        store.ensure_collection(ASSIGNED_BOOKS).await.unwrap();
        store.ensure_collection(COMPLETED_BOOKS).await.unwrap();
        for index in 0..count {
            store
                .add(
                    OWNED_BOOKS,
                    serde_json::json!({
                        "title": format!("Book {index}"),
                        "author": "Author",
                        "description": "",
                        "image_url": "",
                    }),
                )
                .await
                .unwrap();
        }
    }

    fn service(store: Arc<dyn DocumentStore>, seed: u64) -> AssignmentService {
        AssignmentService::with_rng(
            store,
            RotationSettings::default(),
            StdRng::seed_from_u64(seed),
        )
    }

    fn ids(books: &[ActiveBook]) -> Vec<String> {
        books.iter().map(|active| active.book.id.clone()).collect()
    }

    #[tokio::test]
    async fn draw_assigns_two_disjoint_pairs_and_persists() {
        let store = store_with_books(6).await;
        let engine = service(store.clone(), 1);

        let outcome = engine.draw().await.unwrap();
        let DrawOutcome::Assigned {
            a,
            b,
            countdown_seconds,
        } = outcome
        else {
            panic!("expected a full draw");
        };

        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);
        assert_eq!(countdown_seconds, 30 * 24 * 60 * 60);
        for left in &a {
            assert!(b.iter().all(|right| right.book.id != left.book.id));
        }
        assert_eq!(store.list_all(ASSIGNED_BOOKS).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn draw_without_enough_books_changes_nothing() {
        let store = store_with_books(1).await;
        let engine = service(store.clone(), 1);

        let outcome = engine.draw().await.unwrap();
        assert!(matches!(
            outcome,
            DrawOutcome::InsufficientPool { available: 1, .. }
        ));

        let view = engine.overview().await;
        assert!(view.a.is_empty());
        assert!(view.b.is_empty());
        assert!(view.countdown.is_none());
        assert!(store.list_all(ASSIGNED_BOOKS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn redraw_retires_previous_cycle_records() {
        let store = store_with_books(8).await;
        let engine = service(store.clone(), 3);

        engine.draw().await.unwrap();
        engine.draw().await.unwrap();

        assert_eq!(store.list_all(ASSIGNED_BOOKS).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn complete_is_idempotent() {
        let store = store_with_books(6).await;
        let engine = service(store.clone(), 5);

        engine.draw().await.unwrap();
        let view = engine.overview().await;
        let target = view.a[0].book.id.clone();

        let first = engine.complete(Participant::A, &target).await.unwrap();
        assert!(matches!(first, CompleteOutcome::Completed { .. }));

        let second = engine.complete(Participant::A, &target).await.unwrap();
        assert!(matches!(second, CompleteOutcome::AlreadyCompleted));

        assert_eq!(store.list_all(COMPLETED_BOOKS).await.unwrap().len(), 1);
        assert_eq!(engine.completed().await.a.len(), 1);
    }

    #[tokio::test]
    async fn complete_flags_the_persisted_record() {
        let store = store_with_books(4).await;
        let engine = service(store.clone(), 5);

        engine.draw().await.unwrap();
        let view = engine.overview().await;
        let target = view.b[0].clone();

        engine.complete(Participant::B, &target.book.id).await.unwrap();

        let records = store.list_all(ASSIGNED_BOOKS).await.unwrap();
        let record: &Document = records
            .iter()
            .find(|document| document.id == target.record_id)
            .unwrap();
        assert_eq!(record.fields["completed"], true);
    }

    #[tokio::test]
    async fn complete_unassigned_book_is_an_error() {
        let store = store_with_books(4).await;
        let engine = service(store, 5);
        engine.draw().await.unwrap();

        let err = engine.complete(Participant::A, "nope").await.unwrap_err();
        assert!(matches!(err, AssignmentError::NotAssigned { .. }));
    }

    #[tokio::test]
    async fn rotate_with_mixed_progress_is_unchanged() {
        let store = store_with_books(6).await;
        let engine = service(store, 7);

        engine.draw().await.unwrap();
        let view = engine.overview().await;
        engine
            .complete(Participant::A, &view.a[0].book.id)
            .await
            .unwrap();

        let outcome = engine.rotate().await.unwrap();
        assert!(matches!(outcome, RotateOutcome::Unchanged));
    }

    #[tokio::test]
    async fn rotate_refills_a_finished_side_only() {
        let store = store_with_books(6).await;
        let engine = service(store.clone(), 9);

        engine.draw().await.unwrap();
        let before = engine.overview().await;
        for active in &before.a {
            engine.complete(Participant::A, &active.book.id).await.unwrap();
        }

        let outcome = engine.rotate().await.unwrap();
        let RotateOutcome::Refilled { participant, book } = outcome else {
            panic!("expected a refill");
        };
        assert_eq!(participant, Participant::A);
        assert!(!book.completed);

        let after = engine.overview().await;
        // The other reader's list is untouched.
        assert_eq!(ids(&after.b), ids(&before.b));
        // The refilled list leads with the new book and drops the finished ones.
        assert_eq!(after.a[0].book.id, book.book.id);
        assert!(after.a.iter().all(|active| !active.completed));
        // The new book is neither finished history nor the other side's.
        assert!(engine.completed().await.a.iter().all(|done| done.book.id != book.book.id));
        assert!(ids(&after.b).iter().all(|id| *id != book.book.id));
    }

    #[tokio::test]
    async fn rotate_redraws_when_everyone_is_done() {
        let store = store_with_books(8).await;
        let engine = service(store.clone(), 11);

        engine.draw().await.unwrap();
        let view = engine.overview().await;
        for active in view.a.iter() {
            engine.complete(Participant::A, &active.book.id).await.unwrap();
        }
        for active in view.b.iter() {
            engine.complete(Participant::B, &active.book.id).await.unwrap();
        }

        let outcome = engine.rotate().await.unwrap();
        let RotateOutcome::Redrawn { a, b, .. } = outcome else {
            panic!("expected a redraw");
        };

        let log = engine.completed().await;
        for active in a.iter().chain(b.iter()) {
            assert!(!log.retired(&active.book.id));
            assert!(!active.completed);
        }
        // History survives the redraw.
        assert_eq!(log.a.len() + log.b.len(), 4);
    }

    #[tokio::test]
    async fn exchange_round_trip_restores_membership() {
        let store = store_with_books(6).await;
        let engine = service(store.clone(), 13);

        engine.draw().await.unwrap();
        let before = engine.overview().await;
        let target = before.a[0].book.id.clone();

        let out = engine.exchange(Participant::A, &target).await.unwrap();
        assert_eq!(out.moved_to, Participant::B);
        assert!(!out.book.completed);

        let back = engine.exchange(Participant::B, &target).await.unwrap();
        assert_eq!(back.moved_to, Participant::A);

        let after = engine.overview().await;
        let mut before_a = ids(&before.a);
        let mut after_a = ids(&after.a);
        before_a.sort();
        after_a.sort();
        assert_eq!(before_a, after_a);
        assert_eq!(ids(&before.b), ids(&after.b));
    }

    #[tokio::test]
    async fn exchange_persists_the_new_owner() {
        let store = store_with_books(4).await;
        let engine = service(store.clone(), 13);

        engine.draw().await.unwrap();
        let view = engine.overview().await;
        let target = view.a[0].clone();

        engine.exchange(Participant::A, &target.book.id).await.unwrap();

        let records = store.list_all(ASSIGNED_BOOKS).await.unwrap();
        let record = records
            .iter()
            .find(|document| document.id == target.record_id)
            .unwrap();
        assert_eq!(record.fields["assigned_to"], "b");
    }

    #[tokio::test]
    async fn exchange_of_completed_book_is_rejected() {
        let store = store_with_books(4).await;
        let engine = service(store, 13);

        engine.draw().await.unwrap();
        let view = engine.overview().await;
        let target = view.a[0].book.id.clone();
        engine.complete(Participant::A, &target).await.unwrap();

        let err = engine.exchange(Participant::A, &target).await.unwrap_err();
        assert!(matches!(err, AssignmentError::CompletedBookExchange { .. }));
    }

    #[tokio::test]
    async fn hydrate_restores_board_history_and_countdown() {
        let store = store_with_books(6).await;
        let engine = service(store.clone(), 17);

        engine.draw().await.unwrap();
        let view = engine.overview().await;
        engine
            .complete(Participant::B, &view.b[0].book.id)
            .await
            .unwrap();

        let restarted = service(store, 18);
        restarted.hydrate().await.unwrap();

        let restored = engine.overview().await;
        let fresh = restarted.overview().await;
        let mut restored_ids: Vec<String> = ids(&restored.a)
            .into_iter()
            .chain(ids(&restored.b))
            .collect();
        let mut fresh_ids: Vec<String> =
            ids(&fresh.a).into_iter().chain(ids(&fresh.b)).collect();
        restored_ids.sort();
        fresh_ids.sort();
        assert_eq!(restored_ids, fresh_ids);

        assert_eq!(restarted.completed().await.b.len(), 1);

        let countdown = fresh.countdown.expect("countdown recovers from assigned_at");
        assert!(countdown.remaining_seconds > 0);
        assert!(countdown.remaining_seconds <= 30 * 24 * 60 * 60);
    }

    /// Delegates to a memory store but fails inserts on demand.
    struct FlakyStore {
        inner: MemoryStore,
        fail_adds: AtomicBool,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
            self.inner.ensure_collection(collection).await
        }

        async fn add(
            &self,
            collection: &str,
            fields: serde_json::Value,
        ) -> Result<String, StoreError> {
            if self.fail_adds.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("injected failure")));
            }
            self.inner.add(collection, fields).await
        }

        async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
            self.inner.list_all(collection).await
        }

        async fn update(
            &self,
            collection: &str,
            id: &str,
            patch: serde_json::Value,
        ) -> Result<(), StoreError> {
            self.inner.update(collection, id, patch).await
        }

        async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
            self.inner.delete(collection, id).await
        }
    }

    #[tokio::test]
    async fn store_failure_leaves_memory_unchanged() {
        let flaky = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_adds: AtomicBool::new(false),
        });
        prepare(flaky.as_ref(), 4).await;
        let store: Arc<dyn DocumentStore> = flaky.clone();
        let engine = service(store, 19);

        engine.draw().await.unwrap();
        let view = engine.overview().await;
        let target = view.a[0].book.id.clone();

        flaky.fail_adds.store(true, Ordering::SeqCst);
        let err = engine.complete(Participant::A, &target).await.unwrap_err();
        assert!(matches!(err, AssignmentError::Store(_)));

        // The failed write advanced nothing: the book is still unfinished
        // and the history is empty.
        let after = engine.overview().await;
        assert!(after.a.iter().all(|active| !active.completed));
        assert!(engine.completed().await.a.is_empty());
    }
}
