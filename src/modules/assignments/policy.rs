//! Pure assignment policy: which books go to whom, and when to rotate.
//!
//! Every function here works on immutable snapshots plus an injected random
//! source; persistence lives in the service layer. The minimum pool size and
//! the per-reader count come from the caller so the policy itself stays free
//! of configuration.

use rand::seq::SliceRandom;
use rand::Rng;

use super::models::{Board, CompletionLog, Participant};
use crate::modules::library::models::Book;

/// A bulk draw needs at least this many eligible books to mean anything.
pub const MIN_ELIGIBLE: usize = 2;

/// Result of a successful bulk draw.
#[derive(Debug, Clone)]
pub struct Draw {
    pub a: Vec<Book>,
    pub b: Vec<Book>,
}

/// What a rotation check decided to do.
#[derive(Debug, Clone)]
pub enum RotationPlan {
    /// Both sides are done: rebuild both lists from the whole pool.
    Redraw,
    /// One side is done: hand it a single fresh book.
    Refill {
        participant: Participant,
        book: Book,
    },
    /// Someone still has reading to do, or nothing is left to hand out.
    Unchanged,
}

/// Pool books that neither participant has finished.
pub fn eligible_pool<'a>(pool: &'a [Book], log: &CompletionLog) -> Vec<&'a Book> {
    pool.iter().filter(|book| !log.retired(&book.id)).collect()
}

/// Uniformly draw fresh lists for both participants.
///
/// Returns `None` when fewer than [`MIN_ELIGIBLE`] books are eligible. B's
/// list may come up short when the eligible tail runs out; that is not an
/// error. The two lists are disjoint by construction.
pub fn draw(
    pool: &[Book],
    log: &CompletionLog,
    per_reader: usize,
    rng: &mut impl Rng,
) -> Option<Draw> {
    let mut eligible: Vec<Book> = eligible_pool(pool, log).into_iter().cloned().collect();
    if eligible.len() < MIN_ELIGIBLE {
        return None;
    }

    eligible.shuffle(rng);
    let b_end = eligible.len().min(per_reader * 2);
    let mut drawn = eligible;
    drawn.truncate(b_end);
    let b = drawn.split_off(drawn.len().min(per_reader));

    Some(Draw { a: drawn, b })
}

/// Decide what, if anything, rotation should change.
///
/// Checked in strict order: both sides done, then A alone, then B alone.
/// A side with no unfinished book counts as done, so two empty lists
/// trigger the very first draw.
pub fn plan_rotation(
    board: &Board,
    pool: &[Book],
    log: &CompletionLog,
    rng: &mut impl Rng,
) -> RotationPlan {
    let a_done = board.fully_completed(Participant::A);
    let b_done = board.fully_completed(Participant::B);

    match (a_done, b_done) {
        (true, true) => RotationPlan::Redraw,
        (true, false) => refill(Participant::A, board, pool, log, rng),
        (false, true) => refill(Participant::B, board, pool, log, rng),
        (false, false) => RotationPlan::Unchanged,
    }
}

/// Pick one replacement book for a participant whose list is finished.
///
/// Candidates exclude everything either participant ever finished and
/// everything currently on either active list; an empty candidate set
/// leaves the board alone rather than producing a partial assignment.
fn refill(
    participant: Participant,
    board: &Board,
    pool: &[Book],
    log: &CompletionLog,
    rng: &mut impl Rng,
) -> RotationPlan {
    let candidates: Vec<&Book> = pool
        .iter()
        .filter(|book| !log.retired(&book.id) && !board.contains(&book.id))
        .collect();

    match candidates.choose(rng) {
        Some(book) => RotationPlan::Refill {
            participant,
            book: (*book).clone(),
        },
        None => RotationPlan::Unchanged,
    }
}
