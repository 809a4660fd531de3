use std::fmt;

use serde::{Deserialize, Serialize};

use crate::modules::library::models::{Book, BookFields};

/// One of the two fixed readers sharing the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Participant {
    A,
    B,
}

impl Participant {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }

    /// Parse a path segment; accepts either case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "a" => Some(Self::A),
            "b" => Some(Self::B),
            _ => None,
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A book on a participant's active list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveBook {
    /// Id of the backing record in the assignments collection.
    pub record_id: String,
    pub book: Book,
    pub completed: bool,
}

/// Both participants' active lists.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Board {
    pub a: Vec<ActiveBook>,
    pub b: Vec<ActiveBook>,
}

impl Board {
    pub fn side(&self, participant: Participant) -> &[ActiveBook] {
        match participant {
            Participant::A => &self.a,
            Participant::B => &self.b,
        }
    }

    pub fn side_mut(&mut self, participant: Participant) -> &mut Vec<ActiveBook> {
        match participant {
            Participant::A => &mut self.a,
            Participant::B => &mut self.b,
        }
    }

    /// True when the participant has no unfinished book left.
    ///
    /// An empty list counts as fully completed; that is what makes the very
    /// first rotation hand out books.
    pub fn fully_completed(&self, participant: Participant) -> bool {
        self.side(participant).iter().all(|active| active.completed)
    }

    /// True when the book is on either active list.
    pub fn contains(&self, book_id: &str) -> bool {
        self.a
            .iter()
            .chain(self.b.iter())
            .any(|active| active.book.id == book_id)
    }

    pub fn position(&self, participant: Participant, book_id: &str) -> Option<usize> {
        self.side(participant)
            .iter()
            .position(|active| active.book.id == book_id)
    }
}

/// A finished book in a participant's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedBook {
    /// Id of the backing record in the completions collection.
    pub record_id: String,
    pub book: Book,
    pub completed_at: i64,
}

/// Append-only completion histories for both participants.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletionLog {
    pub a: Vec<CompletedBook>,
    pub b: Vec<CompletedBook>,
}

impl CompletionLog {
    pub fn side(&self, participant: Participant) -> &[CompletedBook] {
        match participant {
            Participant::A => &self.a,
            Participant::B => &self.b,
        }
    }

    pub fn side_mut(&mut self, participant: Participant) -> &mut Vec<CompletedBook> {
        match participant {
            Participant::A => &mut self.a,
            Participant::B => &mut self.b,
        }
    }

    /// A book finished by either participant is permanently out of play.
    pub fn retired(&self, book_id: &str) -> bool {
        self.a
            .iter()
            .chain(self.b.iter())
            .any(|completed| completed.book.id == book_id)
    }
}

/// Fields persisted for one entry in the assignments collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedRecord {
    pub book_id: String,
    #[serde(flatten)]
    pub book: BookFields,
    pub assigned_to: Participant,
    pub completed: bool,
    /// Unix seconds; the newest record anchors countdown recovery.
    pub assigned_at: i64,
}

impl AssignedRecord {
    pub fn new(book: &Book, assigned_to: Participant, assigned_at: i64) -> Self {
        Self {
            book_id: book.id.clone(),
            book: BookFields::from(book),
            assigned_to,
            completed: false,
            assigned_at,
        }
    }
}

/// Fields persisted for one entry in the completions collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedRecord {
    pub book_id: String,
    #[serde(flatten)]
    pub book: BookFields,
    pub completed_by: Participant,
    pub completed_at: i64,
}

impl CompletedRecord {
    pub fn new(book: &Book, completed_by: Participant, completed_at: i64) -> Self {
        Self {
            book_id: book.id.clone(),
            book: BookFields::from(book),
            completed_by,
            completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: &str) -> Book {
        Book {
            id: id.to_string(),
            title: format!("Book {id}"),
            author: "Author".to_string(),
            description: "".to_string(),
            image_url: "".to_string(),
        }
    }

    fn active(id: &str, completed: bool) -> ActiveBook {
        ActiveBook {
            record_id: format!("rec-{id}"),
            book: book(id),
            completed,
        }
    }

    #[test]
    fn participant_parse_accepts_either_case() {
        assert_eq!(Participant::parse("a"), Some(Participant::A));
        assert_eq!(Participant::parse("B"), Some(Participant::B));
        assert_eq!(Participant::parse("c"), None);
    }

    #[test]
    fn participant_serializes_as_lowercase_tag() {
        assert_eq!(
            serde_json::to_value(Participant::A).unwrap(),
            serde_json::json!("a")
        );
    }

    #[test]
    fn empty_side_counts_as_fully_completed() {
        let board = Board::default();
        assert!(board.fully_completed(Participant::A));
        assert!(board.fully_completed(Participant::B));
    }

    #[test]
    fn unfinished_book_blocks_full_completion() {
        let mut board = Board::default();
        board.a.push(active("1", true));
        board.a.push(active("2", false));
        assert!(!board.fully_completed(Participant::A));
    }

    #[test]
    fn retired_spans_both_histories() {
        let mut log = CompletionLog::default();
        log.b.push(CompletedBook {
            record_id: "c-1".to_string(),
            book: book("9"),
            completed_at: 0,
        });
        assert!(log.retired("9"));
        assert!(!log.retired("8"));
    }

    #[test]
    fn assigned_record_flattens_book_fields() {
        let record = AssignedRecord::new(&book("7"), Participant::B, 1234);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["book_id"], "7");
        assert_eq!(value["title"], "Book 7");
        assert_eq!(value["assigned_to"], "b");
        assert_eq!(value["completed"], false);
    }
}
