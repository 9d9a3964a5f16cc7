//! Note domain model.
//!
//! # Responsibility
//! - Define `Note` plus its opaque identifiers and creation timestamp.
//! - Own the text normalization rule shared by repository and editor.
//! - Define the single display ordering used by every rendered list.
//!
//! # Invariants
//! - Note text is non-empty after trimming.
//! - Display order is `created_at DESC` with `Pending` last, then `seq DESC`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque note identifier assigned by the store on append.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque identifier of the user a note is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned creation time.
///
/// `Pending` covers documents whose server timestamp has not resolved yet (or
/// is malformed). It compares lower than every resolved timestamp, so a
/// descending sort places pending notes last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatedAt {
    Pending,
    /// Unix epoch milliseconds.
    At(i64),
}

impl CreatedAt {
    pub fn epoch_ms(self) -> Option<i64> {
        match self {
            Self::Pending => None,
            Self::At(value) => Some(value),
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// One persisted note as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    /// Trimmed text; newlines are kept as-is.
    pub text: String,
    pub created_at: CreatedAt,
    /// `None` when the store is used as a single shared list.
    pub owner_id: Option<OwnerId>,
    /// Store insertion sequence, used to break `created_at` ties.
    pub seq: u64,
}

impl Note {
    /// Total order used for rendering: newest first, pending last.
    ///
    /// Equal timestamps fall back to insertion sequence (later first) and
    /// finally to the id, so the result never depends on input order.
    pub fn display_order(left: &Note, right: &Note) -> Ordering {
        right
            .created_at
            .cmp(&left.created_at)
            .then_with(|| right.seq.cmp(&left.seq))
            .then_with(|| left.id.cmp(&right.id))
    }

    /// Text split on line breaks for display.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

/// Validation error for note input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteValidationError {
    /// Text is empty or whitespace-only.
    EmptyText,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "note text cannot be empty"),
        }
    }
}

impl Error for NoteValidationError {}

/// Trims note input and rejects blank text.
pub fn normalize_note_text(text: &str) -> Result<String, NoteValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(NoteValidationError::EmptyText);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_note_text, CreatedAt, Note, NoteId, NoteValidationError};

    fn note(id: &str, created_at: CreatedAt, seq: u64) -> Note {
        Note {
            id: NoteId::new(id),
            text: id.to_string(),
            created_at,
            owner_id: None,
            seq,
        }
    }

    #[test]
    fn normalize_trims_and_keeps_inner_newlines() {
        let text = normalize_note_text("  line one\nline two \n").unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn normalize_rejects_blank_input() {
        assert_eq!(
            normalize_note_text(""),
            Err(NoteValidationError::EmptyText)
        );
        assert_eq!(
            normalize_note_text(" \t\n "),
            Err(NoteValidationError::EmptyText)
        );
    }

    #[test]
    fn pending_sorts_below_resolved_timestamps() {
        assert!(CreatedAt::Pending < CreatedAt::At(i64::MIN));
        assert!(CreatedAt::At(1) < CreatedAt::At(2));
    }

    #[test]
    fn display_order_is_newest_first_with_pending_last() {
        let mut notes = vec![
            note("pending", CreatedAt::Pending, 9),
            note("old", CreatedAt::At(100), 1),
            note("new", CreatedAt::At(300), 3),
            note("mid", CreatedAt::At(200), 2),
        ];
        notes.sort_by(Note::display_order);
        let ids: Vec<_> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old", "pending"]);
    }

    #[test]
    fn display_order_breaks_ties_by_insertion_sequence() {
        let mut notes = vec![
            note("first", CreatedAt::At(500), 1),
            note("third", CreatedAt::At(500), 3),
            note("second", CreatedAt::At(500), 2),
        ];
        notes.sort_by(Note::display_order);
        let ids: Vec<_> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["third", "second", "first"]);
    }
}
