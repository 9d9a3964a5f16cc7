//! Compose-box controller.
//!
//! # Responsibility
//! - Own the draft text and its character counter.
//! - Validate locally, then hand the draft to `NoteRepository::create`.
//!
//! # Invariants
//! - Blank drafts never reach the repository.
//! - The draft is cleared only after the store accepted the note.
//! - The soft character limit is display feedback, never a hard cap.

use crate::controller::notification::{
    Notification, MSG_EMPTY_NOTE, MSG_NOTE_SAVED, MSG_SAVE_FAILED,
};
use crate::model::note::{normalize_note_text, NoteId};
use crate::repo::note_repo::{NoteRepository, RepoError};
use log::warn;

/// Character count above which the counter is highlighted.
pub const DEFAULT_SOFT_CHAR_LIMIT: usize = 1000;

/// Character counter shown under the compose box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCounter {
    pub count: usize,
    pub over_soft_limit: bool,
}

impl CharCounter {
    pub fn label(&self) -> String {
        format!("{} characters", self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(NoteId),
    /// Draft was blank; no store call was made.
    Rejected,
    /// Store failed; draft is kept for retry.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub outcome: SaveOutcome,
    pub notification: Notification,
}

/// Compose-box state and save action.
#[derive(Debug, Clone)]
pub struct NoteEditor {
    draft: String,
    soft_char_limit: usize,
}

impl Default for NoteEditor {
    fn default() -> Self {
        Self::new(DEFAULT_SOFT_CHAR_LIMIT)
    }
}

impl NoteEditor {
    pub fn new(soft_char_limit: usize) -> Self {
        Self {
            draft: String::new(),
            soft_char_limit,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replaces the draft, as on every keystroke.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn counter(&self) -> CharCounter {
        let count = self.draft.chars().count();
        CharCounter {
            count,
            over_soft_limit: count > self.soft_char_limit,
        }
    }

    /// Saves the current draft through `repo`.
    pub fn save<R: NoteRepository + ?Sized>(&mut self, repo: &R) -> SaveReport {
        if normalize_note_text(&self.draft).is_err() {
            return SaveReport {
                outcome: SaveOutcome::Rejected,
                notification: Notification::error(MSG_EMPTY_NOTE, false),
            };
        }

        match repo.create(&self.draft) {
            Ok(id) => {
                self.draft.clear();
                SaveReport {
                    outcome: SaveOutcome::Saved(id),
                    notification: Notification::success(MSG_NOTE_SAVED),
                }
            }
            Err(RepoError::Validation(_)) => SaveReport {
                outcome: SaveOutcome::Rejected,
                notification: Notification::error(MSG_EMPTY_NOTE, false),
            },
            Err(err) => {
                warn!("event=editor_save module=controller status=error error={err}");
                SaveReport {
                    outcome: SaveOutcome::Failed,
                    notification: Notification::error(MSG_SAVE_FAILED, true),
                }
            }
        }
    }
}
