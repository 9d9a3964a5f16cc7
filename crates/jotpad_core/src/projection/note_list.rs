//! Note list projector.
//!
//! # Responsibility
//! - Apply repository snapshots as whole-list replacements.
//! - Show a single welcome placeholder when a snapshot is empty or the first
//!   load fails.
//! - Support optimistic local removal and exact-position restore.
//!
//! # Invariants
//! - Note entries are always in `Note::display_order`.
//! - A placeholder never coexists with note entries.
//! - Snapshots are applied strictly in the order they are handed in.

use crate::model::note::{Note, NoteId};
use crate::projection::date_label::{relative_date_label, PENDING_LABEL};
use crate::repo::note_repo::NoteListSnapshot;
use chrono::{DateTime, Utc};
use log::debug;

/// Text of the synthetic entry shown for an empty list.
pub const WELCOME_MESSAGE: &str =
    "Welcome to your new notepad! Start typing your thoughts above.";

/// One rendered note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCard {
    pub note: Note,
}

impl NoteCard {
    pub fn id(&self) -> &NoteId {
        &self.note.id
    }

    /// Text lines, rendered with line breaks between them.
    pub fn lines(&self) -> Vec<&str> {
        self.note.lines().collect()
    }

    pub fn date_label(&self, now: DateTime<Utc>) -> String {
        relative_date_label(self.note.created_at, now)
    }
}

/// Non-persistent welcome entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder;

impl Placeholder {
    pub fn message(&self) -> &'static str {
        WELCOME_MESSAGE
    }

    pub fn date_label(&self) -> &'static str {
        PENDING_LABEL
    }
}

/// Identity of a rendered entry, as handed to the delete affordance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKey {
    Note(NoteId),
    Placeholder,
}

/// One row of the rendered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    Note(NoteCard),
    Placeholder(Placeholder),
}

impl ListEntry {
    pub fn key(&self) -> EntryKey {
        match self {
            Self::Note(card) => EntryKey::Note(card.id().clone()),
            Self::Placeholder(_) => EntryKey::Placeholder,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Note(card) => card.note.text.as_str(),
            Self::Placeholder(placeholder) => placeholder.message(),
        }
    }

    pub fn date_label(&self, now: DateTime<Utc>) -> String {
        match self {
            Self::Note(card) => card.date_label(now),
            Self::Placeholder(placeholder) => placeholder.date_label().to_string(),
        }
    }
}

/// A note taken out of the list by an optimistic delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedNote {
    pub note: Note,
    /// Position the entry occupied before removal.
    pub index: usize,
    revision: u64,
}

/// Client-visible ordered note list.
#[derive(Debug, Default)]
pub struct NoteListProjector {
    entries: Vec<ListEntry>,
    revision: u64,
    live: bool,
}

impl NoteListProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole list with `snapshot`.
    ///
    /// Notes are re-sorted even though stores deliver them ordered, so the
    /// result depends only on snapshot content.
    pub fn on_snapshot(&mut self, snapshot: NoteListSnapshot) {
        let mut notes = snapshot.notes;
        notes.sort_by(Note::display_order);

        self.entries = if notes.is_empty() {
            vec![ListEntry::Placeholder(Placeholder)]
        } else {
            notes
                .into_iter()
                .map(|note| ListEntry::Note(NoteCard { note }))
                .collect()
        };
        self.revision += 1;

        debug!(
            "event=projector_snapshot module=projection status=ok revision={} entries={} skipped={}",
            self.revision,
            self.entries.len(),
            snapshot.skipped
        );
    }

    /// Shows the placeholder when the very first load failed.
    ///
    /// Once any snapshot was applied the last list stays as it is.
    pub fn on_load_failed(&mut self) -> bool {
        if self.revision > 0 || !self.entries.is_empty() {
            return false;
        }
        self.entries.push(ListEntry::Placeholder(Placeholder));
        debug!("event=projector_load_failed module=projection status=placeholder");
        true
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    /// Rendered notes, without the placeholder.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.entries.iter().filter_map(|entry| match entry {
            ListEntry::Note(card) => Some(&card.note),
            ListEntry::Placeholder(_) => None,
        })
    }

    /// Number of snapshots applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether a live subscription feeds this projector.
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    pub fn shows_placeholder(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry, ListEntry::Placeholder(_)))
    }

    pub fn contains(&self, id: &NoteId) -> bool {
        self.notes().any(|note| &note.id == id)
    }

    /// Removes the note with `id` ahead of store confirmation.
    pub fn remove_local(&mut self, id: &NoteId) -> Option<RemovedNote> {
        let index = self.entries.iter().position(|entry| match entry {
            ListEntry::Note(card) => card.id() == id,
            ListEntry::Placeholder(_) => false,
        })?;

        match self.entries.remove(index) {
            ListEntry::Note(card) => Some(RemovedNote {
                note: card.note,
                index,
                revision: self.revision,
            }),
            ListEntry::Placeholder(_) => None,
        }
    }

    /// Puts an optimistically removed note back at its sorted position.
    ///
    /// Returns `false` without touching the list when a newer snapshot was
    /// applied since the removal: that snapshot is authoritative.
    pub fn restore(&mut self, removed: RemovedNote) -> bool {
        if removed.revision != self.revision || self.contains(&removed.note.id) {
            return false;
        }

        if self.shows_placeholder() {
            self.entries.clear();
        }
        let position = self
            .entries
            .iter()
            .position(|entry| match entry {
                ListEntry::Note(card) => {
                    Note::display_order(&removed.note, &card.note).is_lt()
                }
                ListEntry::Placeholder(_) => true,
            })
            .unwrap_or(self.entries.len());
        self.entries.insert(
            position,
            ListEntry::Note(NoteCard {
                note: removed.note,
            }),
        );
        true
    }

    /// Removes the welcome placeholder locally. Nothing is persisted.
    pub fn dismiss_placeholder(&mut self) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !matches!(entry, ListEntry::Placeholder(_)));
        self.entries.len() < before
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryKey, ListEntry, NoteListProjector, WELCOME_MESSAGE};
    use crate::model::note::{CreatedAt, Note, NoteId};
    use crate::repo::note_repo::NoteListSnapshot;

    fn note(id: &str, created_at: i64, seq: u64) -> Note {
        Note {
            id: NoteId::new(id),
            text: format!("text {id}"),
            created_at: CreatedAt::At(created_at),
            owner_id: None,
            seq,
        }
    }

    fn snapshot(notes: Vec<Note>) -> NoteListSnapshot {
        NoteListSnapshot { notes, skipped: 0 }
    }

    fn keys(projector: &NoteListProjector) -> Vec<EntryKey> {
        projector.entries().iter().map(ListEntry::key).collect()
    }

    #[test]
    fn snapshot_is_resorted_newest_first() {
        let mut projector = NoteListProjector::new();
        projector.on_snapshot(snapshot(vec![
            note("a", 100, 1),
            note("c", 300, 3),
            note("b", 200, 2),
        ]));

        let ids: Vec<_> = projector.notes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(projector.revision(), 1);
    }

    #[test]
    fn empty_snapshot_yields_single_placeholder() {
        let mut projector = NoteListProjector::new();
        projector.on_snapshot(snapshot(vec![]));

        assert_eq!(keys(&projector), vec![EntryKey::Placeholder]);
        assert_eq!(projector.entries()[0].text(), WELCOME_MESSAGE);
    }

    #[test]
    fn next_snapshot_replaces_whole_list() {
        let mut projector = NoteListProjector::new();
        projector.on_snapshot(snapshot(vec![]));
        projector.on_snapshot(snapshot(vec![note("a", 1, 1)]));

        assert_eq!(keys(&projector), vec![EntryKey::Note(NoteId::new("a"))]);
        assert!(!projector.shows_placeholder());
    }

    #[test]
    fn restore_returns_note_to_prior_position() {
        let mut projector = NoteListProjector::new();
        projector.on_snapshot(snapshot(vec![
            note("a", 100, 1),
            note("b", 200, 2),
            note("c", 300, 3),
        ]));
        let before = keys(&projector);

        let removed = projector.remove_local(&NoteId::new("b")).unwrap();
        assert_eq!(removed.index, 1);
        assert!(!projector.contains(&NoteId::new("b")));

        assert!(projector.restore(removed));
        assert_eq!(keys(&projector), before);
    }

    #[test]
    fn restore_is_skipped_after_newer_snapshot() {
        let mut projector = NoteListProjector::new();
        projector.on_snapshot(snapshot(vec![note("a", 100, 1), note("b", 200, 2)]));
        let removed = projector.remove_local(&NoteId::new("a")).unwrap();

        projector.on_snapshot(snapshot(vec![note("b", 200, 2)]));
        assert!(!projector.restore(removed));
        assert_eq!(keys(&projector), vec![EntryKey::Note(NoteId::new("b"))]);
    }

    #[test]
    fn remove_local_of_unknown_id_is_none() {
        let mut projector = NoteListProjector::new();
        projector.on_snapshot(snapshot(vec![note("a", 100, 1)]));
        assert!(projector.remove_local(&NoteId::new("zzz")).is_none());
        assert_eq!(projector.entries().len(), 1);
    }

    #[test]
    fn dismiss_placeholder_only_touches_local_list() {
        let mut projector = NoteListProjector::new();
        projector.on_snapshot(snapshot(vec![]));
        assert!(projector.dismiss_placeholder());
        assert!(projector.entries().is_empty());
        assert!(!projector.dismiss_placeholder());
    }

    #[test]
    fn failed_first_load_shows_placeholder() {
        let mut projector = NoteListProjector::new();
        assert!(projector.on_load_failed());
        assert!(projector.shows_placeholder());
        assert_eq!(projector.revision(), 0);
        assert!(!projector.on_load_failed());
        assert_eq!(projector.entries().len(), 1);
    }

    #[test]
    fn failed_load_after_snapshot_keeps_list() {
        let mut projector = NoteListProjector::new();
        projector.on_snapshot(snapshot(vec![note("a", 100, 1)]));
        assert!(!projector.on_load_failed());
        assert_eq!(keys(&projector), vec![EntryKey::Note(NoteId::new("a"))]);
    }
}
