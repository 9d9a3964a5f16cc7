//! Note repository contract and store-backed implementation.
//!
//! # Responsibility
//! - Provide `create`, `query`, `subscribe` and `delete_by_id` over notes.
//! - Apply owner scoping to every read and delete.
//! - Convert untyped store documents into `Note` values.
//!
//! # Invariants
//! - `create` stores `text.trim()` and fails locally on blank input.
//! - Snapshots are full and sorted by `Note::display_order`.
//! - A scoped repository drops documents owned by anyone else, whatever the
//!   store returned.
//! - A missing or malformed `createdAt` becomes `CreatedAt::Pending`.
//! - The repository never retries; store failures surface as they arrive.

use crate::model::note::{
    normalize_note_text, CreatedAt, Note, NoteId, NoteValidationError, OwnerId,
};
use crate::store::{
    DocumentFilter, DocumentOrder, NoteDocument, NoteStore, StoreError, StoreEvent,
    SubscriptionId, FIELD_CREATED_AT, FIELD_OWNER_ID, FIELD_SEQ, FIELD_TEXT,
};
use log::{debug, error, info, warn};
use serde_json::{Map, Value};
use std::cell::Cell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{Receiver, TryRecvError};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note use-cases.
#[derive(Debug)]
pub enum RepoError {
    /// Input rejected before any store call.
    Validation(NoteValidationError),
    /// Transport, permission or backend failure.
    Store(StoreError),
    /// No such note in the caller's scope.
    NotFound(NoteId),
    /// Store returned a document that cannot be typed as a note.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid note document: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Visibility filter for note reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub owner: Option<OwnerId>,
}

/// Requested snapshot ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderSpec {
    /// Newest first; pending timestamps last.
    #[default]
    CreatedAtDesc,
}

/// Full materialization of the notes matching a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteListSnapshot {
    /// Notes sorted by `Note::display_order`.
    pub notes: Vec<Note>,
    /// Documents dropped because they could not be typed or were out of scope.
    pub skipped: usize,
}

impl NoteListSnapshot {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Builds a snapshot from raw store documents.
    pub fn from_documents(documents: Vec<NoteDocument>) -> Self {
        Self::from_documents_in_scope(documents, None)
    }

    /// Builds a snapshot keeping only notes owned by `owner`, when given.
    pub fn from_documents_in_scope(
        documents: Vec<NoteDocument>,
        owner: Option<&OwnerId>,
    ) -> Self {
        let mut skipped = 0;
        let mut notes = Vec::with_capacity(documents.len());
        for document in &documents {
            match note_from_document(document) {
                Ok(note) if owner.is_some() && note.owner_id.as_ref() != owner => {
                    skipped += 1;
                    warn!(
                        "event=snapshot_document_rejected module=repo status=out_of_scope doc_id={}",
                        document.id
                    );
                }
                Ok(note) => notes.push(note),
                Err(err) => {
                    skipped += 1;
                    warn!(
                        "event=snapshot_document_rejected module=repo status=error doc_id={} error={err}",
                        document.id
                    );
                }
            }
        }
        notes.sort_by(Note::display_order);
        Self { notes, skipped }
    }
}

/// Live subscription handle.
///
/// Events are consumed in delivery order with `try_next`. The handle must be
/// returned to `NoteRepository::cancel` to release the store side.
#[derive(Debug)]
pub struct NoteSubscription {
    id: SubscriptionId,
    events: Receiver<StoreEvent>,
    owner: Option<OwnerId>,
    closed: Cell<bool>,
}

impl NoteSubscription {
    /// Subscription over `events`; with `owner`, other owners' notes are dropped.
    pub fn new(id: SubscriptionId, events: Receiver<StoreEvent>, owner: Option<OwnerId>) -> Self {
        Self {
            id,
            events,
            owner,
            closed: Cell::new(false),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the next pending snapshot, or `None` when nothing is queued.
    pub fn try_next(&self) -> Option<RepoResult<NoteListSnapshot>> {
        match self.events.try_recv() {
            Ok(event) => Some(
                event
                    .map(|documents| {
                        NoteListSnapshot::from_documents_in_scope(documents, self.owner.as_ref())
                    })
                    .map_err(RepoError::from),
            ),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if !self.closed.replace(true) {
                    debug!(
                        "event=subscription_closed module=repo status=ok subscription_id={}",
                        self.id
                    );
                }
                None
            }
        }
    }

    /// Whether the store side has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

/// Typed boundary over a note store.
pub trait NoteRepository {
    /// Filter matching the current owner scope.
    fn scope(&self) -> NoteFilter;
    /// Creates one note and returns its store-assigned id.
    fn create(&self, text: &str) -> RepoResult<NoteId>;
    /// Opens a live feed of full snapshots.
    fn subscribe(&self, filter: &NoteFilter, order: OrderSpec) -> RepoResult<NoteSubscription>;
    /// Tears down a live feed.
    fn cancel(&self, subscription: NoteSubscription);
    /// One-shot snapshot.
    fn query(&self, filter: &NoteFilter, order: OrderSpec) -> RepoResult<NoteListSnapshot>;
    /// Deletes one note in scope; `NotFound` when already gone.
    fn delete_by_id(&self, id: &NoteId) -> RepoResult<()>;
}

/// Repository over any `NoteStore`, optionally scoped to one owner.
pub struct StoreNoteRepository<'store, S: NoteStore + ?Sized> {
    store: &'store S,
    owner: Option<OwnerId>,
}

impl<'store, S: NoteStore + ?Sized> StoreNoteRepository<'store, S> {
    /// Unscoped repository: the store is one shared list.
    pub fn new(store: &'store S) -> Self {
        Self { store, owner: None }
    }

    /// Repository scoped to `owner`.
    pub fn scoped(store: &'store S, owner: OwnerId) -> Self {
        Self {
            store,
            owner: Some(owner),
        }
    }

    pub fn owner(&self) -> Option<&OwnerId> {
        self.owner.as_ref()
    }

    /// The repository scope always wins over a caller-supplied owner.
    fn document_filter(&self, filter: &NoteFilter) -> DocumentFilter {
        let owner = self.owner.as_ref().or(filter.owner.as_ref());
        DocumentFilter {
            owner_id: owner.map(|owner| owner.as_str().to_string()),
        }
    }

    fn in_scope(&self, document: &NoteDocument) -> bool {
        match self.owner.as_ref() {
            None => true,
            Some(owner) => {
                document.get(FIELD_OWNER_ID).and_then(Value::as_str) == Some(owner.as_str())
            }
        }
    }
}

impl<S: NoteStore + ?Sized> NoteRepository for StoreNoteRepository<'_, S> {
    fn scope(&self) -> NoteFilter {
        NoteFilter {
            owner: self.owner.clone(),
        }
    }

    fn create(&self, text: &str) -> RepoResult<NoteId> {
        let text = match normalize_note_text(text) {
            Ok(text) => text,
            Err(err) => {
                debug!("event=note_create module=repo status=rejected reason=empty_text");
                return Err(err.into());
            }
        };

        let mut fields = Map::new();
        let char_count = text.chars().count();
        fields.insert(FIELD_TEXT.to_string(), Value::String(text));
        if let Some(owner) = self.owner.as_ref() {
            fields.insert(
                FIELD_OWNER_ID.to_string(),
                Value::String(owner.as_str().to_string()),
            );
        }

        match self.store.append(fields) {
            Ok(id) => {
                info!("event=note_create module=repo status=ok note_id={id} chars={char_count}");
                Ok(NoteId::new(id))
            }
            Err(err) => {
                error!("event=note_create module=repo status=error error={err}");
                Err(err.into())
            }
        }
    }

    fn subscribe(&self, filter: &NoteFilter, order: OrderSpec) -> RepoResult<NoteSubscription> {
        let subscription = self
            .store
            .subscribe(self.document_filter(filter), document_order(order))?;
        Ok(NoteSubscription::new(
            subscription.id,
            subscription.events,
            self.owner.clone(),
        ))
    }

    fn cancel(&self, subscription: NoteSubscription) {
        self.store.unsubscribe(subscription.id);
    }

    fn query(&self, filter: &NoteFilter, order: OrderSpec) -> RepoResult<NoteListSnapshot> {
        let documents = self
            .store
            .query(&self.document_filter(filter), document_order(order))?;
        Ok(NoteListSnapshot::from_documents_in_scope(
            documents,
            self.owner.as_ref(),
        ))
    }

    fn delete_by_id(&self, id: &NoteId) -> RepoResult<()> {
        if self.owner.is_some() {
            let in_scope = self
                .store
                .get(id.as_str())?
                .is_some_and(|document| self.in_scope(&document));
            if !in_scope {
                return Err(RepoError::NotFound(id.clone()));
            }
        }

        match self.store.delete(id.as_str()) {
            Ok(true) => {
                info!("event=note_delete module=repo status=ok note_id={id}");
                Ok(())
            }
            Ok(false) => {
                debug!("event=note_delete module=repo status=not_found note_id={id}");
                Err(RepoError::NotFound(id.clone()))
            }
            Err(err) => {
                error!("event=note_delete module=repo status=error note_id={id} error={err}");
                Err(err.into())
            }
        }
    }
}

fn document_order(order: OrderSpec) -> DocumentOrder {
    match order {
        OrderSpec::CreatedAtDesc => DocumentOrder::CreatedAtDesc,
    }
}

/// Types one store document.
///
/// Text must be a non-blank string. `createdAt` that is absent, null or not
/// an integer is treated as pending.
pub fn note_from_document(document: &NoteDocument) -> RepoResult<Note> {
    if document.id.trim().is_empty() {
        return Err(RepoError::InvalidData("document id is empty".to_string()));
    }

    let text = match document.get(FIELD_TEXT) {
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        Some(Value::String(_)) => {
            return Err(RepoError::InvalidData(format!(
                "field `{FIELD_TEXT}` is blank"
            )))
        }
        _ => {
            return Err(RepoError::InvalidData(format!(
                "field `{FIELD_TEXT}` is missing or not a string"
            )))
        }
    };

    let created_at = document
        .get(FIELD_CREATED_AT)
        .and_then(Value::as_i64)
        .map_or(CreatedAt::Pending, CreatedAt::At);
    let owner_id = document
        .get(FIELD_OWNER_ID)
        .and_then(Value::as_str)
        .map(OwnerId::new);
    let seq = document.get(FIELD_SEQ).and_then(Value::as_u64).unwrap_or(0);

    Ok(Note {
        id: NoteId::new(document.id.clone()),
        text,
        created_at,
        owner_id,
        seq,
    })
}

#[cfg(test)]
mod tests {
    use super::{note_from_document, NoteListSnapshot, RepoError};
    use crate::model::note::{CreatedAt, OwnerId};
    use crate::store::NoteDocument;
    use serde_json::{json, Value};

    fn document(id: &str, fields: Value) -> NoteDocument {
        let Value::Object(map) = fields else {
            panic!("fields must be an object");
        };
        NoteDocument::new(id, map)
    }

    #[test]
    fn missing_created_at_is_pending() {
        let note = note_from_document(&document("a", json!({ "text": "hi", "seq": 1 }))).unwrap();
        assert_eq!(note.created_at, CreatedAt::Pending);
    }

    #[test]
    fn malformed_created_at_is_pending() {
        let note = note_from_document(&document(
            "a",
            json!({ "text": "hi", "createdAt": "yesterday" }),
        ))
        .unwrap();
        assert_eq!(note.created_at, CreatedAt::Pending);
    }

    #[test]
    fn non_string_text_is_rejected() {
        let err = note_from_document(&document("a", json!({ "text": 7 }))).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }

    #[test]
    fn snapshot_skips_rejected_documents_and_sorts() {
        let snapshot = NoteListSnapshot::from_documents(vec![
            document("old", json!({ "text": "old", "createdAt": 10, "seq": 1 })),
            document("bad", json!({ "createdAt": 20, "seq": 2 })),
            document("pending", json!({ "text": "pending", "seq": 4 })),
            document("new", json!({ "text": "new", "createdAt": 30, "seq": 3 })),
        ]);
        assert_eq!(snapshot.skipped, 1);
        let ids: Vec<_> = snapshot.notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "pending"]);
    }

    #[test]
    fn scoped_snapshot_drops_other_owners() {
        let alice = OwnerId::new("alice");
        let snapshot = NoteListSnapshot::from_documents_in_scope(
            vec![
                document("a", json!({ "text": "mine", "createdAt": 10, "ownerId": "alice" })),
                document("b", json!({ "text": "theirs", "createdAt": 20, "ownerId": "bob" })),
                document("c", json!({ "text": "unowned", "createdAt": 30 })),
            ],
            Some(&alice),
        );
        assert_eq!(snapshot.skipped, 2);
        let ids: Vec<_> = snapshot.notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }
}
