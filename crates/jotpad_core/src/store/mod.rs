//! Remote note store boundary.
//!
//! # Responsibility
//! - Define the untyped document contract the repository talks to.
//! - Provide the bundled SQLite-backed store used by the CLI and tests.
//!
//! # Invariants
//! - Documents are plain JSON field maps; typing happens in `repo`.
//! - Every subscription emission is a full snapshot, never a diff.
//! - `createdAt` and `seq` are assigned by the store, not the client.

use crate::db::DbError;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Receiver;

pub mod sqlite_store;

pub use sqlite_store::SqliteNoteStore;

/// Document field holding note text.
pub const FIELD_TEXT: &str = "text";
/// Document field holding the server timestamp in epoch milliseconds.
pub const FIELD_CREATED_AT: &str = "createdAt";
/// Document field holding the owner scope.
pub const FIELD_OWNER_ID: &str = "ownerId";
/// Document field holding the store insertion sequence.
pub const FIELD_SEQ: &str = "seq";

pub type StoreResult<T> = Result<T, StoreError>;

/// Transport, permission or backend failure reported by a store.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Backend rejected the request (malformed document, permission, ...).
    Backend(String),
    /// Store connection has not been migrated to the expected schema.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Backend(message) => write!(f, "note store rejected request: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "note store connection is at schema version {actual_version}, expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "note store is missing required table `{table}`")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One stored document: an id plus an untyped field map.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl NoteDocument {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Equality filter over stored documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    /// Restricts results to documents whose `ownerId` equals this value.
    pub owner_id: Option<String>,
}

/// Sort order understood by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentOrder {
    /// `createdAt` descending, unresolved timestamps last, then `seq` descending.
    #[default]
    CreatedAtDesc,
}

pub type SubscriptionId = u64;

/// One delivery on a live subscription.
pub type StoreEvent = StoreResult<Vec<NoteDocument>>;

/// Receiving half of a live subscription.
#[derive(Debug)]
pub struct StoreSubscription {
    pub id: SubscriptionId,
    pub events: Receiver<StoreEvent>,
}

/// Source of server timestamps.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Wall clock in UTC epoch milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Opaque append/query/subscribe/delete document store.
pub trait NoteStore {
    /// Appends one document and returns its store-assigned id.
    fn append(&self, fields: Map<String, Value>) -> StoreResult<String>;
    /// Gets one document by id.
    fn get(&self, id: &str) -> StoreResult<Option<NoteDocument>>;
    /// Returns all documents matching `filter`, sorted by `order`.
    fn query(&self, filter: &DocumentFilter, order: DocumentOrder)
        -> StoreResult<Vec<NoteDocument>>;
    /// Opens a live subscription; the current snapshot is delivered first.
    fn subscribe(
        &self,
        filter: DocumentFilter,
        order: DocumentOrder,
    ) -> StoreResult<StoreSubscription>;
    /// Tears down a live subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
    /// Deletes one document. Returns `false` when no such document exists.
    fn delete(&self, id: &str) -> StoreResult<bool>;
}
