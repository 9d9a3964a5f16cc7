//! Core note synchronization and rendering pipeline for Jotpad.
//! This crate is the single source of truth for note-list invariants.

pub mod config;
pub mod controller;
pub mod db;
pub mod logging;
pub mod model;
pub mod projection;
pub mod repo;
pub mod session;
pub mod store;

pub use config::{ClientConfig, ConfigError};
pub use controller::delete::{DeleteController, DeleteOutcome, DeletePolicy, DeleteReport};
pub use controller::editor::{CharCounter, NoteEditor, SaveOutcome, SaveReport};
pub use controller::notification::{Notification, NotificationLevel};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::note::{CreatedAt, Note, NoteId, NoteValidationError, OwnerId};
pub use projection::note_list::{EntryKey, ListEntry, NoteCard, NoteListProjector, Placeholder};
pub use repo::note_repo::{
    NoteFilter, NoteListSnapshot, NoteRepository, NoteSubscription, OrderSpec, RepoError,
    RepoResult, StoreNoteRepository,
};
pub use session::{NotesSession, SessionOptions};
pub use store::{NoteStore, SqliteNoteStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
