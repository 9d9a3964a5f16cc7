//! Typed repository over the note store.
//!
//! # Responsibility
//! - Be the only component that talks to a `NoteStore`.
//! - Validate input before writes and type documents on the way out.
//!
//! # Invariants
//! - Blank note text never reaches the store.
//! - Malformed documents are dropped from snapshots, never rendered.

pub mod note_repo;
