//! Render-ready projection of note snapshots.
//!
//! # Responsibility
//! - Turn repository snapshots into an ordered list of display entries.
//! - Provide the local mutations the optimistic delete path needs.
//!
//! # Known limitation
//! - Every snapshot replaces the whole list. Unchanged entries are rebuilt
//!   too, so a renderer that diffs nothing will flicker. This is accepted.

pub mod date_label;
pub mod note_list;
