//! User-action controllers.
//!
//! # Responsibility
//! - Convert compose-box and delete actions into repository calls.
//! - Catch every failure at this boundary and turn it into a `Notification`.
//!
//! # Invariants
//! - A failed create never appears in the list.
//! - An optimistic removal is always reverted when the store rejects it.

pub mod delete;
pub mod editor;
pub mod notification;
