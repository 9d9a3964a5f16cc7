//! Typed domain model for notes.
//!
//! # Responsibility
//! - Define the canonical note record consumed by projection and controllers.
//! - Keep store-assigned identity and ordering metadata explicit in types.
//!
//! # Invariants
//! - `id`, `created_at` and `seq` are assigned by the store and never mutated.
//! - There is no edit operation: `text` is fixed at creation.

pub mod note;
