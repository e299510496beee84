//! Domain model for notes and tags.
//!
//! # Responsibility
//! - Define the records exchanged between storage, the store facade and exporters.
//!
//! # Invariants
//! - Note and tag ids are assigned by storage and never reused.
//! - `updated_at >= created_at` for every persisted note.

pub mod note;
pub mod tag;
