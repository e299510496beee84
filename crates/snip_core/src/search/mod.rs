//! Full-text search entry points.
//!
//! # Responsibility
//! - Expose note queries backed by the `notes_fts` shadow table.
//! - Keep query escaping and error classification inside core.

pub mod fts;
