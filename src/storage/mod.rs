//! Persistent storage.
//!
//! SQLite-based store with integer primary keys for notes and entities, a
//! symmetric-pair edge table, and an entity link table. See
//! `migrations.rs` for the exact schema.

mod migrations;
mod sqlite;

pub use migrations::{Migration, MIGRATIONS};
pub use sqlite::{Result, Storage, StorageError};
