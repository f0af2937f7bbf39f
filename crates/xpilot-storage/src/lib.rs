//! Xpilot Storage crate - durable key-value persistence for chats and memory.
//!
//! Provides a WAL-mode SQLite database with migrations, the
//! [`KeyValueStore`] seam with SQLite and in-memory implementations, and a
//! [`ChatRepository`] that reads and writes the session list and the
//! learned-facts map.

pub mod db;
pub mod migrations;
pub mod repository;
pub mod store;

pub use db::Database;
pub use repository::{ChatRepository, FACTS_KEY, SESSIONS_KEY};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
