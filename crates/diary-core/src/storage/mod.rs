//! Storage layer: record store trait and the SQLite engine.

pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteStore;
pub use traits::RecordStore;
