// Database module
// Dual database system: SQLite for item metadata, LanceDB for vectors

pub mod lancedb;
pub mod sqlite;

pub use sqlite::*;
