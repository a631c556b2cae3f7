//! # meridian-db
//!
//! SQLite persistence for aggregated observations.
//! Manages a single database at `$MERIDIAN_DATA_DIR/meridian.db`.
//!
//! ## Schema
//!
//! - WAL mode for file-backed databases
//! - One row per token holding its latest observation
//! - 128-bit values stored as decimal TEXT
//! - Timestamps are Unix epoch seconds
//! - Schema version stored in `PRAGMA user_version`
//!
//! [`SqliteStore`] plugs the database into an aggregated oracle as its
//! observation store.

pub mod migrations;
pub mod queries;
pub mod schema;
pub mod store;

pub use store::SqliteStore;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// File name of the database inside the data directory.
pub const DB_FILE_NAME: &str = "meridian.db";

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the database at the given path.
///
/// Configures WAL mode and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}
