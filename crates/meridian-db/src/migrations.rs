//! Database migration system.
//!
//! Schema version stored in `PRAGMA user_version`. A fresh database gets the
//! current schema; one written by a newer build is refused.

use rusqlite::Connection;

use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// Bring the database to [`SCHEMA_VERSION`].
pub fn run(conn: &Connection) -> Result<()> {
    let current_version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(DbError::Sqlite)?;

    match current_version {
        0 => {
            tracing::info!("Initializing database schema v{SCHEMA_VERSION}");
            conn.execute_batch(schema::SCHEMA_V1)
                .map_err(DbError::Sqlite)?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .map_err(DbError::Sqlite)?;
        }
        SCHEMA_VERSION => {}
        newer => {
            return Err(DbError::Migration(format!(
                "Database version {newer} is newer than supported {SCHEMA_VERSION}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_migration() {
        let conn = Connection::open_in_memory().expect("open");
        run(&conn).expect("migrate");

        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_idempotent_migration() {
        let conn = Connection::open_in_memory().expect("open");
        run(&conn).expect("first run");
        run(&conn).expect("second run should be no-op");
    }

    #[test]
    fn test_newer_database_rejected() {
        let conn = Connection::open_in_memory().expect("open");
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .expect("bump version");
        let result = run(&conn);
        assert!(matches!(result, Err(DbError::Migration(msg)) if msg.contains("newer")));

        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("version");
        assert_eq!(version, SCHEMA_VERSION + 1, "refused database is left untouched");
    }

    #[test]
    fn test_observations_table_created() {
        let conn = Connection::open_in_memory().expect("open");
        run(&conn).expect("migrate");

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='observations'",
                [],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(count, 1, "Table 'observations' should exist");
    }
}
