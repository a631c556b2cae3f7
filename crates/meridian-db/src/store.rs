//! [`ObservationStore`] backed by SQLite.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use rusqlite::Connection;

use meridian_oracle::{ObservationStore, OracleError};
use meridian_types::{Observation, TokenId};

use crate::{queries, DbError, Result};

/// Latest-observation store over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "opening observation database");
        Ok(Self::from_connection(crate::open(path)?))
    }

    /// Open a fresh in-memory database.
    pub fn open_memory() -> Result<Self> {
        Ok(Self::from_connection(crate::open_memory()?))
    }

    /// Wrap an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Tokens with a stored observation.
    pub fn tokens(&self) -> Result<Vec<TokenId>> {
        queries::observations::list_tokens(&self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl From<DbError> for OracleError {
    fn from(err: DbError) -> Self {
        OracleError::Store(err.to_string())
    }
}

impl ObservationStore for SqliteStore {
    fn get(&self, token: &TokenId) -> meridian_oracle::Result<Observation> {
        let stored = queries::observations::get(&self.lock(), token)?;
        Ok(stored.unwrap_or_default())
    }

    fn set(&self, token: &TokenId, observation: Observation) -> meridian_oracle::Result<()> {
        queries::observations::upsert(&self.lock(), token, &observation)?;
        Ok(())
    }
}
