//! Storage layer for guardian.
//!
//! This module provides `SQLite`-based persistent storage for accounts,
//! profiles, emergency contacts, the local preference store and the outbound
//! message log.

pub mod migrations;
pub mod schema;

mod contacts;
mod outbox;
mod preferences;
mod users;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use outbox::OutboxMessage;
pub use preferences::{
    PREF_EMAIL, PREF_EMERGENCY_CONTACT_1, PREF_EMERGENCY_CONTACT_2, PREF_PASSWORD,
};
pub use users::Account;

/// Storage handle shared between the directory, identity and sender adapters.
pub type SharedStorage = Arc<Mutex<Storage>>;

/// Storage engine backed by a single `SQLite` connection.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Wrap this storage for sharing between adapters.
    #[must_use]
    pub fn into_shared(self) -> SharedStorage {
        Arc::new(Mutex::new(self))
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_users: count("SELECT COUNT(*) FROM users")?,
            total_contacts: count("SELECT COUNT(*) FROM contacts")?,
            total_outbox: count("SELECT COUNT(*) FROM outbox")?,
            db_size_bytes,
        })
    }
}

/// Lock shared storage, mapping a poisoned lock to an internal error.
///
/// # Errors
///
/// Returns an internal error if another thread panicked while holding the lock.
pub fn lock(storage: &SharedStorage) -> Result<MutexGuard<'_, Storage>> {
    storage
        .lock()
        .map_err(|_| Error::internal("storage lock poisoned"))
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StorageStats {
    /// Number of registered accounts.
    pub total_users: i64,
    /// Number of stored contacts across all accounts.
    pub total_contacts: i64,
    /// Number of messages in the outbox.
    pub total_outbox: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
