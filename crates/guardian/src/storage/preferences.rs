//! Local key-value preference store.

use rusqlite::OptionalExtension;

use super::Storage;
use crate::error::Result;

/// Email of the signed-in account.
pub const PREF_EMAIL: &str = "email";

/// Reserved for the legacy plaintext password slot; never written.
pub const PREF_PASSWORD: &str = "password";

/// First locally configured emergency number.
pub const PREF_EMERGENCY_CONTACT_1: &str = "emergencyContact1";

/// Second locally configured emergency number.
pub const PREF_EMERGENCY_CONTACT_2: &str = "emergencyContact2";

impl Storage {
    /// Read a preference value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Write a preference value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            (key, value),
        )?;
        Ok(())
    }

    /// Remove a preference. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove_preference(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM preferences WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }
}
