//! Account records and profile fields.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::Storage;
use crate::error::{Error, Result};
use crate::identity::UserProfile;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Stable user identifier.
    pub user_id: String,
    /// Normalized sign-in email.
    pub email: String,
    /// Salted password hash (hex).
    pub password_hash: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create an account record stamped now.
    #[must_use]
    pub fn new(user_id: &str, email: &str, password_hash: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        }
    }
}

impl Storage {
    /// Insert a new account with its initial profile.
    ///
    /// # Errors
    ///
    /// Returns `AccountExists` if the email or user id is taken.
    pub fn insert_account(&self, account: &Account, profile: &UserProfile) -> Result<()> {
        let result = self.conn.execute(
            r"
            INSERT INTO users
                (user_id, email, password_hash, username, first_name, last_name, phone, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                account.user_id,
                account.email,
                account.password_hash,
                profile.username,
                profile.first_name,
                profile.last_name,
                profile.phone,
                account.created_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {
                debug!(user_id = %account.user_id, "Inserted account");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AccountExists {
                    email: account.email.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up an account by its normalized email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = self
            .conn
            .query_row(
                "SELECT user_id, email, password_hash, created_at FROM users WHERE email = ?1",
                [email],
                |row| {
                    let created: String = row.get(3)?;
                    Ok(Account {
                        user_id: row.get(0)?,
                        email: row.get(1)?,
                        password_hash: row.get(2)?,
                        created_at: DateTime::parse_from_rfc3339(&created)
                            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc)),
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    /// Load the profile for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let profile = self
            .conn
            .query_row(
                r"
                SELECT username, first_name, last_name, phone, email
                FROM users WHERE user_id = ?1
                ",
                [user_id],
                |row| {
                    Ok(UserProfile {
                        username: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        phone: row.get(3)?,
                        email: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    /// Overwrite the editable profile fields of a user.
    ///
    /// The sign-in email is not changed here.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` if the user no longer exists.
    pub fn save_profile(&self, user_id: &str, profile: &UserProfile) -> Result<()> {
        let affected = self.conn.execute(
            r"
            UPDATE users SET username = ?1, first_name = ?2, last_name = ?3, phone = ?4
            WHERE user_id = ?5
            ",
            params![
                profile.username,
                profile.first_name,
                profile.last_name,
                profile.phone,
                user_id
            ],
        )?;
        if affected == 0 {
            return Err(Error::NotSignedIn);
        }
        debug!(user_id, "Saved profile");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            username: "asha".to_string(),
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            phone: "9876543210".to_string(),
            email: "asha@example.com".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let storage = Storage::open_in_memory().unwrap();
        let account = Account::new("u1", "asha@example.com", "h");
        storage.insert_account(&account, &profile()).unwrap();

        let found = storage
            .find_account_by_email("asha@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(found.user_id, "u1");
        assert_eq!(found.password_hash, "h");
        assert!(storage
            .find_account_by_email("nobody@example.com")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .insert_account(&Account::new("u1", "asha@example.com", "h"), &profile())
            .unwrap();

        let err = storage
            .insert_account(&Account::new("u2", "asha@example.com", "h"), &profile())
            .unwrap_err();
        assert!(matches!(err, Error::AccountExists { .. }));
    }

    #[test]
    fn test_load_profile_includes_email() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .insert_account(&Account::new("u1", "asha@example.com", "h"), &profile())
            .unwrap();

        let loaded = storage.load_profile("u1").unwrap().unwrap();
        assert_eq!(loaded, profile());
        assert!(storage.load_profile("u2").unwrap().is_none());
    }

    #[test]
    fn test_save_profile_keeps_email() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .insert_account(&Account::new("u1", "asha@example.com", "h"), &profile())
            .unwrap();

        let mut updated = profile();
        updated.first_name = "Ashwini".to_string();
        updated.email = "other@example.com".to_string();
        storage.save_profile("u1", &updated).unwrap();

        let loaded = storage.load_profile("u1").unwrap().unwrap();
        assert_eq!(loaded.first_name, "Ashwini");
        assert_eq!(loaded.email, "asha@example.com");
    }

    #[test]
    fn test_save_profile_unknown_user() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(matches!(
            storage.save_profile("ghost", &profile()),
            Err(Error::NotSignedIn)
        ));
    }
}
