//! Contact records owned by a user account.

use rusqlite::{params, OptionalExtension};
use tracing::{debug, trace};

use super::Storage;
use crate::contact::Contact;
use crate::error::{Error, Result};

impl Storage {
    /// Insert a contact for `user_id` and return its id.
    ///
    /// The contact is stored as given; callers validate first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails (including an unknown user).
    pub fn insert_contact(&self, user_id: &str, contact: &Contact) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO contacts (user_id, name, phone_number) VALUES (?1, ?2, ?3)",
            params![user_id, contact.name, contact.phone_number],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, "Inserted contact");
        Ok(id)
    }

    /// List a user's contacts in insertion order.
    ///
    /// Rows with a blank name or phone number are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_contacts(&self, user_id: &str) -> Result<Vec<Contact>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, name, phone_number FROM contacts
            WHERE user_id = ?1 ORDER BY id ASC
            ",
        )?;

        let contacts = stmt
            .query_map([user_id], Self::row_to_contact)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total = contacts.len();
        let usable: Vec<Contact> = contacts
            .into_iter()
            .filter(|c| !c.name.trim().is_empty() && c.has_number())
            .collect();
        if usable.len() < total {
            trace!(
                skipped = total - usable.len(),
                "Skipped contacts with blank fields"
            );
        }
        Ok(usable)
    }

    /// Get one of a user's contacts by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_contact(&self, user_id: &str, id: i64) -> Result<Option<Contact>> {
        let contact = self
            .conn
            .query_row(
                "SELECT id, name, phone_number FROM contacts WHERE user_id = ?1 AND id = ?2",
                params![user_id, id],
                Self::row_to_contact,
            )
            .optional()?;
        Ok(contact)
    }

    /// Replace the name and number of an existing contact.
    ///
    /// # Errors
    ///
    /// Returns `ContactNotFound` if the user has no contact with this id.
    pub fn update_contact(&self, user_id: &str, id: i64, contact: &Contact) -> Result<()> {
        let affected = self.conn.execute(
            "UPDATE contacts SET name = ?1, phone_number = ?2 WHERE user_id = ?3 AND id = ?4",
            params![contact.name, contact.phone_number, user_id, id],
        )?;
        if affected == 0 {
            return Err(Error::ContactNotFound { id });
        }
        debug!(id, "Updated contact");
        Ok(())
    }

    /// Delete a contact.
    ///
    /// Returns `true` if a contact was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_contact(&self, user_id: &str, id: i64) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM contacts WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
        )?;
        Ok(affected > 0)
    }

    fn row_to_contact(row: &rusqlite::Row) -> rusqlite::Result<Contact> {
        Ok(Contact {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            phone_number: row.get(2)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::identity::UserProfile;
    use crate::storage::{Account, Storage};

    use super::*;

    fn storage_with_user(user_id: &str) -> Storage {
        let storage = Storage::open_in_memory().unwrap();
        let account = Account::new(user_id, &format!("{user_id}@example.com"), "hash");
        storage
            .insert_account(&account, &UserProfile::default())
            .unwrap();
        storage
    }

    #[test]
    fn test_insert_and_list() {
        let storage = storage_with_user("u1");
        storage
            .insert_contact("u1", &Contact::new("Mum", "9876543210"))
            .unwrap();
        storage
            .insert_contact("u1", &Contact::new("Dad", "9876543211"))
            .unwrap();

        let contacts = storage.list_contacts("u1").unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].name, "Mum");
        assert_eq!(contacts[1].name, "Dad");
        assert!(contacts.iter().all(|c| c.id.is_some()));
    }

    #[test]
    fn test_contacts_are_per_user() {
        let storage = storage_with_user("u1");
        let other = Account::new("u2", "u2@example.com", "hash");
        storage
            .insert_account(&other, &UserProfile::default())
            .unwrap();

        storage
            .insert_contact("u1", &Contact::new("Mum", "9876543210"))
            .unwrap();

        assert_eq!(storage.list_contacts("u1").unwrap().len(), 1);
        assert!(storage.list_contacts("u2").unwrap().is_empty());
    }

    #[test]
    fn test_insert_for_unknown_user_fails() {
        let storage = Storage::open_in_memory().unwrap();
        let result = storage.insert_contact("ghost", &Contact::new("Mum", "9876543210"));
        assert!(result.is_err());
    }

    #[test]
    fn test_list_skips_blank_rows() {
        let storage = storage_with_user("u1");
        storage
            .insert_contact("u1", &Contact::new("", "9876543210"))
            .unwrap();
        storage
            .insert_contact("u1", &Contact::new("Aunt", " "))
            .unwrap();
        storage
            .insert_contact("u1", &Contact::new("Mum", "9876543210"))
            .unwrap();

        let contacts = storage.list_contacts("u1").unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Mum");
    }

    #[test]
    fn test_update_contact() {
        let storage = storage_with_user("u1");
        let id = storage
            .insert_contact("u1", &Contact::new("Mum", "9876543210"))
            .unwrap();

        storage
            .update_contact("u1", id, &Contact::new("Mother", "1112223333"))
            .unwrap();

        let contact = storage.get_contact("u1", id).unwrap().unwrap();
        assert_eq!(contact.name, "Mother");
        assert_eq!(contact.phone_number, "1112223333");
    }

    #[test]
    fn test_update_missing_contact() {
        let storage = storage_with_user("u1");
        let err = storage
            .update_contact("u1", 42, &Contact::new("X", "1112223333"))
            .unwrap_err();
        assert!(matches!(err, Error::ContactNotFound { id: 42 }));
    }

    #[test]
    fn test_delete_contact() {
        let storage = storage_with_user("u1");
        let id = storage
            .insert_contact("u1", &Contact::new("Mum", "9876543210"))
            .unwrap();

        assert!(!storage.delete_contact("someone-else", id).unwrap());
        assert!(storage.delete_contact("u1", id).unwrap());
        assert!(storage.get_contact("u1", id).unwrap().is_none());
        assert!(!storage.delete_contact("u1", id).unwrap());
    }
}
