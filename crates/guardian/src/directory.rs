//! Contact directory adapters.
//!
//! [`StoreDirectory`] keeps contacts per account in storage.
//! [`PreferenceDirectory`] reads the two numbers kept in the local
//! preference store.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contact::{Contact, ContactDirectory};
use crate::error::{Error, Result};
use crate::identity::UserId;
use crate::storage::{self, SharedStorage, PREF_EMERGENCY_CONTACT_1, PREF_EMERGENCY_CONTACT_2};
use crate::validation::{validate_phone_number, ValidationError};

/// Which directory backs the SOS fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryKind {
    /// Per-account contact records.
    #[default]
    Store,
    /// The two local preference slots.
    Preferences,
}

impl std::fmt::Display for DirectoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store => write!(f, "store"),
            Self::Preferences => write!(f, "preferences"),
        }
    }
}

/// Per-account contacts kept in storage.
#[derive(Debug, Clone)]
pub struct StoreDirectory {
    storage: SharedStorage,
}

impl StoreDirectory {
    /// Create a directory over shared storage.
    #[must_use]
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// List a user's contacts.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn list(&self, user: &UserId) -> Result<Vec<Contact>> {
        storage::lock(&self.storage)?.list_contacts(user.as_str())
    }

    /// Validate and add a contact, returning it with its new id.
    ///
    /// # Errors
    ///
    /// Returns a validation error or a storage failure.
    pub fn add(&self, user: &UserId, contact: Contact) -> Result<Contact> {
        contact.validate()?;
        let id = storage::lock(&self.storage)?.insert_contact(user.as_str(), &contact)?;
        info!(id, name = %contact.name, "Added emergency contact");
        Ok(Contact {
            id: Some(id),
            ..contact
        })
    }

    /// Validate and replace an existing contact, returning the stored record.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `ContactNotFound`, or a storage failure.
    pub fn update(&self, user: &UserId, id: i64, contact: Contact) -> Result<Contact> {
        contact.validate()?;
        let storage = storage::lock(&self.storage)?;
        storage.update_contact(user.as_str(), id, &contact)?;
        let stored = storage
            .get_contact(user.as_str(), id)?
            .ok_or(Error::ContactNotFound { id })?;
        info!(id, "Updated emergency contact");
        Ok(stored)
    }

    /// Remove a contact. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn remove(&self, user: &UserId, id: i64) -> Result<bool> {
        let removed = storage::lock(&self.storage)?.delete_contact(user.as_str(), id)?;
        if removed {
            info!(id, "Removed emergency contact");
        }
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl ContactDirectory for StoreDirectory {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn contacts_for(&self, user: &UserId) -> Result<Vec<Contact>> {
        self.list(user)
    }
}

/// The two emergency numbers kept in the local preference store.
#[derive(Debug, Clone)]
pub struct PreferenceDirectory {
    storage: SharedStorage,
}

impl PreferenceDirectory {
    /// Number of preference slots.
    pub const SLOTS: usize = 2;

    /// Create a directory over shared storage.
    #[must_use]
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    fn slot_key(slot: usize) -> std::result::Result<&'static str, ValidationError> {
        match slot {
            1 => Ok(PREF_EMERGENCY_CONTACT_1),
            2 => Ok(PREF_EMERGENCY_CONTACT_2),
            _ => Err(ValidationError::UnknownField(format!("slot {slot}"))),
        }
    }

    /// Store a validated number in slot 1 or 2.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad slot or number.
    pub fn set_slot(&self, slot: usize, phone_number: &str) -> Result<()> {
        let key = Self::slot_key(slot)?;
        validate_phone_number(phone_number)?;
        storage::lock(&self.storage)?.set_preference(key, phone_number)?;
        debug!(slot, "Stored local emergency number");
        Ok(())
    }

    /// Clear slot 1 or 2.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad slot or a storage failure.
    pub fn clear_slot(&self, slot: usize) -> Result<()> {
        let key = Self::slot_key(slot)?;
        storage::lock(&self.storage)?.remove_preference(key)?;
        Ok(())
    }

    /// The configured numbers as contacts, skipping blank slots.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn list(&self) -> Result<Vec<Contact>> {
        let store = storage::lock(&self.storage)?;
        let mut contacts = Vec::with_capacity(Self::SLOTS);
        for slot in 1..=Self::SLOTS {
            let key = Self::slot_key(slot)?;
            let number = store.get_preference(key)?.unwrap_or_default();
            if !number.trim().is_empty() {
                contacts.push(Contact::new(format!("Emergency contact {slot}"), number));
            }
        }
        Ok(contacts)
    }
}

#[async_trait::async_trait]
impl ContactDirectory for PreferenceDirectory {
    fn name(&self) -> &'static str {
        "preferences"
    }

    async fn contacts_for(&self, _user: &UserId) -> Result<Vec<Contact>> {
        self.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserProfile;
    use crate::storage::{Account, Storage};

    fn shared_with_user() -> (SharedStorage, UserId) {
        let storage = Storage::open_in_memory().unwrap();
        let user = UserId::for_email("asha@example.com");
        storage
            .insert_account(
                &Account::new(user.as_str(), "asha@example.com", "h"),
                &UserProfile::default(),
            )
            .unwrap();
        (storage.into_shared(), user)
    }

    #[test]
    fn test_directory_kind_display_and_default() {
        assert_eq!(DirectoryKind::default(), DirectoryKind::Store);
        assert_eq!(DirectoryKind::Store.to_string(), "store");
        assert_eq!(DirectoryKind::Preferences.to_string(), "preferences");
    }

    #[tokio::test]
    async fn test_store_directory_crud() {
        let (shared, user) = shared_with_user();
        let dir = StoreDirectory::new(shared);

        let added = dir.add(&user, Contact::new("Mum", "9876543210")).unwrap();
        let id = added.id.unwrap();
        assert_eq!(dir.contacts_for(&user).await.unwrap(), vec![added]);

        let updated = dir
            .update(&user, id, Contact::new("Mother", "9876543211"))
            .unwrap();
        assert_eq!(updated.id, Some(id));
        assert_eq!(updated.name, "Mother");
        assert_eq!(updated.phone_number, "9876543211");
        assert_eq!(dir.list(&user).unwrap(), vec![updated]);

        assert!(matches!(
            dir.update(&user, id + 1, Contact::new("Dad", "9876543212")),
            Err(Error::ContactNotFound { .. })
        ));

        assert!(dir.remove(&user, id).unwrap());
        assert!(dir.contacts_for(&user).await.unwrap().is_empty());
    }

    #[test]
    fn test_store_directory_validates() {
        let (shared, user) = shared_with_user();
        let dir = StoreDirectory::new(shared);

        assert!(matches!(
            dir.add(&user, Contact::new("Mum", "12345")),
            Err(Error::Validation(ValidationError::InvalidPhoneNumber(_)))
        ));
        assert!(matches!(
            dir.add(&user, Contact::new("", "9876543210")),
            Err(Error::Validation(ValidationError::Empty("name")))
        ));
        assert!(dir.list(&user).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preference_directory_slots() {
        let (shared, user) = shared_with_user();
        let dir = PreferenceDirectory::new(shared);
        assert!(dir.contacts_for(&user).await.unwrap().is_empty());

        dir.set_slot(2, "1112223333").unwrap();
        let contacts = dir.contacts_for(&user).await.unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name, "Emergency contact 2");
        assert_eq!(contacts[0].phone_number, "1112223333");

        dir.set_slot(1, "4445556666").unwrap();
        assert_eq!(dir.list().unwrap().len(), 2);

        dir.clear_slot(2).unwrap();
        assert_eq!(dir.list().unwrap().len(), 1);
    }

    #[test]
    fn test_preference_directory_rejects_bad_input() {
        let (shared, _) = shared_with_user();
        let dir = PreferenceDirectory::new(shared);

        assert!(dir.set_slot(3, "1112223333").is_err());
        assert!(dir.set_slot(1, "111-222-3333").is_err());
        assert!(dir.list().unwrap().is_empty());
    }

    #[test]
    fn test_preference_directory_skips_blank_values() {
        let (shared, _) = shared_with_user();
        storage::lock(&shared)
            .unwrap()
            .set_preference(PREF_EMERGENCY_CONTACT_1, "  ")
            .unwrap();

        let dir = PreferenceDirectory::new(shared);
        assert!(dir.list().unwrap().is_empty());
    }
}
