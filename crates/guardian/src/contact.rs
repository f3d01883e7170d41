//! Emergency contacts and the directory abstraction that supplies them.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identity::UserId;
use crate::validation::{require_non_blank, validate_phone_number, ValidationError};

/// A person to notify during an SOS session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Identifier assigned by the backing store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Display name.
    pub name: String,

    /// Phone number the alert is texted to.
    pub phone_number: String,
}

impl Contact {
    /// Create an unsaved contact.
    #[must_use]
    pub fn new(name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            phone_number: phone_number.into(),
        }
    }

    /// Check the name is present and the phone number is well formed.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        require_non_blank("name", &self.name)?;
        validate_phone_number(&self.phone_number)
    }

    /// Whether an alert can be addressed to this contact at all.
    #[must_use]
    pub fn has_number(&self) -> bool {
        !self.phone_number.trim().is_empty()
    }
}

/// Supplies the contacts to notify for a user.
///
/// Implementations may be backed by a per-account record store or by the
/// local preference store.
#[async_trait::async_trait]
pub trait ContactDirectory: Send + Sync {
    /// The name of this directory (for logging).
    fn name(&self) -> &'static str;

    /// All contacts to notify for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    async fn contacts_for(&self, user: &UserId) -> Result<Vec<Contact>>;
}
