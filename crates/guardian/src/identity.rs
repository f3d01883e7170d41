//! Accounts, sign-in sessions and user profiles.
//!
//! [`Identity`] is the seam the SOS controller uses to find out who is
//! signed in. [`LocalIdentity`] implements it over [`Storage`](crate::storage::Storage), keeping the
//! signed-in email in the preference store so a session outlives the process.

use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::storage::{self, Account, SharedStorage, PREF_EMAIL};
use crate::validation::{
    require_non_blank, validate_email, validate_phone_number, ValidationError,
};

/// Stable identifier of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the identifier for a normalized email.
    #[must_use]
    pub fn for_email(email: &str) -> Self {
        let digest = blake3::hash(email.as_bytes()).to_hex();
        Self(digest[..28].to_string())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Personal details attached to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Public handle.
    pub username: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// The user's own phone number.
    pub phone: String,
    /// Sign-in email.
    pub email: String,
}

/// An editable profile field, addressed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    /// `username`
    Username,
    /// `firstName`
    FirstName,
    /// `lastName`
    LastName,
    /// `phone`
    Phone,
    /// `email`
    Email,
}

impl FromStr for ProfileField {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "username" => Ok(Self::Username),
            "firstName" | "first_name" => Ok(Self::FirstName),
            "lastName" | "last_name" => Ok(Self::LastName),
            "phone" => Ok(Self::Phone),
            "email" => Ok(Self::Email),
            other => Err(ValidationError::UnknownField(other.to_string())),
        }
    }
}

impl UserProfile {
    /// Set one field by name.
    pub fn set(&mut self, field: ProfileField, value: impl Into<String>) {
        let value = value.into();
        match field {
            ProfileField::Username => self.username = value,
            ProfileField::FirstName => self.first_name = value,
            ProfileField::LastName => self.last_name = value,
            ProfileField::Phone => self.phone = value,
            ProfileField::Email => self.email = value,
        }
    }
}

/// Details submitted when creating an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Public handle.
    pub username: String,
    /// Sign-in password.
    pub password: String,
    /// Sign-in email.
    pub email: String,
    /// The user's own phone number.
    pub phone: String,
}

impl Registration {
    /// Check every field, returning the first failure.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the offending field.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        require_non_blank("first name", &self.first_name)?;
        require_non_blank("last name", &self.last_name)?;
        require_non_blank("username", &self.username)?;
        require_non_blank("password", &self.password)?;
        validate_email(&self.email)?;
        validate_phone_number(&self.phone)
    }

    fn profile(&self, email: &str) -> UserProfile {
        UserProfile {
            username: self.username.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone.clone(),
            email: email.to_string(),
        }
    }
}

/// Authentication provider.
#[async_trait::async_trait]
pub trait Identity: Send + Sync {
    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `AccountExists`, or a backend failure.
    async fn register(&self, registration: &Registration) -> Result<UserId>;

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` if the pair does not match an account.
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserId>;

    /// Sign out the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be cleared.
    async fn sign_out(&self) -> Result<()>;

    /// The currently signed-in user, if any.
    fn current_user(&self) -> Option<UserId>;
}

/// Identity provider backed by local storage.
#[derive(Debug)]
pub struct LocalIdentity {
    storage: SharedStorage,
    current: Mutex<Option<UserId>>,
}

impl LocalIdentity {
    /// Create a provider and restore any persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the preference store cannot be read.
    pub fn restore(storage: SharedStorage) -> Result<Self> {
        let current = {
            let store = storage::lock(&storage)?;
            match store.get_preference(PREF_EMAIL)? {
                Some(email) => match store.find_account_by_email(&email)? {
                    Some(account) => Some(UserId::new(account.user_id)),
                    None => {
                        warn!(%email, "Persisted session refers to a missing account");
                        None
                    }
                },
                None => None,
            }
        };
        if let Some(user) = &current {
            debug!(%user, "Restored session");
        }
        Ok(Self {
            storage,
            current: Mutex::new(current),
        })
    }

    /// Load the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` if nobody is signed in.
    pub fn load_profile(&self) -> Result<UserProfile> {
        let user = self.current_user().ok_or(Error::NotSignedIn)?;
        storage::lock(&self.storage)?
            .load_profile(user.as_str())?
            .ok_or(Error::NotSignedIn)
    }

    /// Save the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` if nobody is signed in, or a validation error
    /// if the phone number is set but malformed.
    pub fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let user = self.current_user().ok_or(Error::NotSignedIn)?;
        if !profile.phone.is_empty() {
            validate_phone_number(&profile.phone)?;
        }
        storage::lock(&self.storage)?.save_profile(user.as_str(), profile)
    }

    /// Update a single profile field and save.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is signed in, the value is invalid, or the
    /// field is the sign-in email (which cannot be changed here).
    pub fn update_field(&self, field: ProfileField, value: &str) -> Result<UserProfile> {
        if field == ProfileField::Email {
            return Err(ValidationError::ReadOnlyField("email").into());
        }
        let mut profile = self.load_profile()?;
        profile.set(field, value);
        self.save_profile(&profile)?;
        Ok(profile)
    }

    fn set_current(&self, user: Option<UserId>) -> Result<()> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| Error::internal("session lock poisoned"))?;
        *current = user;
        Ok(())
    }
}

/// Lowercased, trimmed email used as the account key.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Salted password digest.
fn hash_password(user: &UserId, password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(user.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[async_trait::async_trait]
impl Identity for LocalIdentity {
    async fn register(&self, registration: &Registration) -> Result<UserId> {
        registration.validate()?;

        let email = normalize_email(&registration.email);
        let user = UserId::for_email(&email);
        let account = Account::new(
            user.as_str(),
            &email,
            &hash_password(&user, &registration.password),
        );

        {
            let store = storage::lock(&self.storage)?;
            store.insert_account(&account, &registration.profile(&email))?;
            store.set_preference(PREF_EMAIL, &email)?;
        }
        self.set_current(Some(user.clone()))?;

        info!(%user, "Registered account");
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserId> {
        let email = normalize_email(email);
        let user = {
            let store = storage::lock(&self.storage)?;
            let account = store
                .find_account_by_email(&email)?
                .ok_or(Error::InvalidCredentials)?;
            let user = UserId::new(account.user_id);
            if hash_password(&user, password) != account.password_hash {
                return Err(Error::InvalidCredentials);
            }
            store.set_preference(PREF_EMAIL, &email)?;
            user
        };
        self.set_current(Some(user.clone()))?;

        info!(%user, "Signed in");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        storage::lock(&self.storage)?.remove_preference(PREF_EMAIL)?;
        self.set_current(None)?;
        info!("Signed out");
        Ok(())
    }

    fn current_user(&self) -> Option<UserId> {
        self.current.lock().ok().and_then(|c| c.clone())
    }
}
