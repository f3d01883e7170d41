//! Error types for guardian.
//!
//! This module defines all error types used throughout the guardian crate,
//! providing detailed context for debugging and short messages suitable for
//! showing to the user.

use std::path::PathBuf;
use thiserror::Error;

use crate::controller::AlertState;
use crate::validation::ValidationError;

/// A device capability that the user may refuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Access to the device position.
    Location,
    /// Sending text messages.
    Messaging,
    /// Posting the persistent foreground notice.
    Notifications,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Location => write!(f, "location"),
            Self::Messaging => write!(f, "messaging"),
            Self::Notifications => write!(f, "notifications"),
        }
    }
}

/// The main error type for guardian operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Device Errors ===
    /// The user has not granted a required permission.
    #[error("{0} permission denied")]
    PermissionDenied(Permission),

    /// The location source is already delivering updates.
    #[error("location source '{name}' is already subscribed")]
    AlreadySubscribed {
        /// Name of the location source.
        name: &'static str,
    },

    /// A track file could not be parsed.
    #[error("invalid track file {path} at line {line}: {message}")]
    TrackParse {
        /// Path to the track file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// Handing a text message to the transport failed.
    #[error("failed to send message to {recipient}: {message}")]
    MessageSend {
        /// Recipient phone number.
        recipient: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Account Errors ===
    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No user is signed in.
    #[error("not signed in")]
    NotSignedIn,

    /// Email or password did not match.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("an account already exists for {email}")]
    AccountExists {
        /// The conflicting email.
        email: String,
    },

    /// No contact with this id belongs to the user.
    #[error("contact {id} not found")]
    ContactNotFound {
        /// The requested contact id.
        id: i64,
    },

    // === Controller Errors ===
    /// The requested operation is not valid in the current alert state.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        /// State the controller was in.
        state: AlertState,
        /// The rejected operation.
        action: &'static str,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for guardian operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a message send error.
    #[must_use]
    pub fn message_send(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MessageSend {
            recipient: recipient.into(),
            message: message.into(),
        }
    }

    /// Create an invalid transition error.
    #[must_use]
    pub fn invalid_transition(state: AlertState, action: &'static str) -> Self {
        Self::InvalidTransition { state, action }
    }

    /// Check if this error is a permission issue.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// Short text for a transient user-facing notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied(Permission::Location) => {
                "Location permission denied".to_string()
            }
            Self::PermissionDenied(Permission::Messaging) => "SMS permission denied".to_string(),
            Self::PermissionDenied(Permission::Notifications) => {
                "Notification permission denied".to_string()
            }
            Self::MessageSend { message, .. } => format!("Failed to send SMS: {message}"),
            Self::NotSignedIn => "Please sign in first".to_string(),
            Self::Validation(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}
