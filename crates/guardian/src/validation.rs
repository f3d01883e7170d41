//! Input validation for contacts, registrations and coordinates.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Minimum number of digits in a phone number.
pub const MIN_PHONE_DIGITS: usize = 10;

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
});

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Empty value where one is required.
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Phone number is not at least ten ASCII digits.
    #[error("invalid phone number '{0}': expected at least 10 digits and nothing else")]
    InvalidPhoneNumber(String),

    /// Email is not of the form `local@domain.tld`.
    #[error("invalid email '{0}'")]
    InvalidEmail(String),

    /// Value too long.
    #[error("{field} is too long ({actual} chars, max {max})")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum length.
        max: usize,
        /// Observed length.
        actual: usize,
    },

    /// Latitude or longitude out of range.
    #[error("invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates {
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },

    /// Unknown profile field name.
    #[error("unknown profile field '{0}'")]
    UnknownField(String),

    /// The field exists but cannot be edited.
    #[error("{0} cannot be changed")]
    ReadOnlyField(&'static str),
}

/// Check whether `phone` is a usable emergency number.
///
/// Holds iff the string is non-empty, consists only of ASCII digits, and has
/// at least [`MIN_PHONE_DIGITS`] characters.
#[must_use]
pub fn is_valid_phone_number(phone: &str) -> bool {
    phone.len() >= MIN_PHONE_DIGITS && phone.bytes().all(|b| b.is_ascii_digit())
}

/// Validate a phone number, returning a descriptive error.
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] for blank input and
/// [`ValidationError::InvalidPhoneNumber`] otherwise.
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    if phone.trim().is_empty() {
        return Err(ValidationError::Empty("phone number"));
    }
    if !is_valid_phone_number(phone) {
        return Err(ValidationError::InvalidPhoneNumber(phone.to_string()));
    }
    Ok(())
}

/// Validate that a required text field is not blank.
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] naming the field.
pub fn require_non_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty(field))
    } else {
        Ok(())
    }
}

/// Validate an email address (basic `local@domain.tld` check).
///
/// # Errors
///
/// Returns an error if the email is blank, too long, or malformed.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Empty("email"));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email",
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

/// Validate a latitude/longitude pair in degrees.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidCoordinates`] if either value is
/// non-finite or out of range.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    let ok = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoordinates {
            latitude,
            longitude,
        })
    }
}
