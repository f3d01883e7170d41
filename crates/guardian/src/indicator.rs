//! User-visible surfaces: the persistent foreground notice and transient
//! feedback messages.

use crate::error::Result;

/// Content of the persistent notice shown while an alert is armed or active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Short headline.
    pub title: String,
    /// Body text.
    pub text: String,
}

impl Notice {
    /// Notice shown during the countdown.
    #[must_use]
    pub fn armed(remaining: u32) -> Self {
        Self {
            title: "Emergency Alert Armed".to_string(),
            text: format!("Sending your location in {remaining}s unless cancelled"),
        }
    }

    /// Notice shown once the alert is active.
    #[must_use]
    pub fn active() -> Self {
        Self {
            title: "Emergency Alert Active".to_string(),
            text: "Your emergency contacts are being notified with your location".to_string(),
        }
    }
}

/// A persistent indicator that stays visible while the alert runs.
pub trait ForegroundIndicator: Send + Sync {
    /// Show or replace the notice.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if notices may not be posted.
    fn show(&self, notice: &Notice) -> Result<()>;

    /// Remove the notice. Idempotent.
    fn clear(&self);
}

/// Short, transient messages for the user (toast-style).
pub trait Feedback: Send + Sync {
    /// Display one message.
    fn notify(&self, message: &str);
}
