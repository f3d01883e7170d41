//! Simulated device adapters.
//!
//! These stand in for the phone's positioning, messaging and notification
//! services so the SOS flow can run from a terminal. Which capabilities the
//! user has "granted" comes from configuration.

mod console;
mod location;
mod sms;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Permission, Result};

pub use console::{ConsoleFeedback, ConsoleIndicator};
pub use location::{parse_track, ReplayLocationSource};
pub use sms::OutboxSender;

/// Which device capabilities are granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicePermissions {
    /// Location access.
    pub location: bool,
    /// Sending text messages.
    pub messaging: bool,
    /// Posting notices.
    pub notifications: bool,
}

impl Default for DevicePermissions {
    fn default() -> Self {
        Self::all()
    }
}

impl DevicePermissions {
    /// Every capability granted.
    #[must_use]
    pub fn all() -> Self {
        Self {
            location: true,
            messaging: true,
            notifications: true,
        }
    }

    /// Whether `permission` is granted.
    #[must_use]
    pub fn is_granted(&self, permission: Permission) -> bool {
        match permission {
            Permission::Location => self.location,
            Permission::Messaging => self.messaging,
            Permission::Notifications => self.notifications,
        }
    }

    /// Fail with `PermissionDenied` unless `permission` is granted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] for a refused capability.
    pub fn check(&self, permission: Permission) -> Result<()> {
        if self.is_granted(permission) {
            Ok(())
        } else {
            Err(Error::PermissionDenied(permission))
        }
    }

    /// The refused capabilities.
    #[must_use]
    pub fn denied(&self) -> Vec<Permission> {
        [
            Permission::Location,
            Permission::Messaging,
            Permission::Notifications,
        ]
        .into_iter()
        .filter(|p| !self.is_granted(*p))
        .collect()
    }
}
