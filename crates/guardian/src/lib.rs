//! `guardian` - Personal-safety SOS alerts
//!
//! This library keeps a user's emergency contacts and, when an SOS is
//! triggered, counts down, then texts each contact a map link to the user's
//! position for as long as the alert stays active.
//!
//! The [`SosController`] orchestrates the alert. Everything it talks to is
//! injected through [`Collaborators`]: a [`LocationSource`], a
//! [`ContactDirectory`], a [`Notifier`] over a [`MessageSender`], an
//! [`Identity`] provider, and the user-facing [`ForegroundIndicator`] and
//! [`Feedback`] surfaces. The [`device`] module provides simulated adapters
//! backed by local storage and the terminal.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod contact;
pub mod controller;
pub mod device;
pub mod directory;
pub mod error;
pub mod identity;
pub mod indicator;
pub mod location;
pub mod logging;
pub mod notifier;
pub mod storage;
pub mod validation;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use contact::{Contact, ContactDirectory};
pub use controller::{AlertState, Collaborators, ControllerSettings, ControllerStatus, SosController};
pub use error::{Error, Permission, Result};
pub use identity::{Identity, LocalIdentity, UserId, UserProfile};
pub use indicator::{Feedback, ForegroundIndicator, Notice};
pub use location::{LocationFix, LocationSource, UpdateRequest};
pub use logging::init_logging;
pub use notifier::{DispatchReport, MessageSender, Notifier};
pub use storage::{Storage, StorageStats};
pub use validation::is_valid_phone_number;
