//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::directory::DirectoryKind;
use crate::identity::{ProfileField, Registration};
use crate::location::LocationFix;

/// Account registration arguments.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Sign-in email
    #[arg(long)]
    pub email: String,

    /// Sign-in password
    #[arg(long)]
    pub password: String,

    /// Given name
    #[arg(long)]
    pub first_name: String,

    /// Family name
    #[arg(long)]
    pub last_name: String,

    /// Public handle
    #[arg(long)]
    pub username: String,

    /// Your own phone number (digits only, at least 10)
    #[arg(long)]
    pub phone: String,
}

impl From<RegisterCommand> for Registration {
    fn from(cmd: RegisterCommand) -> Self {
        Self {
            first_name: cmd.first_name,
            last_name: cmd.last_name,
            username: cmd.username,
            password: cmd.password,
            email: cmd.email,
            phone: cmd.phone,
        }
    }
}

/// Sign-in arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Sign-in email
    pub email: String,

    /// Sign-in password
    #[arg(long)]
    pub password: String,
}

/// Profile commands.
#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Show your profile
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change one profile field
    Set {
        /// Field name: username, firstName, lastName or phone
        field: ProfileField,

        /// New value
        value: String,
    },
}

/// Emergency contact commands.
#[derive(Debug, Subcommand)]
pub enum ContactsCommand {
    /// List your emergency contacts
    List {
        /// Which contact source to list
        #[arg(short, long, value_enum)]
        source: Option<ContactSourceArg>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add an emergency contact
    Add {
        /// Contact name
        name: String,

        /// Phone number (digits only, at least 10)
        phone: String,
    },

    /// Replace an emergency contact
    Update {
        /// Contact id (see `contacts list`)
        id: i64,

        /// Contact name
        name: String,

        /// Phone number (digits only, at least 10)
        phone: String,
    },

    /// Remove an emergency contact
    Remove {
        /// Contact id (see `contacts list`)
        id: i64,
    },

    /// Set or clear one of the two local emergency numbers
    Slot {
        /// Slot number
        #[arg(value_parser = clap::value_parser!(u8).range(1..=2))]
        slot: u8,

        /// Phone number to store
        #[arg(required_unless_present = "clear")]
        phone: Option<String>,

        /// Clear the slot instead
        #[arg(long, conflicts_with = "phone")]
        clear: bool,
    },
}

/// SOS command arguments.
#[derive(Debug, Args)]
pub struct SosCommand {
    /// Replay this track file as the device position
    #[arg(short, long, value_name = "FILE", conflicts_with = "at")]
    pub track: Option<PathBuf>,

    /// Fixed device position
    #[arg(long, value_name = "LAT,LON", value_parser = parse_position)]
    pub at: Option<LocationFix>,

    /// Stop automatically after this many seconds once active
    #[arg(short, long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Override the countdown length in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u32).range(1..))]
    pub countdown: Option<u32>,

    /// Which contacts to notify
    #[arg(short, long, value_enum)]
    pub source: Option<ContactSourceArg>,
}

/// Outbox commands.
#[derive(Debug, Subcommand)]
pub enum OutboxCommand {
    /// Show recently sent messages
    List {
        /// Maximum number of messages
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete all but the most recent messages
    Prune {
        /// Number of messages to keep
        #[arg(short, long, default_value = "0")]
        keep: usize,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Contact source argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContactSourceArg {
    /// Contacts stored with your account
    Store,
    /// The two local emergency numbers
    Preferences,
}

impl From<ContactSourceArg> for DirectoryKind {
    fn from(arg: ContactSourceArg) -> Self {
        match arg {
            ContactSourceArg::Store => Self::Store,
            ContactSourceArg::Preferences => Self::Preferences,
        }
    }
}

/// Parse `LAT,LON` into a fix.
fn parse_position(s: &str) -> Result<LocationFix, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| "expected LAT,LON".to_string())?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("latitude: {e}"))?;
    let longitude: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("longitude: {e}"))?;
    LocationFix::new(latitude, longitude).map_err(|e| e.to_string())
}
