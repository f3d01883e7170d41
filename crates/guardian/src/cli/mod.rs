//! Command-line interface for guardian.
//!
//! This module provides the CLI structure for the `guardctl` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, ContactSourceArg, ContactsCommand, LoginCommand, OutboxCommand,
    ProfileCommand, RegisterCommand, SosCommand, StatusCommand,
};

/// guardctl - Personal safety alerts from the terminal
///
/// Keep a list of emergency contacts and send them your location when you
/// trigger an SOS.
#[derive(Debug, Parser)]
#[command(name = "guardctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account and sign in
    Register(RegisterCommand),

    /// Sign in
    Login(LoginCommand),

    /// Sign out
    Logout,

    /// Show the signed-in account
    Whoami,

    /// View or edit your profile
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Manage emergency contacts
    #[command(subcommand)]
    Contacts(ContactsCommand),

    /// Trigger an SOS alert
    Sos(SosCommand),

    /// Inspect sent messages
    #[command(subcommand)]
    Outbox(OutboxCommand),

    /// Show account, storage and device status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ProfileField;
    use crate::logging::Verbosity;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "guardctl");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::try_parse_from(["guardctl", "-q", "status"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Quiet);

        let cli = Cli::try_parse_from(["guardctl", "status"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Normal);

        let cli = Cli::try_parse_from(["guardctl", "-vv", "status"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Debug);

        let cli = Cli::try_parse_from(["guardctl", "-vvv", "status"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_with_config() {
        let cli = Cli::try_parse_from(["guardctl", "-c", "/custom/config.toml", "whoami"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(cli.command, Command::Whoami));
    }

    #[test]
    fn test_parse_register() {
        let cli = Cli::try_parse_from([
            "guardctl",
            "register",
            "--email",
            "asha@example.com",
            "--password",
            "secret",
            "--first-name",
            "Asha",
            "--last-name",
            "Rao",
            "--username",
            "asha",
            "--phone",
            "9876543210",
        ])
        .unwrap();
        let Command::Register(cmd) = cli.command else {
            panic!("expected register");
        };
        assert_eq!(cmd.email, "asha@example.com");
        assert_eq!(cmd.phone, "9876543210");
    }

    #[test]
    fn test_parse_profile_set() {
        let cli =
            Cli::try_parse_from(["guardctl", "profile", "set", "firstName", "Asha"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Profile(ProfileCommand::Set {
                field: ProfileField::FirstName,
                ..
            })
        ));

        assert!(Cli::try_parse_from(["guardctl", "profile", "set", "age", "30"]).is_err());
    }

    #[test]
    fn test_parse_contacts() {
        let cli =
            Cli::try_parse_from(["guardctl", "contacts", "add", "Mum", "9876543210"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Contacts(ContactsCommand::Add { .. })
        ));

        let cli = Cli::try_parse_from(["guardctl", "contacts", "list", "-s", "preferences"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::Contacts(ContactsCommand::List {
                source: Some(ContactSourceArg::Preferences),
                ..
            })
        ));
    }

    #[test]
    fn test_parse_contact_slot() {
        let cli = Cli::try_parse_from(["guardctl", "contacts", "slot", "2", "1112223333"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Contacts(ContactsCommand::Slot { slot: 2, .. })
        ));

        let cli = Cli::try_parse_from(["guardctl", "contacts", "slot", "1", "--clear"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Contacts(ContactsCommand::Slot { clear: true, phone: None, .. })
        ));

        assert!(Cli::try_parse_from(["guardctl", "contacts", "slot", "3", "1112223333"]).is_err());
        assert!(Cli::try_parse_from(["guardctl", "contacts", "slot", "1"]).is_err());
    }

    #[test]
    fn test_parse_sos() {
        let cli = Cli::try_parse_from(["guardctl", "sos", "--at", "12.97,77.59", "-d", "30"])
            .unwrap();
        let Command::Sos(cmd) = cli.command else {
            panic!("expected sos");
        };
        assert!(cmd.at.is_some());
        assert_eq!(cmd.duration, Some(30));
        assert!(cmd.track.is_none());

        assert!(Cli::try_parse_from([
            "guardctl", "sos", "--at", "1,1", "--track", "walk.csv"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["guardctl", "sos", "--countdown", "0"]).is_err());
    }

    #[test]
    fn test_parse_outbox() {
        let cli = Cli::try_parse_from(["guardctl", "outbox", "list", "-l", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Outbox(OutboxCommand::List { limit: 5, .. })
        ));
    }
}
