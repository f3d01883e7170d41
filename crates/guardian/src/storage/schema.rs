//! `SQLite` schema definitions for guardian.
//!
//! Version 1 holds accounts, contacts and the key-value preference store.
//! Version 2 adds the outbound message log.

/// Accounts and their profile fields.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    username TEXT NOT NULL DEFAULT '',
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
)
";

/// Emergency contacts, owned by a user.
pub const CREATE_CONTACTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// Index for listing a user's contacts.
pub const CREATE_CONTACTS_USER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_contacts_user ON contacts(user_id)
";

/// Local key-value preference store.
pub const CREATE_PREFERENCES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Texts handed to the simulated message channel.
pub const CREATE_OUTBOX_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS outbox (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient TEXT NOT NULL,
    body TEXT NOT NULL,
    sent_at TEXT NOT NULL
)
";

/// Index for reading the outbox newest-first.
pub const CREATE_OUTBOX_SENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_outbox_sent_at ON outbox(sent_at DESC)
";

/// Base schema (version 1) statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_USERS_TABLE,
    CREATE_CONTACTS_TABLE,
    CREATE_CONTACTS_USER_INDEX,
    CREATE_PREFERENCES_TABLE,
    CREATE_METADATA_TABLE,
];

/// Statements applied by the version 2 migration.
pub const OUTBOX_STATEMENTS: &[&str] = &[CREATE_OUTBOX_TABLE, CREATE_OUTBOX_SENT_INDEX];
