//! Log of texts handed to the simulated message channel.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;
use tracing::info;

use super::Storage;
use crate::error::Result;

/// One outbound text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboxMessage {
    /// Row id.
    pub id: i64,
    /// Recipient phone number.
    pub recipient: String,
    /// Message text.
    pub body: String,
    /// When the message was handed off.
    pub sent_at: DateTime<Utc>,
}

impl Storage {
    /// Record an outbound message and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record_outbound(&self, recipient: &str, body: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO outbox (recipient, body, sent_at) VALUES (?1, ?2, ?3)",
            params![recipient, body, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// The most recent outbound messages, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent_outbound(&self, limit: usize) -> Result<Vec<OutboxMessage>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, recipient, body, sent_at FROM outbox
            ORDER BY sent_at DESC, id DESC LIMIT ?1
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let messages = stmt
            .query_map([limit_i64], |row| {
                let sent_at: String = row.get(3)?;
                Ok(OutboxMessage {
                    id: row.get(0)?,
                    recipient: row.get(1)?,
                    body: row.get(2)?,
                    sent_at: DateTime::parse_from_rfc3339(&sent_at)
                        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc)),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    /// Prune the outbox to keep only the most recent N entries.
    ///
    /// Returns the number of messages deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_outbox_keep_recent(&self, keep_count: usize) -> Result<usize> {
        let keep_i64 = i64::try_from(keep_count).unwrap_or(i64::MAX);
        let affected = self.conn.execute(
            r"
            DELETE FROM outbox WHERE id NOT IN (
                SELECT id FROM outbox ORDER BY sent_at DESC, id DESC LIMIT ?1
            )
            ",
            [keep_i64],
        )?;

        if affected > 0 {
            info!("Pruned {} outbox messages to keep {} recent", affected, keep_count);
        }
        Ok(affected)
    }
}
