//! A message sender that writes to the local outbox.

use tracing::info;

use crate::error::{Error, Permission, Result};
use crate::notifier::MessageSender;
use crate::storage::{self, SharedStorage};
use crate::validation::is_valid_phone_number;

/// Records outbound texts in storage instead of handing them to a carrier.
#[derive(Debug, Clone)]
pub struct OutboxSender {
    storage: SharedStorage,
    granted: bool,
    max_messages: usize,
}

impl OutboxSender {
    /// Create a sender.
    ///
    /// The outbox is pruned to `max_messages` after each send; 0 keeps
    /// everything.
    #[must_use]
    pub fn new(storage: SharedStorage, granted: bool, max_messages: usize) -> Self {
        Self {
            storage,
            granted,
            max_messages,
        }
    }
}

#[async_trait::async_trait]
impl MessageSender for OutboxSender {
    fn name(&self) -> &'static str {
        "outbox"
    }

    async fn send_text(&self, recipient: &str, body: &str) -> Result<()> {
        if !self.granted {
            return Err(Error::PermissionDenied(Permission::Messaging));
        }
        if !is_valid_phone_number(recipient) {
            return Err(Error::message_send(recipient, "Invalid destination address"));
        }

        let store = storage::lock(&self.storage)?;
        let id = store.record_outbound(recipient, body)?;
        if self.max_messages > 0 {
            store.prune_outbox_keep_recent(self.max_messages)?;
        }
        info!(id, to = %recipient, len = body.len(), "Text message queued");
        Ok(())
    }
}
