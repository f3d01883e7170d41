//! Alert composition and per-contact text delivery.
//!
//! The [`Notifier`] turns a [`LocationFix`] into a human-readable alert with a
//! map link and hands it to a [`MessageSender`] once per contact. Each
//! delivery is attempted independently: one failure never blocks the rest.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::contact::Contact;
use crate::error::Result;
use crate::location::LocationFix;

/// Default text placed before the map link.
pub const DEFAULT_MESSAGE_PREFIX: &str = "EMERGENCY: I need help! My current location is: ";

/// Default map link base; coordinates are appended as `<lat>,<lon>`.
pub const DEFAULT_MAP_BASE_URL: &str = "https://maps.google.com/?q=";

/// A transport for plain-text messages.
#[async_trait::async_trait]
pub trait MessageSender: Send + Sync {
    /// The name of this transport (for logging).
    fn name(&self) -> &'static str;

    /// Send a text message.
    ///
    /// # Arguments
    /// * `recipient` - Phone number
    /// * `body` - Message content
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if sending is not authorized, or
    /// `MessageSend` if the transport rejects the message.
    async fn send_text(&self, recipient: &str, body: &str) -> Result<()>;
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Handed to the transport.
    Sent,
    /// Not attempted because the contact has no number.
    Skipped,
    /// The transport reported an error.
    Failed {
        /// User-facing description of the failure.
        reason: String,
    },
}

/// Delivery result for a single contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    /// Contact display name.
    pub name: String,
    /// Number the message was addressed to.
    pub phone_number: String,
    /// What happened.
    pub outcome: DeliveryOutcome,
}

/// Per-contact results of one notifier invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// The text that was sent.
    pub body: String,
    /// One entry per contact, in directory order.
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    /// Number of messages handed to the transport.
    #[must_use]
    pub fn sent(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Sent))
    }

    /// Number of failed attempts.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Failed { .. }))
    }

    /// Number of contacts without a number.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Skipped))
    }

    /// Batch-level success: at least one message sent and none failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.sent() > 0 && self.failed() == 0
    }

    /// The first failure reason, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&str> {
        self.deliveries.iter().find_map(|d| match &d.outcome {
            DeliveryOutcome::Failed { reason } => Some(reason.as_str()),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&DeliveryOutcome) -> bool) -> usize {
        self.deliveries.iter().filter(|d| pred(&d.outcome)).count()
    }
}

/// Composes alert text and fans it out to contacts.
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn MessageSender>,
    prefix: String,
    map_base_url: String,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("sender", &self.sender.name())
            .field("prefix", &self.prefix)
            .field("map_base_url", &self.map_base_url)
            .finish()
    }
}

impl Notifier {
    /// Create a notifier with the default message wording.
    #[must_use]
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self::with_wording(sender, DEFAULT_MESSAGE_PREFIX, DEFAULT_MAP_BASE_URL)
    }

    /// Create a notifier with custom wording.
    #[must_use]
    pub fn with_wording(
        sender: Arc<dyn MessageSender>,
        prefix: impl Into<String>,
        map_base_url: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            prefix: prefix.into(),
            map_base_url: map_base_url.into(),
        }
    }

    /// Compose the alert text for a fix.
    #[must_use]
    pub fn compose(&self, fix: &LocationFix) -> String {
        format!("{}{}", self.prefix, fix.map_link(&self.map_base_url))
    }

    /// Send the alert for `fix` to every contact.
    ///
    /// Contacts are attempted one after another. A failure is recorded and the
    /// next contact is still attempted. Nothing is retried.
    pub async fn notify(&self, fix: &LocationFix, contacts: &[Contact]) -> DispatchReport {
        let body = self.compose(fix);
        let mut deliveries = Vec::with_capacity(contacts.len());

        for contact in contacts {
            let outcome = if contact.has_number() {
                match self.sender.send_text(&contact.phone_number, &body).await {
                    Ok(()) => {
                        debug!(to = %contact.phone_number, "Alert sent");
                        DeliveryOutcome::Sent
                    }
                    Err(e) => {
                        warn!(to = %contact.phone_number, error = %e, "Alert delivery failed");
                        DeliveryOutcome::Failed {
                            reason: e.user_message(),
                        }
                    }
                }
            } else {
                DeliveryOutcome::Skipped
            };

            deliveries.push(Delivery {
                name: contact.name.clone(),
                phone_number: contact.phone_number.clone(),
                outcome,
            });
        }

        let report = DispatchReport { body, deliveries };
        info!(
            transport = self.sender.name(),
            sent = report.sent(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Dispatched alert"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Permission};
    use crate::testing::RecordingSender;

    fn fix() -> LocationFix {
        LocationFix::new(12.9716, 77.5946).unwrap()
    }

    #[test]
    fn test_compose_default_wording() {
        let notifier = Notifier::new(Arc::new(RecordingSender::new()));
        assert_eq!(
            notifier.compose(&fix()),
            "EMERGENCY: I need help! My current location is: https://maps.google.com/?q=12.9716,77.5946"
        );
    }

    #[test]
    fn test_compose_custom_wording() {
        let notifier = Notifier::with_wording(
            Arc::new(RecordingSender::new()),
            "SOS ",
            "https://example.org/map?ll=",
        );
        assert_eq!(
            notifier.compose(&fix()),
            "SOS https://example.org/map?ll=12.9716,77.5946"
        );
    }

    #[tokio::test]
    async fn test_notify_sends_to_each_contact() {
        let sender = Arc::new(RecordingSender::new());
        let notifier = Notifier::new(sender.clone());
        let contacts = vec![
            Contact::new("Mum", "1111111111"),
            Contact::new("Dad", "2222222222"),
        ];

        let report = notifier.notify(&fix(), &contacts).await;

        assert!(report.is_success());
        assert_eq!(report.sent(), 2);
        let sent = sender.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "1111111111");
        assert_eq!(sent[1].0, "2222222222");
        assert!(sent[0].1.contains("https://maps.google.com/?q=12.9716,77.5946"));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_others() {
        let sender = Arc::new(RecordingSender::new());
        sender.fail_for("1111111111", "no signal");
        let notifier = Notifier::new(sender.clone());
        let contacts = vec![
            Contact::new("Mum", "1111111111"),
            Contact::new("Dad", "2222222222"),
        ];

        let report = notifier.notify(&fix(), &contacts).await;

        assert!(!report.is_success());
        assert_eq!(report.failed(), 1);
        assert_eq!(report.sent(), 1);
        assert_eq!(report.first_failure(), Some("Failed to send SMS: no signal"));
        assert_eq!(sender.sent().len(), 1);
        assert_eq!(sender.sent()[0].0, "2222222222");
    }

    #[tokio::test]
    async fn test_blank_numbers_are_skipped() {
        let sender = Arc::new(RecordingSender::new());
        let notifier = Notifier::new(sender.clone());
        let contacts = vec![Contact::new("Empty", " "), Contact::new("Mum", "1111111111")];

        let report = notifier.notify(&fix(), &contacts).await;

        assert_eq!(report.skipped(), 1);
        assert_eq!(report.sent(), 1);
        assert!(report.is_success());
        assert_eq!(report.deliveries[0].outcome, DeliveryOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_permission_denied_reported_per_contact() {
        let sender = Arc::new(RecordingSender::new());
        sender.deny();
        let notifier = Notifier::new(sender.clone());
        let contacts = vec![Contact::new("Mum", "1111111111")];

        let report = notifier.notify(&fix(), &contacts).await;

        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.first_failure(),
            Some(Error::PermissionDenied(Permission::Messaging).user_message().as_str())
        );
    }

    #[tokio::test]
    async fn test_no_contacts_is_not_success() {
        let notifier = Notifier::new(Arc::new(RecordingSender::new()));
        let report = notifier.notify(&fix(), &[]).await;
        assert!(report.deliveries.is_empty());
        assert!(!report.is_success());
    }

    #[test]
    fn test_report_serializes_outcomes() {
        let report = DispatchReport {
            body: "x".to_string(),
            deliveries: vec![Delivery {
                name: "Mum".to_string(),
                phone_number: "1111111111".to_string(),
                outcome: DeliveryOutcome::Failed {
                    reason: "boom".to_string(),
                },
            }],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"failed\""));
        assert!(json.contains("boom"));
    }
}
