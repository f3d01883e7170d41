//! Test doubles for the controller's collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::contact::{Contact, ContactDirectory};
use crate::error::{Error, Permission, Result};
use crate::identity::{Identity, Registration, UserId};
use crate::indicator::{Feedback, ForegroundIndicator, Notice};
use crate::location::{LocationFix, LocationSource, UpdateRequest};
use crate::notifier::MessageSender;

/// Records every text instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    failures: Mutex<HashMap<String, String>>,
    denied: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `recipient` fail with `message`.
    pub fn fail_for(&self, recipient: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(recipient.to_string(), message.to_string());
    }

    pub fn deny(&self) {
        self.denied.store(true, Ordering::SeqCst);
    }

    /// Make each send take `delay` before it completes.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// `(recipient, body)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MessageSender for RecordingSender {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send_text(&self, recipient: &str, body: &str) -> Result<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.denied.load(Ordering::SeqCst) {
            return Err(Error::PermissionDenied(Permission::Messaging));
        }
        if let Some(message) = self.failures.lock().unwrap().get(recipient) {
            return Err(Error::message_send(recipient, message.clone()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), body.to_string()));
        Ok(())
    }
}

/// A location source driven by the test.
///
/// Unsubscribing is counted but the sender is kept, so tests can keep
/// delivering fixes after a stop.
#[derive(Debug, Default)]
pub struct ManualLocation {
    last_known: Mutex<Option<LocationFix>>,
    tx: Mutex<Option<mpsc::Sender<LocationFix>>>,
    denied: AtomicBool,
    subscribes: AtomicUsize,
    unsubscribes: AtomicUsize,
}

impl ManualLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_last_known(&self, fix: LocationFix) {
        *self.last_known.lock().unwrap() = Some(fix);
    }

    pub fn deny(&self) {
        self.denied.store(true, Ordering::SeqCst);
    }

    /// Deliver a fix to the current subscriber. Returns whether it was accepted.
    pub async fn push(&self, fix: LocationFix) -> bool {
        let tx = self.tx.lock().unwrap().clone();
        match tx {
            Some(tx) => tx.send(fix).await.is_ok(),
            None => false,
        }
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LocationSource for ManualLocation {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn last_known(&self) -> Result<Option<LocationFix>> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(Error::PermissionDenied(Permission::Location));
        }
        Ok(*self.last_known.lock().unwrap())
    }

    async fn subscribe(&self, _request: UpdateRequest, tx: mpsc::Sender<LocationFix>) -> Result<()> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(Error::PermissionDenied(Permission::Location));
        }
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        *self.tx.lock().unwrap() = Some(tx);
        Ok(())
    }

    fn unsubscribe(&self) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
    }
}

/// An identity provider with a fixed current user.
#[derive(Debug)]
pub struct StaticIdentity {
    user: Option<UserId>,
}

impl StaticIdentity {
    pub fn signed_in(user: &str) -> Self {
        Self {
            user: Some(UserId::new(user)),
        }
    }

    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

#[async_trait::async_trait]
impl Identity for StaticIdentity {
    async fn register(&self, _registration: &Registration) -> Result<UserId> {
        Err(Error::internal("static identity cannot register"))
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<UserId> {
        self.user.clone().ok_or(Error::InvalidCredentials)
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }

    fn current_user(&self) -> Option<UserId> {
        self.user.clone()
    }
}

/// A directory returning a fixed list, or always failing.
#[derive(Debug)]
pub struct StaticDirectory {
    contacts: Option<Vec<Contact>>,
}

impl StaticDirectory {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: Some(contacts),
        }
    }

    pub fn failing() -> Self {
        Self { contacts: None }
    }
}

#[async_trait::async_trait]
impl ContactDirectory for StaticDirectory {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn contacts_for(&self, _user: &UserId) -> Result<Vec<Contact>> {
        self.contacts
            .clone()
            .ok_or_else(|| Error::internal("directory unavailable"))
    }
}

/// Records notices instead of displaying them.
#[derive(Debug, Default)]
pub struct RecordingIndicator {
    shown: Mutex<Vec<Notice>>,
    clears: AtomicUsize,
    denied: AtomicBool,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(&self) {
        self.denied.store(true, Ordering::SeqCst);
    }

    pub fn shown(&self) -> Vec<Notice> {
        self.shown.lock().unwrap().clone()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl ForegroundIndicator for RecordingIndicator {
    fn show(&self, notice: &Notice) -> Result<()> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(Error::PermissionDenied(Permission::Notifications));
        }
        self.shown.lock().unwrap().push(notice.clone());
        Ok(())
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records transient messages.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    messages: Mutex<Vec<String>>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Feedback for RecordingFeedback {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
