//! The SOS session state machine.
//!
//! An [`SosController`] moves through `Idle → ArmedCountdown → Active → Idle`.
//! Arming starts a countdown task; when it reaches zero the controller shows
//! the active notice, sends the last known location to every contact, and
//! then subscribes to location updates, notifying contacts again for each
//! new fix until [`SosController::stop`] is called.
//!
//! Session state lives behind one async mutex that is never held across a
//! collaborator call. Each session carries a generation number; background
//! tasks compare it before acting, so a cancelled or stopped session never
//! sends anything new.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::contact::ContactDirectory;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::indicator::{Feedback, ForegroundIndicator, Notice};
use crate::location::{LocationFix, LocationSource, UpdateRequest};
use crate::notifier::{DispatchReport, Notifier};

/// Capacity of the channel carrying location updates.
const FIX_CHANNEL_CAPACITY: usize = 16;

/// Where the alert is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AlertState {
    /// No alert in progress.
    #[default]
    Idle,
    /// Counting down; can still be cancelled.
    ArmedCountdown {
        /// Seconds until the alert becomes active.
        remaining: u32,
    },
    /// Contacts are being notified.
    Active,
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ArmedCountdown { remaining } => write!(f, "counting down ({remaining}s left)"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Timing parameters for a controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    /// Countdown length in ticks.
    pub countdown: u32,
    /// Length of one countdown tick.
    pub tick: Duration,
    /// Location update cadence while active.
    pub updates: UpdateRequest,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            countdown: 5,
            tick: Duration::from_secs(1),
            updates: UpdateRequest::default(),
        }
    }
}

/// Everything the controller talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Supplies the signed-in user.
    pub identity: Arc<dyn Identity>,
    /// Supplies the contacts to notify.
    pub directory: Arc<dyn ContactDirectory>,
    /// Supplies location fixes.
    pub location: Arc<dyn LocationSource>,
    /// Composes and sends the alert text.
    pub notifier: Notifier,
    /// Persistent notice while the alert runs.
    pub indicator: Arc<dyn ForegroundIndicator>,
    /// Transient messages for the user.
    pub feedback: Arc<dyn Feedback>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("directory", &self.directory.name())
            .field("location", &self.location.name())
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

/// A snapshot of the current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerStatus {
    /// Current state.
    #[serde(flatten)]
    pub state: AlertState,
    /// Most recent fix received in this session.
    pub latest_fix: Option<LocationFix>,
    /// Notifier invocations in this session.
    pub notifications: u64,
    /// Result of the most recent notifier invocation.
    pub last_report: Option<DispatchReport>,
}

#[derive(Debug, Default)]
struct Session {
    state: AlertState,
    generation: u64,
    /// Generation of the session the counters below belong to.
    counted: u64,
    latest_fix: Option<LocationFix>,
    notifications: u64,
    last_report: Option<DispatchReport>,
    halt: Option<oneshot::Sender<()>>,
}

struct Inner {
    collab: Collaborators,
    settings: ControllerSettings,
    session: Mutex<Session>,
    state_tx: watch::Sender<AlertState>,
}

/// Drives one SOS session at a time.
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct SosController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SosController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SosController")
            .field("settings", &self.inner.settings)
            .field("state", &*self.inner.state_tx.borrow())
            .finish_non_exhaustive()
    }
}

impl SosController {
    /// Create an idle controller.
    #[must_use]
    pub fn new(collab: Collaborators, settings: ControllerSettings) -> Self {
        let (state_tx, _) = watch::channel(AlertState::Idle);
        Self {
            inner: Arc::new(Inner {
                collab,
                settings,
                session: Mutex::new(Session::default()),
                state_tx,
            }),
        }
    }

    /// Start the countdown.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the controller is idle.
    pub async fn arm(&self) -> Result<()> {
        let countdown = self.inner.settings.countdown;
        let generation = {
            let mut session = self.inner.session.lock().await;
            if session.state != AlertState::Idle {
                return Err(Error::invalid_transition(session.state, "arm"));
            }
            session.generation += 1;
            session.counted = session.generation;
            session.latest_fix = None;
            session.notifications = 0;
            session.last_report = None;
            self.inner.set_state(
                &mut session,
                AlertState::ArmedCountdown {
                    remaining: countdown,
                },
            );
            session.generation
        };

        info!(countdown, generation, "SOS armed");
        self.inner.show_notice(&Notice::armed(countdown));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(inner.run_countdown(generation));
        Ok(())
    }

    /// Abort the countdown before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless a countdown is running.
    pub async fn cancel(&self) -> Result<()> {
        {
            let mut session = self.inner.session.lock().await;
            if !matches!(session.state, AlertState::ArmedCountdown { .. }) {
                return Err(Error::invalid_transition(session.state, "cancel"));
            }
            session.generation += 1;
            self.inner.set_state(&mut session, AlertState::Idle);
        }

        self.inner.collab.indicator.clear();
        info!("SOS cancelled");
        Ok(())
    }

    /// End an active alert.
    ///
    /// Sends already in flight run to completion; nothing new is sent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the alert is active.
    pub async fn stop(&self) -> Result<()> {
        let halt = {
            let mut session = self.inner.session.lock().await;
            if session.state != AlertState::Active {
                return Err(Error::invalid_transition(session.state, "stop"));
            }
            session.generation += 1;
            self.inner.set_state(&mut session, AlertState::Idle);
            session.halt.take()
        };

        if let Some(halt) = halt {
            // The update task may already have exited.
            let _ = halt.send(());
        }
        self.inner.collab.location.unsubscribe();
        self.inner.collab.indicator.clear();
        info!("SOS stopped");
        Ok(())
    }

    /// Current state.
    pub async fn state(&self) -> AlertState {
        self.inner.session.lock().await.state
    }

    /// Snapshot of the current session.
    pub async fn status(&self) -> ControllerStatus {
        let session = self.inner.session.lock().await;
        ControllerStatus {
            state: session.state,
            latest_fix: session.latest_fix,
            notifications: session.notifications,
            last_report: session.last_report.clone(),
        }
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<AlertState> {
        self.inner.state_tx.subscribe()
    }
}

impl Inner {
    fn set_state(&self, session: &mut Session, next: AlertState) {
        session.state = next;
        self.state_tx.send_replace(next);
    }

    async fn is_current(&self, generation: u64) -> bool {
        let session = self.session.lock().await;
        session.generation == generation && session.state == AlertState::Active
    }

    fn report(&self, err: &Error) {
        self.collab.feedback.notify(&err.user_message());
    }

    fn show_notice(&self, notice: &Notice) {
        if let Err(e) = self.collab.indicator.show(notice) {
            warn!(error = %e, "Could not show alert notice");
            self.report(&e);
        }
    }

    async fn run_countdown(self: Arc<Self>, generation: u64) {
        let mut ticker = interval(self.settings.tick);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let remaining = {
                let mut session = self.session.lock().await;
                if session.generation != generation {
                    debug!(generation, "Countdown superseded");
                    return;
                }
                let AlertState::ArmedCountdown { remaining } = session.state else {
                    return;
                };
                let remaining = remaining.saturating_sub(1);
                let next = if remaining == 0 {
                    AlertState::Active
                } else {
                    AlertState::ArmedCountdown { remaining }
                };
                self.set_state(&mut session, next);
                remaining
            };

            if remaining == 0 {
                self.activate(generation).await;
                return;
            }

            debug!(remaining, "SOS countdown");
            if let Err(e) = self.collab.indicator.show(&Notice::armed(remaining)) {
                debug!(error = %e, "Could not refresh countdown notice");
            }
        }
    }

    async fn activate(self: Arc<Self>, generation: u64) {
        info!(generation, "SOS active");
        self.show_notice(&Notice::active());

        match self.collab.location.last_known().await {
            Ok(Some(fix)) => self.handle_fix(generation, fix).await,
            Ok(None) => debug!("No last known location"),
            Err(e) if e.is_permission_error() => {
                warn!(error = %e, "Location unavailable");
                self.report(&e);
                return;
            }
            Err(e) => {
                warn!(error = %e, "Could not read last known location");
                self.report(&e);
            }
        }

        let (tx, rx) = mpsc::channel(FIX_CHANNEL_CAPACITY);
        let (halt_tx, halt_rx) = oneshot::channel();
        {
            let mut session = self.session.lock().await;
            if session.generation != generation || session.state != AlertState::Active {
                return;
            }
            session.halt = Some(halt_tx);
        }
        tokio::spawn(Arc::clone(&self).run_updates(generation, rx, halt_rx));

        if let Err(e) = self.collab.location.subscribe(self.settings.updates, tx).await {
            warn!(source = self.collab.location.name(), error = %e, "Location updates unavailable");
            self.report(&e);
            return;
        }
        debug!(
            source = self.collab.location.name(),
            interval_ms = self.settings.updates.interval.as_millis(),
            min_distance_m = self.settings.updates.min_distance_meters,
            "Subscribed to location updates"
        );

        // Stopped while subscribing.
        if !self.is_current(generation).await {
            self.collab.location.unsubscribe();
        }
    }

    async fn run_updates(
        self: Arc<Self>,
        generation: u64,
        mut rx: mpsc::Receiver<LocationFix>,
        mut halt: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = &mut halt => break,
                next = rx.recv() => match next {
                    Some(fix) => self.handle_fix(generation, fix).await,
                    None => break,
                },
            }
        }
        debug!(generation, "Location update task finished");
    }

    async fn handle_fix(&self, generation: u64, fix: LocationFix) {
        {
            let mut session = self.session.lock().await;
            if session.generation != generation || session.state != AlertState::Active {
                debug!(%fix, "Ignoring fix outside the active session");
                return;
            }
            session.latest_fix = Some(fix);
        }

        let Some(user) = self.collab.identity.current_user() else {
            self.report(&Error::NotSignedIn);
            return;
        };

        let contacts = match self.collab.directory.contacts_for(&user).await {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!(directory = self.collab.directory.name(), error = %e, "Could not load contacts");
                self.report(&e);
                return;
            }
        };
        if contacts.is_empty() {
            self.collab.feedback.notify("No emergency contacts to notify");
            return;
        }

        // A stop while contacts were loading ends the round here.
        {
            let mut session = self.session.lock().await;
            if session.generation != generation || session.state != AlertState::Active {
                debug!(%fix, "Session ended before sending");
                return;
            }
            session.notifications += 1;
        }

        let report = self.collab.notifier.notify(&fix, &contacts).await;

        if report.is_success() {
            self.collab.feedback.notify("Emergency messages sent");
        } else if let Some(reason) = report.first_failure() {
            self.collab.feedback.notify(reason);
        } else {
            self.collab
                .feedback
                .notify("No emergency contacts with a phone number");
        }

        // A stop during the send leaves the counters with this session.
        let mut session = self.session.lock().await;
        if session.counted == generation {
            session.last_report = Some(report);
        }
    }
}
