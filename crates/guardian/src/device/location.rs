//! A location source that replays a recorded track.
//!
//! The source polls the track at the requested interval, one waypoint per
//! tick, and stays on the final waypoint once the track is exhausted. A fix is
//! only delivered when it is at least `min_distance_meters` away from the
//! previously delivered one.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, trace};

use crate::error::{Error, Permission, Result};
use crate::location::{LocationFix, LocationSource, UpdateRequest};

/// Parse a track: one `latitude,longitude` pair per line.
///
/// Blank lines and lines starting with `#` are ignored.
///
/// # Errors
///
/// Returns [`Error::TrackParse`] naming the first bad line, or line 0 if the
/// track has no waypoints.
pub fn parse_track(text: &str, path: &Path) -> Result<Vec<LocationFix>> {
    let parse_error = |line: usize, message: String| Error::TrackParse {
        path: path.to_path_buf(),
        line,
        message,
    };

    let mut points = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (lat, lon) = line
            .split_once(',')
            .ok_or_else(|| parse_error(index + 1, "expected 'latitude,longitude'".to_string()))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|e| parse_error(index + 1, format!("latitude: {e}")))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|e| parse_error(index + 1, format!("longitude: {e}")))?;
        let fix = LocationFix::new(latitude, longitude)
            .map_err(|e| parse_error(index + 1, e.to_string()))?;
        points.push(fix);
    }

    if points.is_empty() {
        return Err(parse_error(0, "track has no waypoints".to_string()));
    }
    Ok(points)
}

#[derive(Debug)]
struct Subscription {
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Replays a fixed list of waypoints as location updates.
#[derive(Debug)]
pub struct ReplayLocationSource {
    track: Arc<Vec<LocationFix>>,
    granted: bool,
    last_emitted: Arc<Mutex<Option<LocationFix>>>,
    subscription: Mutex<Option<Subscription>>,
}

impl ReplayLocationSource {
    /// Create a source from waypoints.
    ///
    /// # Errors
    ///
    /// Returns an error if `track` is empty.
    pub fn new(track: Vec<LocationFix>, granted: bool) -> Result<Self> {
        if track.is_empty() {
            return Err(Error::internal("replay track must have at least one waypoint"));
        }
        Ok(Self {
            track: Arc::new(track),
            granted,
            last_emitted: Arc::new(Mutex::new(None)),
            subscription: Mutex::new(None),
        })
    }

    /// A source that never moves.
    #[must_use]
    pub fn stationary(fix: LocationFix, granted: bool) -> Self {
        Self {
            track: Arc::new(vec![fix]),
            granted,
            last_emitted: Arc::new(Mutex::new(None)),
            subscription: Mutex::new(None),
        }
    }

    /// Load a track file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>, granted: bool) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let track = parse_track(&text, path)?;
        debug!(path = %path.display(), waypoints = track.len(), "Loaded track");
        Self::new(track, granted)
    }

    /// Number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.track.len()
    }

    /// Always false; a track has at least one waypoint.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }

    /// Whether updates are currently flowing.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .map(|sub| {
                sub.as_ref()
                    .is_some_and(|s| s.running.load(Ordering::SeqCst))
            })
            .unwrap_or(false)
    }

    fn check_permission(&self) -> Result<()> {
        if self.granted {
            Ok(())
        } else {
            Err(Error::PermissionDenied(Permission::Location))
        }
    }
}

#[async_trait::async_trait]
impl LocationSource for ReplayLocationSource {
    fn name(&self) -> &'static str {
        "replay"
    }

    async fn last_known(&self) -> Result<Option<LocationFix>> {
        self.check_permission()?;
        let last = *self
            .last_emitted
            .lock()
            .map_err(|_| Error::internal("location state lock poisoned"))?;
        Ok(last.or_else(|| {
            self.track.first().map(|p| LocationFix {
                timestamp: Utc::now(),
                ..*p
            })
        }))
    }

    async fn subscribe(&self, request: UpdateRequest, tx: mpsc::Sender<LocationFix>) -> Result<()> {
        self.check_permission()?;

        let mut slot = self
            .subscription
            .lock()
            .map_err(|_| Error::internal("location subscription lock poisoned"))?;
        if slot
            .as_ref()
            .is_some_and(|s| s.running.load(Ordering::SeqCst))
        {
            return Err(Error::AlreadySubscribed { name: self.name() });
        }

        debug!(
            interval_ms = request.interval.as_millis(),
            min_distance_m = request.min_distance_meters,
            "Starting location replay"
        );

        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(replay(
            Arc::clone(&self.track),
            Arc::clone(&self.last_emitted),
            Arc::clone(&running),
            request,
            tx,
        ));
        *slot = Some(Subscription { running, task });
        Ok(())
    }

    fn unsubscribe(&self) {
        let Ok(mut slot) = self.subscription.lock() else {
            return;
        };
        if let Some(sub) = slot.take() {
            debug!("Stopping location replay");
            sub.running.store(false, Ordering::SeqCst);
            sub.task.abort();
        }
    }
}

async fn replay(
    track: Arc<Vec<LocationFix>>,
    last_emitted: Arc<Mutex<Option<LocationFix>>>,
    running: Arc<AtomicBool>,
    request: UpdateRequest,
    tx: mpsc::Sender<LocationFix>,
) {
    let mut ticker = interval(request.interval);
    let mut cursor = 0usize;

    while running.load(Ordering::SeqCst) {
        ticker.tick().await;

        let Some(point) = track.get(cursor.min(track.len().saturating_sub(1))) else {
            break;
        };
        cursor = cursor.saturating_add(1);
        let fix = LocationFix {
            timestamp: Utc::now(),
            ..*point
        };

        let emit = match last_emitted.lock() {
            Ok(mut last) => {
                let baseline = last.or_else(|| track.first().copied());
                let moved = baseline.map_or(f64::INFINITY, |p| p.distance_to(&fix));
                if moved < request.min_distance_meters {
                    trace!(moved, "Below minimum displacement, skipping");
                    false
                } else {
                    *last = Some(fix);
                    true
                }
            }
            Err(_) => break,
        };
        if !emit {
            continue;
        }

        if tx.send(fix).await.is_err() {
            debug!("Location channel closed, stopping replay");
            break;
        }
    }

    running.store(false, Ordering::SeqCst);
    debug!("Location replay stopped");
}
