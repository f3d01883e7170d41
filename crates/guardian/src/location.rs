//! Location fixes and the location source abstraction.
//!
//! A [`LocationSource`] supplies a last-known position and a stream of
//! position updates. The SOS controller only ever holds the most recent fix.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::validation::{validate_coordinates, ValidationError};

/// Mean Earth radius used for great-circle distances.
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// A single location reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    /// Create a fix taken now.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinates are out of range.
    pub fn new(latitude: f64, longitude: f64) -> std::result::Result<Self, ValidationError> {
        Self::at(latitude, longitude, Utc::now())
    }

    /// Create a fix with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinates are out of range.
    pub fn at(
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
    ) -> std::result::Result<Self, ValidationError> {
        validate_coordinates(latitude, longitude)?;
        Ok(Self {
            latitude,
            longitude,
            timestamp,
        })
    }

    /// Great-circle distance to another fix in meters (haversine).
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
    }

    /// Map link for this fix, e.g. `https://maps.google.com/?q=12.5,77.25`.
    #[must_use]
    pub fn map_link(&self, base: &str) -> String {
        format!("{base}{},{}", self.latitude, self.longitude)
    }
}

impl std::fmt::Display for LocationFix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// How often the subscriber wants updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateRequest {
    /// Minimum time between updates.
    pub interval: Duration,
    /// Minimum displacement between consecutive updates, in meters.
    pub min_distance_meters: f64,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            min_distance_meters: 10.0,
        }
    }
}

/// A provider of position fixes.
///
/// Implementors wrap a positioning backend. Fixes are delivered serially on
/// the channel passed to [`subscribe`](Self::subscribe) until
/// [`unsubscribe`](Self::unsubscribe) is called or the receiver is dropped.
#[async_trait::async_trait]
pub trait LocationSource: Send + Sync {
    /// The name of this source (for logging).
    fn name(&self) -> &'static str;

    /// The most recent fix the device already has, if any.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if location access is not granted.
    async fn last_known(&self) -> Result<Option<LocationFix>>;

    /// Begin delivering fixes according to `request`.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if location access is not granted, or
    /// `AlreadySubscribed` if updates are already flowing.
    async fn subscribe(&self, request: UpdateRequest, tx: mpsc::Sender<LocationFix>)
        -> Result<()>;

    /// Stop delivering fixes. Idempotent.
    fn unsubscribe(&self);
}
