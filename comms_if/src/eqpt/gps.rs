//! # GPS Equipment Interface
//!
//! The receiver binding itself lives outside this software, this module defines the capability the
//! navigation software expects from it and the fix data it produces.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A geodetic position in degrees on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub coordinates: Coordinate,

    /// Height above the ellipsoid in meters
    pub height_m: f64,

    /// Receiver time of week in milliseconds
    pub time_ms: u64,

    pub horizontal_error_mm: f64,

    pub vertical_error_mm: f64,

    /// True bearing of travel in degrees `[0, 360)`, derived from the previous fix.
    ///
    /// `None` until two real fixes have been received.
    pub true_bearing_deg: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GpsError {
    #[error("Could not connect to the GPS receiver at {0}:{1}: {2}")]
    ConnectFailed(String, u16, String),

    #[error("The GPS receiver is not initialised")]
    NotInitialised,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Capability provided by a GPS receiver binding.
///
/// A latitude and longitude which are both zero means the receiver does not yet have a fix.
pub trait GpsReceiver: Send {
    fn init(&mut self, host: &str, port: u16) -> Result<(), GpsError>;

    fn latitude(&mut self) -> f64;

    fn longitude(&mut self) -> f64;

    fn height(&mut self) -> f64;

    fn time(&mut self) -> u64;

    fn horizontal_error(&mut self) -> f64;

    fn vertical_error(&mut self) -> f64;

    fn finish(&mut self);

    /// Read all fields into a fix, or `None` if the receiver has no fix yet.
    ///
    /// The returned fix has no bearing, that is derived by the track.
    fn reading(&mut self) -> Option<GpsFix> {
        let coordinates = Coordinate {
            latitude: self.latitude(),
            longitude: self.longitude(),
        };

        if coordinates.is_no_fix() {
            return None;
        }

        Some(GpsFix {
            coordinates,
            height_m: self.height(),
            time_ms: self.time(),
            horizontal_error_mm: self.horizontal_error(),
            vertical_error_mm: self.vertical_error(),
            true_bearing_deg: None,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Returns true if this is the receiver's "no fix yet" value.
    pub fn is_no_fix(&self) -> bool {
        self.latitude + self.longitude == 0.0
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.7}, {:.7})", self.latitude, self.longitude)
    }
}
