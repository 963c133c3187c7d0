//! # Perception module
//!
//! Finds the homing marker (or pair of gate posts) in camera frames and estimates its distance
//! and bearing from the rover.
//!
//! The pipeline is:
//!
//! - [`MarkerTracker`] captures a frame from each camera in priority order,
//! - a [`MarkerDetector`] (e.g. [`ArucoDetector`]) locates the target's corners in the frame,
//! - [`RangeEstimator`] turns the corners into a [`MarkerSighting`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod aruco;
mod params;
mod range;
mod tracker;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::cam::Quad;
use image::GrayImage;
use serde::Serialize;

pub use aruco::ArucoDetector;
pub use params::{ArTrackerParams, CameraCalibration};
pub use range::RangeEstimator;
pub use tracker::{MarkerTracker, MarkerTrackerError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Distance reported by [`MarkerSighting::distance_cm`] when nothing was found.
pub const NOT_FOUND_DISTANCE_CM: f64 = -1.0;

/// Angle reported by [`MarkerSighting::angle_deg`] when nothing was found.
pub const NOT_FOUND_ANGLE_DEG: f64 = -999.9;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of one detection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MarkerSighting {
    Found {
        /// Distance from the camera to the marker
        distance_cm: f64,

        /// Horizontal angle from the camera's optical axis, positive to the right
        angle_deg: f64,
    },
    NotFound,
}

/// What the rover is homing on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerTarget {
    /// A single marker
    Single(u32),

    /// Two gate post markers, the rover homes on the midpoint between them
    Gate(u32, u32),
}

/// Corners of the target located in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerDetection {
    Single(Quad),
    Gate(Quad, Quad),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Locates a target's corners in a grayscale frame.
pub trait MarkerDetector: Send {
    fn find(&self, frame: &GrayImage, target: MarkerTarget) -> Option<MarkerDetection>;
}

/// Source of marker sightings for the state machine, one call per control tick.
pub trait MarkerSource {
    fn sight(&mut self, target: MarkerTarget) -> MarkerSighting;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MarkerSighting {
    pub fn found(&self) -> bool {
        matches!(self, MarkerSighting::Found { .. })
    }

    /// Distance in cm, or [`NOT_FOUND_DISTANCE_CM`].
    pub fn distance_cm(&self) -> f64 {
        match self {
            MarkerSighting::Found { distance_cm, .. } => *distance_cm,
            MarkerSighting::NotFound => NOT_FOUND_DISTANCE_CM,
        }
    }

    /// Angle in degrees, or [`NOT_FOUND_ANGLE_DEG`].
    pub fn angle_deg(&self) -> f64 {
        match self {
            MarkerSighting::Found { angle_deg, .. } => *angle_deg,
            MarkerSighting::NotFound => NOT_FOUND_ANGLE_DEG,
        }
    }
}

impl Default for MarkerSighting {
    fn default() -> Self {
        MarkerSighting::NotFound
    }
}

/// A missing source never sees anything.
impl<M: MarkerSource> MarkerSource for Option<M> {
    fn sight(&mut self, target: MarkerTarget) -> MarkerSighting {
        match self {
            Some(m) => m.sight(target),
            None => MarkerSighting::NotFound,
        }
    }
}

impl MarkerTarget {
    /// All marker IDs making up the target.
    pub fn ids(&self) -> Vec<u32> {
        match self {
            MarkerTarget::Single(id) => vec![*id],
            MarkerTarget::Gate(a, b) => vec![*a, *b],
        }
    }
}

impl std::fmt::Display for MarkerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerTarget::Single(id) => write!(f, "marker {}", id),
            MarkerTarget::Gate(a, b) => write!(f, "gate {}/{}", a, b),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_not_found_sentinels() {
        let s = MarkerSighting::NotFound;
        assert!(!s.found());
        assert_eq!(s.distance_cm(), -1.0);
        assert_eq!(s.angle_deg(), -999.9);

        let s = MarkerSighting::Found { distance_cm: 420.0, angle_deg: -3.5 };
        assert!(s.found());
        assert_eq!(s.distance_cm(), 420.0);
        assert_eq!(s.angle_deg(), -3.5);
    }

    #[test]
    fn test_target_ids() {
        assert_eq!(MarkerTarget::Single(4).ids(), vec![4]);
        assert_eq!(MarkerTarget::Gate(4, 5).ids(), vec![4, 5]);
    }

    struct AlwaysAhead;

    impl MarkerSource for AlwaysAhead {
        fn sight(&mut self, _target: MarkerTarget) -> MarkerSighting {
            MarkerSighting::Found { distance_cm: 500.0, angle_deg: 0.0 }
        }
    }

    #[test]
    fn test_optional_source() {
        let mut none: Option<AlwaysAhead> = None;
        assert_eq!(none.sight(MarkerTarget::Single(1)), MarkerSighting::NotFound);

        let mut some = Some(AlwaysAhead);
        assert!(some.sight(MarkerTarget::Single(1)).found());
    }
}
