//! # Marker tracker parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::cam::MarkerDictionary;
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the marker tracker, loaded from `ar_tracker.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArTrackerParams {
    pub calibration: CameraCalibration,

    /// Marker dictionary used by the fiducials
    pub dictionary: MarkerDictionary,

    /// Binarisation cutoffs tried in order, the first one giving the target wins
    pub threshold_cutoffs: Vec<u8>,

    /// Number of attempts made to open each camera
    pub open_attempts: u32,

    /// Delay between camera open attempts
    pub open_backoff_ms: u64,
}

/// Camera model used to turn marker pixel positions into ranges and angles.
///
/// The effective focal length is interpolated between the on-axis value and the values measured
/// with the marker 30 degrees off axis horizontally and vertically.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CameraCalibration {
    /// Horizontal field of view per pixel
    ///
    /// Units: degrees/pixel
    pub degrees_per_pixel: f64,

    /// Vertical field of view per pixel
    ///
    /// Units: degrees/pixel
    pub vdegrees_per_pixel: f64,

    /// Focal length with the marker on the optical axis
    ///
    /// Units: pixels
    pub focal_length: f64,

    /// Focal length with the marker 30 degrees off axis horizontally
    ///
    /// Units: pixels
    pub focal_length_30h: f64,

    /// Focal length with the marker 30 degrees off axis vertically
    ///
    /// Units: pixels
    pub focal_length_30v: f64,

    /// Printed width of the marker
    ///
    /// Units: centimeters
    pub known_marker_width_cm: f64,

    pub frame_width: u32,

    pub frame_height: u32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArTrackerParams {
    pub fn are_valid(&self) -> Result<(), String> {
        self.calibration.are_valid()?;

        if self.threshold_cutoffs.is_empty() {
            return Err("At least one threshold cutoff is required".into());
        }
        if self.open_attempts == 0 {
            return Err("open_attempts must be at least 1".into());
        }

        Ok(())
    }
}

impl CameraCalibration {
    pub fn are_valid(&self) -> Result<(), String> {
        let positive = [
            ("degrees_per_pixel", self.degrees_per_pixel),
            ("vdegrees_per_pixel", self.vdegrees_per_pixel),
            ("focal_length", self.focal_length),
            ("focal_length_30h", self.focal_length_30h),
            ("focal_length_30v", self.focal_length_30v),
            ("known_marker_width_cm", self.known_marker_width_cm),
        ];

        for (name, val) in positive.iter() {
            if !(*val > 0.0) {
                return Err(format!("Calibration value {} must be positive, got {}", name, val));
            }
        }

        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(format!(
                "Calibration frame size must be non-zero, got {}x{}",
                self.frame_width, self.frame_height
            ));
        }

        Ok(())
    }
}
