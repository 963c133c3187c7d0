//! # Marker range estimation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::cam::{PixelPoint, Quad};

use super::{CameraCalibration, MarkerDetection, MarkerSighting};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Off-axis angle at which the `focal_length_30*` calibration values were measured.
const FOCAL_CAL_ANGLE_DEG: f64 = 30.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Converts marker corners into a distance and horizontal angle.
#[derive(Debug, Clone, Copy)]
pub struct RangeEstimator {
    cal: CameraCalibration,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RangeEstimator {
    pub fn new(cal: CameraCalibration) -> Self {
        Self { cal }
    }

    pub fn estimate(&self, detection: &MarkerDetection) -> MarkerSighting {
        match detection {
            MarkerDetection::Single(q) => self.estimate_single(q),
            MarkerDetection::Gate(a, b) => self.estimate_gate(a, b),
        }
    }

    /// Estimate the range to a single marker.
    pub fn estimate_single(&self, quad: &Quad) -> MarkerSighting {
        let center = quad.center();

        match self.distance_cm(quad, &center) {
            Some(distance_cm) => MarkerSighting::Found {
                distance_cm,
                angle_deg: self.horizontal_angle_deg(center.x),
            },
            None => MarkerSighting::NotFound,
        }
    }

    /// Estimate the range to the midpoint of a pair of gate posts.
    ///
    /// Each post is ranged from its own corners and the two distances averaged.
    pub fn estimate_gate(&self, post_a: &Quad, post_b: &Quad) -> MarkerSighting {
        let ca = post_a.center();
        let cb = post_b.center();

        let (da, db) = match (self.distance_cm(post_a, &ca), self.distance_cm(post_b, &cb)) {
            (Some(a), Some(b)) => (a, b),
            _ => return MarkerSighting::NotFound,
        };

        MarkerSighting::Found {
            distance_cm: (da + db) / 2.0,
            angle_deg: self.horizontal_angle_deg((ca.x + cb.x) / 2.0),
        }
    }

    /// Angle from the optical axis to the pixel column, positive to the right.
    pub fn horizontal_angle_deg(&self, x: f64) -> f64 {
        self.cal.degrees_per_pixel * (x - self.cal.frame_width as f64 / 2.0)
    }

    pub fn vertical_angle_deg(&self, y: f64) -> f64 {
        self.cal.vdegrees_per_pixel * (y - self.cal.frame_height as f64 / 2.0)
    }

    /// Effective focal length for a marker seen at the given off-axis angles.
    ///
    /// Angles beyond the 30 degree calibration points extrapolate linearly.
    pub fn effective_focal_length(&self, h_angle_deg: f64, v_angle_deg: f64) -> f64 {
        let f0 = self.cal.focal_length;

        f0 + (h_angle_deg.abs() / FOCAL_CAL_ANGLE_DEG) * (self.cal.focal_length_30h - f0)
            + (v_angle_deg.abs() / FOCAL_CAL_ANGLE_DEG) * (self.cal.focal_length_30v - f0)
    }

    fn distance_cm(&self, quad: &Quad, center: &PixelPoint) -> Option<f64> {
        let width_px = quad.width_px();
        if !(width_px > 0.0) {
            return None;
        }

        let f = self.effective_focal_length(
            self.horizontal_angle_deg(center.x),
            self.vertical_angle_deg(center.y),
        );

        Some(self.cal.known_marker_width_cm * f / width_px)
    }
}
