//! # Camera Equipment Interface
//!
//! Frame capture and the fiducial pixel-detection primitive are provided by external bindings,
//! this module defines the capabilities the navigation software consumes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Index of a camera on the rover.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct CamId(pub u32);

/// A frame captured by a camera
#[derive(Clone)]
pub struct CamImage {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The image itself
    pub image: DynamicImage,
}

/// A point in image coordinates, x to the right and y down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

/// The four corners of a detected marker in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub top_left: PixelPoint,
    pub top_right: PixelPoint,
    pub bottom_right: PixelPoint,
    pub bottom_left: PixelPoint,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Marker dictionaries supported by the detection primitive.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
pub enum MarkerDictionary {
    /// 4x4 bit ArUco markers, IDs 0 to 49.
    Dict4x4_50,
}

#[derive(Debug, thiserror::Error)]
pub enum CamError {
    #[error("Could not open camera {0:?}: {1}")]
    OpenFailed(CamId, String),

    #[error("Could not read a frame from camera {0:?}: {1}")]
    ReadFailed(CamId, String),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// An open camera handle.
pub trait Camera: Send {
    fn id(&self) -> CamId;

    fn capture(&mut self) -> Result<CamImage, CamError>;
}

/// Opens camera handles by index.
pub trait CameraProvider {
    fn open(&mut self, id: CamId) -> Result<Box<dyn Camera>, CamError>;
}

/// The pixel-level fiducial detection primitive.
pub trait MarkerPrimitive: Send {
    /// Detect all markers of the dictionary in the (binarised) frame, returning each marker's ID
    /// and corners in detection order.
    fn detect(&self, frame: &GrayImage, dict: MarkerDictionary) -> Vec<(u32, Quad)>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Quad {
    /// Mean of the four corners.
    pub fn center(&self) -> PixelPoint {
        PixelPoint {
            x: (self.top_left.x + self.top_right.x + self.bottom_right.x + self.bottom_left.x)
                / 4.0,
            y: (self.top_left.y + self.top_right.y + self.bottom_right.y + self.bottom_left.y)
                / 4.0,
        }
    }

    /// Mean of the top and bottom edge spans along x.
    pub fn width_px(&self) -> f64 {
        ((self.top_right.x - self.top_left.x) + (self.bottom_right.x - self.bottom_left.x)) / 2.0
    }

    /// Axis aligned square quad, used by simulated detectors.
    pub fn square(center: PixelPoint, width_px: f64) -> Self {
        let h = width_px / 2.0;
        Self {
            top_left: PixelPoint::new(center.x - h, center.y - h),
            top_right: PixelPoint::new(center.x + h, center.y - h),
            bottom_right: PixelPoint::new(center.x + h, center.y + h),
            bottom_left: PixelPoint::new(center.x - h, center.y + h),
        }
    }
}

impl MarkerDictionary {
    /// Number of marker IDs in the dictionary.
    pub fn size(&self) -> u32 {
        match self {
            MarkerDictionary::Dict4x4_50 => 50,
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        id < self.size()
    }
}
