//! Simulated GPS receiver, cameras and marker detection primitive.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Utc;
use comms_if::eqpt::{
    cam::{
        CamError, CamId, CamImage, Camera, CameraProvider, MarkerDictionary, MarkerPrimitive,
        PixelPoint, Quad,
    },
    gps::{Coordinate, GpsError, GpsFix, GpsReceiver},
};
use image::{DynamicImage, GrayImage};
use log::info;

use crate::auto::per::{CameraCalibration, RangeEstimator};

use super::{lock, SharedWorld};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Error estimate reported with every simulated fix.
const SIM_FIX_ERROR_MM: f64 = 10.0;

/// Side of the placeholder frames. Marker positions come from the calibration, not the frame.
const SIM_FRAME_SIZE_PX: u32 = 8;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// GPS receiver reporting the rover's true position.
pub struct SimGps {
    world: SharedWorld,
    initialised: bool,
}

#[derive(Debug, Default)]
pub struct SimCameraProvider;

/// Camera producing blank frames, the markers in view come from [`SimMarkerPrimitive`].
pub struct SimCamera {
    id: CamId,
}

/// Projects the world's markers into the camera frame.
pub struct SimMarkerPrimitive {
    world: SharedWorld,
    cal: CameraCalibration,
    max_range_cm: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimGps {
    pub fn new(world: SharedWorld) -> Self {
        Self {
            world,
            initialised: true,
        }
    }

    fn position(&self) -> Coordinate {
        lock(&self.world).position
    }
}

impl GpsReceiver for SimGps {
    fn init(&mut self, host: &str, port: u16) -> Result<(), GpsError> {
        info!("Simulated GPS standing in for {}:{}", host, port);
        self.initialised = true;
        Ok(())
    }

    fn latitude(&mut self) -> f64 {
        self.position().latitude
    }

    fn longitude(&mut self) -> f64 {
        self.position().longitude
    }

    fn height(&mut self) -> f64 {
        0.0
    }

    fn time(&mut self) -> u64 {
        lock(&self.world).time_ms
    }

    fn horizontal_error(&mut self) -> f64 {
        SIM_FIX_ERROR_MM
    }

    fn vertical_error(&mut self) -> f64 {
        SIM_FIX_ERROR_MM
    }

    fn finish(&mut self) {
        self.initialised = false;
    }

    /// Read the whole fix under one lock so it is never split across a world update.
    fn reading(&mut self) -> Option<GpsFix> {
        if !self.initialised {
            return None;
        }

        let world = lock(&self.world);

        Some(GpsFix {
            coordinates: world.position,
            height_m: 0.0,
            time_ms: world.time_ms,
            horizontal_error_mm: SIM_FIX_ERROR_MM,
            vertical_error_mm: SIM_FIX_ERROR_MM,
            true_bearing_deg: None,
        })
    }
}

impl CameraProvider for SimCameraProvider {
    fn open(&mut self, id: CamId) -> Result<Box<dyn Camera>, CamError> {
        Ok(Box::new(SimCamera { id }))
    }
}

impl Camera for SimCamera {
    fn id(&self) -> CamId {
        self.id
    }

    fn capture(&mut self) -> Result<CamImage, CamError> {
        Ok(CamImage {
            timestamp: Utc::now(),
            image: DynamicImage::ImageLuma8(GrayImage::new(SIM_FRAME_SIZE_PX, SIM_FRAME_SIZE_PX)),
        })
    }
}

impl SimMarkerPrimitive {
    pub fn new(world: SharedWorld, cal: CameraCalibration, max_range_cm: f64) -> Self {
        Self {
            world,
            cal,
            max_range_cm,
        }
    }
}

impl MarkerPrimitive for SimMarkerPrimitive {
    fn detect(&self, _frame: &GrayImage, dict: MarkerDictionary) -> Vec<(u32, Quad)> {
        let estimator = RangeEstimator::new(self.cal);
        let half_fov_deg = self.cal.degrees_per_pixel * self.cal.frame_width as f64 / 2.0;
        let centre = PixelPoint::new(
            self.cal.frame_width as f64 / 2.0,
            self.cal.frame_height as f64 / 2.0,
        );

        lock(&self.world)
            .marker_views()
            .into_iter()
            .filter(|(id, dist_cm, angle_deg)| {
                dict.contains(*id)
                    && *dist_cm > 0.0
                    && *dist_cm <= self.max_range_cm
                    && angle_deg.abs() < half_fov_deg
            })
            .map(|(id, dist_cm, angle_deg)| {
                let width_px = self.cal.known_marker_width_cm
                    * estimator.effective_focal_length(angle_deg, 0.0)
                    / dist_cm;
                let x = centre.x + angle_deg / self.cal.degrees_per_pixel;

                (id, Quad::square(PixelPoint::new(x, centre.y), width_px))
            })
            .collect()
    }
}
