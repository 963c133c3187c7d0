//! # Marker tracker
//!
//! Owns the rover's cameras and produces one [`MarkerSighting`] per call by scanning the cameras
//! in priority order.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::cam::{CamId, Camera, CameraProvider};
use log::{debug, error, info, warn};
use std::time::Duration;

use super::{
    ArTrackerParams, MarkerDetector, MarkerSighting, MarkerSource, MarkerTarget, RangeEstimator,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct MarkerTracker {
    /// Open cameras in priority order
    cameras: Vec<Box<dyn Camera>>,

    detector: Box<dyn MarkerDetector>,

    estimator: RangeEstimator,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MarkerTrackerError {
    #[error("Invalid ArTracker parameters: {0}")]
    InvalidParams(String),

    #[error("None of the cameras {0:?} could be opened")]
    NoCameras(Vec<CamId>),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MarkerTracker {
    /// Open the cameras in the given priority order and build the tracker.
    ///
    /// Each camera gets `params.open_attempts` tries. Cameras which never open are left out, it is
    /// only an error if none open at all.
    pub fn open<C: CameraProvider>(
        provider: &mut C,
        cam_ids: &[CamId],
        detector: Box<dyn MarkerDetector>,
        params: &ArTrackerParams,
    ) -> Result<Self, MarkerTrackerError> {
        params
            .are_valid()
            .map_err(MarkerTrackerError::InvalidParams)?;

        let backoff = Duration::from_millis(params.open_backoff_ms);
        let mut cameras = Vec::with_capacity(cam_ids.len());

        for id in cam_ids {
            match open_with_retry(provider, *id, params.open_attempts, backoff) {
                Some(c) => {
                    info!("Camera {} opened", id.0);
                    cameras.push(c);
                }
                None => error!(
                    "Camera {} could not be opened after {} attempts, it will not be used",
                    id.0, params.open_attempts
                ),
            }
        }

        if cameras.is_empty() {
            return Err(MarkerTrackerError::NoCameras(cam_ids.to_vec()));
        }

        Ok(Self {
            cameras,
            detector,
            estimator: RangeEstimator::new(params.calibration),
        })
    }

    /// IDs of the cameras in use, in priority order.
    pub fn camera_ids(&self) -> Vec<CamId> {
        self.cameras.iter().map(|c| c.id()).collect()
    }
}

impl MarkerSource for MarkerTracker {
    /// Try each camera in turn, the first one to find the target wins.
    fn sight(&mut self, target: MarkerTarget) -> MarkerSighting {
        for cam in self.cameras.iter_mut() {
            let frame = match cam.capture() {
                Ok(f) => f,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };

            let gray = image::imageops::grayscale(&frame.image);

            if let Some(det) = self.detector.find(&gray, target) {
                let sighting = self.estimator.estimate(&det);

                if sighting.found() {
                    debug!(
                        "Camera {} sees {} at {:.1} cm, {:.1} deg",
                        cam.id().0,
                        target,
                        sighting.distance_cm(),
                        sighting.angle_deg()
                    );
                    return sighting;
                }
            }
        }

        MarkerSighting::NotFound
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn open_with_retry<C: CameraProvider>(
    provider: &mut C,
    id: CamId,
    attempts: u32,
    backoff: Duration,
) -> Option<Box<dyn Camera>> {
    for attempt in 1..=attempts {
        match provider.open(id) {
            Ok(c) => return Some(c),
            Err(e) => {
                warn!("Attempt {}/{}: {}", attempt, attempts, e);
                if attempt < attempts {
                    std::thread::sleep(backoff);
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::per::{CameraCalibration, MarkerDetection};
    use chrono::Utc;
    use comms_if::eqpt::cam::{CamError, CamImage, MarkerDictionary, PixelPoint, Quad};
    use image::{DynamicImage, GrayImage, Luma};
    use std::collections::HashMap;

    /// Camera producing a frame whose top-left pixel holds the camera's "view" value
    struct FakeCamera {
        id: CamId,
        view: Option<u8>,
    }

    impl Camera for FakeCamera {
        fn id(&self) -> CamId {
            self.id
        }

        fn capture(&mut self) -> Result<CamImage, CamError> {
            match self.view {
                Some(v) => {
                    let mut img = GrayImage::new(4, 4);
                    img.put_pixel(0, 0, Luma([v]));
                    Ok(CamImage {
                        timestamp: Utc::now(),
                        image: DynamicImage::ImageLuma8(img),
                    })
                }
                None => Err(CamError::ReadFailed(self.id, "unplugged".into())),
            }
        }
    }

    struct FakeProvider {
        views: HashMap<u32, Option<u8>>,
        failures_before_open: HashMap<u32, u32>,
    }

    impl CameraProvider for FakeProvider {
        fn open(&mut self, id: CamId) -> Result<Box<dyn Camera>, CamError> {
            let remaining = self.failures_before_open.entry(id.0).or_insert(0);
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CamError::OpenFailed(id, "busy".into()));
            }

            match self.views.get(&id.0) {
                Some(v) => Ok(Box::new(FakeCamera { id, view: *v })),
                None => Err(CamError::OpenFailed(id, "no such device".into())),
            }
        }
    }

    /// Detector which finds the target at a column given by the frame's top-left pixel, 0 means
    /// no marker in view
    struct ValueDetector;

    impl MarkerDetector for ValueDetector {
        fn find(&self, frame: &GrayImage, _target: MarkerTarget) -> Option<MarkerDetection> {
            match frame.get_pixel(0, 0).0[0] {
                0 => None,
                v => Some(MarkerDetection::Single(Quad::square(
                    PixelPoint::new(v as f64, 240.0),
                    10.0,
                ))),
            }
        }
    }

    fn params() -> ArTrackerParams {
        ArTrackerParams {
            calibration: CameraCalibration {
                degrees_per_pixel: 1.0,
                vdegrees_per_pixel: 1.0,
                focal_length: 100.0,
                focal_length_30h: 100.0,
                focal_length_30v: 100.0,
                known_marker_width_cm: 10.0,
                frame_width: 200,
                frame_height: 480,
            },
            dictionary: MarkerDictionary::Dict4x4_50,
            threshold_cutoffs: vec![40, 100, 160, 220],
            open_attempts: 3,
            open_backoff_ms: 0,
        }
    }

    #[test]
    fn test_first_camera_success_wins() {
        let mut provider = FakeProvider {
            views: vec![(0, Some(0)), (1, Some(110)), (2, Some(150))].into_iter().collect(),
            failures_before_open: HashMap::new(),
        };

        let mut tracker = MarkerTracker::open(
            &mut provider,
            &[CamId(0), CamId(1), CamId(2)],
            Box::new(ValueDetector),
            &params(),
        )
        .unwrap();

        // Camera 0 sees nothing, camera 1 sees the marker 10 px right of centre
        let s = tracker.sight(MarkerTarget::Single(1));
        assert_eq!(s, MarkerSighting::Found { distance_cm: 100.0, angle_deg: 10.0 });
    }

    #[test]
    fn test_read_failure_skips_camera() {
        let mut provider = FakeProvider {
            views: vec![(0, None), (1, Some(90))].into_iter().collect(),
            failures_before_open: HashMap::new(),
        };

        let mut tracker = MarkerTracker::open(
            &mut provider,
            &[CamId(0), CamId(1)],
            Box::new(ValueDetector),
            &params(),
        )
        .unwrap();

        assert_eq!(tracker.sight(MarkerTarget::Single(1)).angle_deg(), -10.0);
    }

    #[test]
    fn test_open_retries_and_exclusion() {
        let mut provider = FakeProvider {
            views: vec![(0, Some(0)), (1, Some(0))].into_iter().collect(),
            failures_before_open: vec![(0, 2), (1, 5)].into_iter().collect(),
        };

        let tracker = MarkerTracker::open(
            &mut provider,
            &[CamId(0), CamId(1), CamId(7)],
            Box::new(ValueDetector),
            &params(),
        )
        .unwrap();

        assert_eq!(tracker.camera_ids(), vec![CamId(0)]);

        let mut tracker = tracker;
        assert_eq!(tracker.sight(MarkerTarget::Single(1)), MarkerSighting::NotFound);
    }

    #[test]
    fn test_no_cameras_is_error() {
        let mut provider = FakeProvider {
            views: HashMap::new(),
            failures_before_open: HashMap::new(),
        };

        assert!(matches!(
            MarkerTracker::open(&mut provider, &[CamId(3)], Box::new(ValueDetector), &params()),
            Err(MarkerTrackerError::NoCameras(_))
        ));
    }
}
