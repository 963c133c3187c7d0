//! # ArUco marker detection
//!
//! The pixel primitive is sensitive to lighting, so each frame is binarised at a series of cutoffs
//! and the primitive run on each in turn until the target turns up.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::cam::{MarkerDictionary, MarkerPrimitive, Quad};
use image::GrayImage;
use log::trace;

use super::{MarkerDetection, MarkerDetector, MarkerTarget};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Multi-threshold ArUco detector built on a pixel primitive.
pub struct ArucoDetector<P: MarkerPrimitive> {
    primitive: P,
    dictionary: MarkerDictionary,
    cutoffs: Vec<u8>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<P: MarkerPrimitive> ArucoDetector<P> {
    pub fn new(primitive: P, dictionary: MarkerDictionary, cutoffs: Vec<u8>) -> Self {
        Self {
            primitive,
            dictionary,
            cutoffs,
        }
    }

    /// Look for the target in one set of primitive detections.
    ///
    /// If an ID was detected more than once the last detection is used.
    fn match_target(detections: &[(u32, Quad)], target: MarkerTarget) -> Option<MarkerDetection> {
        let last = |id: u32| {
            detections
                .iter()
                .rev()
                .find(|(i, _)| *i == id)
                .map(|(_, q)| *q)
        };

        match target {
            MarkerTarget::Single(id) => last(id).map(MarkerDetection::Single),
            MarkerTarget::Gate(a, b) => match (last(a), last(b)) {
                (Some(qa), Some(qb)) => Some(MarkerDetection::Gate(qa, qb)),
                _ => None,
            },
        }
    }
}

impl<P: MarkerPrimitive> MarkerDetector for ArucoDetector<P> {
    fn find(&self, frame: &GrayImage, target: MarkerTarget) -> Option<MarkerDetection> {
        for &cutoff in self.cutoffs.iter() {
            let binary = binarise(frame, cutoff);
            let detections = self.primitive.detect(&binary, self.dictionary);

            if let Some(d) = Self::match_target(&detections, target) {
                trace!("Found {} at cutoff {}", target, cutoff);
                return Some(d);
            }
        }

        None
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Binary threshold, pixels above the cutoff become white and all others black.
pub fn binarise(frame: &GrayImage, cutoff: u8) -> GrayImage {
    let mut out = frame.clone();

    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > cutoff { 255 } else { 0 };
    }

    out
}
