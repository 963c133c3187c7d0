//! Locomotion control module
//!
//! Converts a heading error into differential (skid steer) wheel speeds for the rover's left and
//! right sides.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_skid_steer;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::mech::WheelCommand;
use log::trace;

// Internal
pub use calc_skid_steer::{apply_dead_zone, compute_speeds};
pub use params::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Differential drive controller.
///
/// Owns the error accumulator for the current phase of a manouvre.
#[derive(Debug, Clone)]
pub struct DriveCtrl {
    params: Params,
    error_accumulation: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LocoCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Invalid drive control parameters: {0}")]
    InvalidParams(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCtrl {
    pub fn new(params: Params) -> Result<Self, DriveCtrlError> {
        params.are_valid().map_err(DriveCtrlError::InvalidParams)?;

        Ok(Self {
            params,
            error_accumulation: 0.0,
        })
    }

    /// Compute the wheel command for this tick.
    pub fn step(
        &mut self,
        base_speed: f64,
        error_deg: f64,
        elapsed_ms: f64,
        gains: &GainSchedule
    ) -> WheelCommand {
        let (l, r) = compute_speeds(
            &mut self.error_accumulation,
            base_speed,
            error_deg,
            elapsed_ms,
            gains,
            &self.params
        );

        trace!("DriveCtrl: error {:.2} deg -> [{:.1}, {:.1}]", error_deg, l, r);

        WheelCommand::from_speeds(l, r)
    }

    /// Clear the error accumulator, done at the start of every phase.
    pub fn reset(&mut self) {
        self.error_accumulation = 0.0;
    }

    pub fn error_accumulation(&self) -> f64 {
        self.error_accumulation
    }
}
