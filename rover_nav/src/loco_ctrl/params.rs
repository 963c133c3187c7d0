//! Parameters structure for LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits applied to the differential drive output.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Params {

    /// Lowest wheel speed that can be commanded (full reverse).
    pub min_speed: f64,

    /// Highest wheel speed that can be commanded (full forward).
    pub max_speed: f64,

    /// Speeds with a magnitude below this stall the wheels.
    pub dead_zone: f64,

    /// Magnitude that speeds inside the dead zone are bumped up to.
    pub dead_zone_floor: f64,

    /// Include the integral term in the output.
    pub use_integral: bool,
}

/// A proportional-integral gain pair.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct PiGains {
    pub k_p: f64,
    pub k_i: f64,
}

/// Gains used while driving forward and while pivoting on the spot.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct GainSchedule {
    pub drive: PiGains,
    pub pivot: PiGains,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn are_valid(&self) -> Result<(), String> {
        if !(self.min_speed < 0.0 && self.max_speed > 0.0) {
            return Err(format!(
                "Speed limits must straddle zero, got [{}, {}]",
                self.min_speed, self.max_speed
            ));
        }
        if self.dead_zone < 0.0 {
            return Err(format!("Dead zone must not be negative, got {}", self.dead_zone));
        }
        if self.dead_zone_floor < self.dead_zone
            || self.dead_zone_floor > self.max_speed
            || -self.dead_zone_floor < self.min_speed
        {
            return Err(format!(
                "Dead zone floor {} must lie between the dead zone {} and the speed limits",
                self.dead_zone_floor, self.dead_zone
            ));
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            min_speed: -90.0,
            max_speed: 90.0,
            dead_zone: 10.0,
            dead_zone_floor: 10.0,
            use_integral: false,
        }
    }
}

impl GainSchedule {
    /// Pick the pivot gains when there is no forward speed, otherwise the drive gains.
    pub fn select(&self, base_speed: f64) -> &PiGains {
        if base_speed == 0.0 {
            &self.pivot
        }
        else {
            &self.drive
        }
    }
}
