//! # AutoMgr Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::loco_ctrl::{self, GainSchedule, PiGains};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the AutoMgr and all its states, loaded from `nav.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoMgrParams {
    /// Forward wheel speed used while driving between waypoints
    pub base_speed: f64,

    /// Gains used for waypoint following and centring
    pub gains: GainSchedule,

    pub drive_ctrl: loco_ctrl::Params,

    pub follow: FollowParams,

    pub centre: CentreParams,

    pub approach: ApproachParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowParams {
    pub tick_ms: u64,

    /// A waypoint is reached once the rover is within this distance
    pub arrival_threshold_km: f64,

    /// Abandon the mission if a single leg takes more ticks than this
    pub max_leg_ticks: Option<u64>,

    /// Open loop manouvre before the first leg when homing on a marker, backs away from the last
    /// marker and gets a GPS heading
    pub kickstart_marker: Vec<KickstartSegment>,

    /// Open loop manouvre before the first leg when there is no marker
    pub kickstart_plain: Vec<KickstartSegment>,
}

/// One timed, open loop part of the kickstart.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct KickstartSegment {
    pub left: f64,
    pub right: f64,
    pub ticks: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CentreParams {
    pub tick_ms: u64,

    /// The marker is centred once its angle is within this tolerance
    pub tolerance_deg: f64,

    /// Ticks without a sighting tolerated once the marker has been seen
    pub loss_tolerance_ticks: u32,

    /// Ticks spent searching for a marker that has never been seen before giving up
    pub max_search_ticks: u64,

    /// Ticks per step of the search sweep
    pub sweep_step_ticks: u64,

    /// Steps of the sweep before it changes direction
    pub sweep_steps_per_phase: u64,

    /// Added to the base speed for the search sweep pivot
    pub sweep_extra_speed: f64,

    /// Stationary ticks at the start of the first sighting nudge
    pub nudge_pause_ticks: u32,

    /// Ticks driving forward at the base speed during the nudge
    pub nudge_drive_ticks: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApproachParams {
    pub tick_ms: u64,

    /// Subtracted from the base speed while approaching
    pub speed_offset: f64,

    /// Stop once the marker is this close
    pub stop_distance_cm: f64,

    /// Ticks without a sighting tolerated before the marker is lost
    pub loss_tolerance_ticks: u32,

    pub gains: PiGains,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CentreParams {
    /// Length of the first sighting nudge, zero if it is disabled.
    pub fn nudge_ticks(&self) -> u32 {
        match self.nudge_pause_ticks + self.nudge_drive_ticks {
            0 => 0,
            n => n + 1,
        }
    }
}

impl AutoMgrParams {
    pub fn are_valid(&self) -> Result<(), String> {
        self.drive_ctrl.are_valid()?;

        if !(self.base_speed > 0.0 && self.base_speed <= self.drive_ctrl.max_speed) {
            return Err(format!("base_speed must be in (0, max_speed], got {}", self.base_speed));
        }
        if self.base_speed - self.approach.speed_offset <= 0.0 {
            return Err("The approach speed offset must leave a positive approach speed".into());
        }
        if self.follow.tick_ms == 0 || self.centre.tick_ms == 0 || self.approach.tick_ms == 0 {
            return Err("State tick periods must be non-zero".into());
        }
        if !(self.follow.arrival_threshold_km > 0.0) {
            return Err("arrival_threshold_km must be positive".into());
        }
        if self.centre.sweep_step_ticks == 0 || self.centre.sweep_steps_per_phase == 0 {
            return Err("The search sweep step sizes must be non-zero".into());
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_params() -> AutoMgrParams {
    AutoMgrParams {
        base_speed: 50.0,
        gains: GainSchedule {
            drive: PiGains { k_p: 0.35, k_i: 0.000035 },
            pivot: PiGains { k_p: 0.6, k_i: 0.0001 },
        },
        drive_ctrl: loco_ctrl::Params::default(),
        follow: FollowParams {
            tick_ms: 200,
            arrival_threshold_km: 0.0025,
            max_leg_ticks: Some(600),
            kickstart_marker: vec![
                KickstartSegment { left: -60.0, right: -60.0, ticks: 10 },
                KickstartSegment { left: 0.0, right: 0.0, ticks: 10 },
                KickstartSegment { left: 80.0, right: 20.0, ticks: 20 },
            ],
            kickstart_plain: vec![KickstartSegment { left: 50.0, right: 50.0, ticks: 15 }],
        },
        centre: CentreParams {
            tick_ms: 100,
            tolerance_deg: 14.0,
            loss_tolerance_ticks: 15,
            max_search_ticks: 300,
            sweep_step_ticks: 20,
            sweep_steps_per_phase: 5,
            sweep_extra_speed: 5.0,
            nudge_pause_ticks: 5,
            nudge_drive_ticks: 8,
        },
        approach: ApproachParams {
            tick_ms: 100,
            speed_offset: 8.0,
            stop_distance_cm: 350.0,
            loss_tolerance_ticks: 15,
            gains: PiGains { k_p: 0.5, k_i: 0.0001 },
        },
    }
}
