//! # [`Centre`] AutoMgr state
//!
//! Pivots the rover until the marker lies within the centring tolerance of straight ahead. Until
//! the marker has been seen for the first time the rover sweeps back and forth searching for it.
//! The first sighting away from straight ahead triggers a short nudge: a pause, a burst forward at
//! the base speed, then a stop, during which sightings are ignored.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use comms_if::eqpt::mech::WheelCommand;
use log::{info, warn};

use crate::auto::per::MarkerSighting;

use super::{
    AutoMgrError,
    AutoMgrPersistantData,
    AutoMgrState,
    FailureCause,
    NavOutcome,
    StepOutput,
    TickInput,
    params::{AutoMgrParams, CentreParams},
    states::{Approach, Stop},
};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Possible transitions:
/// - Approach, once the marker is centred
/// - Stop, if the marker is never found or is lost
#[derive(Debug, Default)]
pub struct Centre {
    /// Set once the marker has been sighted in this state
    seen: bool,

    /// Consecutive ticks without a sighting since the marker was last seen
    lost_ticks: u32,

    /// Ticks spent searching before the first sighting
    search_ticks: u64,

    /// Position in the first sighting nudge, `None` outside of it
    nudge_tick: Option<u32>,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Centre {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_searching(&self) -> bool {
        !self.seen
    }

    pub fn is_nudging(&self) -> bool {
        self.nudge_tick.is_some()
    }

    pub fn step(
        &mut self,
        params: &AutoMgrParams,
        persistant: &mut AutoMgrPersistantData,
        input: &TickInput,
    ) -> Result<StepOutput, AutoMgrError> {
        if let Some(tick) = self.nudge_tick {
            return Ok(StepOutput::hold(self.nudge_command(tick, params)));
        }

        match input.sighting.unwrap_or_default() {
            MarkerSighting::Found { angle_deg, .. } => {
                let first_sighting = !self.seen;
                if first_sighting {
                    info!("Marker found after searching for {} ticks", self.search_ticks);
                }
                self.seen = true;
                self.lost_ticks = 0;

                if angle_deg.abs() <= params.centre.tolerance_deg {
                    info!("Marker centred at {:.1} deg", angle_deg);
                    return Ok(StepOutput::replace(
                        AutoMgrState::Approach(Approach::new()),
                        WheelCommand::ZERO,
                    ));
                }

                if first_sighting && params.centre.nudge_ticks() > 0 {
                    info!("Nudging towards the marker at {:.1} deg", angle_deg);
                    return Ok(StepOutput::hold(self.nudge_command(0, params)));
                }

                let cmd = persistant.drive_ctrl.step(
                    0.0,
                    angle_deg,
                    params.centre.tick_ms as f64,
                    &params.gains,
                );

                Ok(StepOutput::hold(cmd))
            }
            MarkerSighting::NotFound if !self.seen => {
                if self.search_ticks >= params.centre.max_search_ticks {
                    warn!("Marker not found after {} ticks of searching", self.search_ticks);
                    return Ok(StepOutput::replace(
                        AutoMgrState::Stop(Stop::new(NavOutcome::Failure(
                            FailureCause::MarkerNeverFound
                        ))),
                        WheelCommand::ZERO,
                    ));
                }

                let cmd = sweep_command(self.search_ticks, params.base_speed, &params.centre);
                self.search_ticks += 1;

                Ok(StepOutput::hold(cmd))
            }
            MarkerSighting::NotFound => Ok(hold_or_lose(
                &mut self.lost_ticks,
                params.centre.loss_tolerance_ticks,
                persistant.last_cmd,
            )),
        }
    }
}

impl Centre {
    /// Command for the given tick of the nudge, advancing it or ending it after the final stop.
    fn nudge_command(&mut self, tick: u32, params: &AutoMgrParams) -> WheelCommand {
        let pause = params.centre.nudge_pause_ticks;
        let drive = pause + params.centre.nudge_drive_ticks;

        self.nudge_tick = match tick >= drive {
            true => None,
            false => Some(tick + 1),
        };

        if tick >= pause && tick < drive {
            WheelCommand::from_speeds(params.base_speed, params.base_speed)
        }
        else {
            WheelCommand::ZERO
        }
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Search sweep pivot for the given tick.
///
/// The sweep turns one way for `sweep_steps_per_phase` steps of `sweep_step_ticks`, then the other
/// way for the same. The very first step turns left.
pub fn sweep_command(tick: u64, base_speed: f64, params: &CentreParams) -> WheelCommand {
    let step = tick / params.sweep_step_ticks;
    let phase = (step + params.sweep_steps_per_phase - 1) / params.sweep_steps_per_phase;
    let s = base_speed + params.sweep_extra_speed;

    if phase % 2 == 1 {
        WheelCommand::from_speeds(s, -s)
    }
    else {
        WheelCommand::from_speeds(-s, s)
    }
}

/// Keep issuing the last command while the marker is briefly out of sight, stopping once it has
/// been gone for longer than the tolerance.
pub(super) fn hold_or_lose(
    lost_ticks: &mut u32,
    tolerance: u32,
    last_cmd: WheelCommand,
) -> StepOutput {
    *lost_ticks += 1;

    if *lost_ticks > tolerance {
        warn!("Marker lost for {} ticks", lost_ticks);
        StepOutput::replace(
            AutoMgrState::Stop(Stop::new(NavOutcome::Failure(FailureCause::MarkerLost))),
            WheelCommand::ZERO,
        )
    }
    else {
        StepOutput::hold(last_cmd)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::auto_mgr::params::test_params;

    #[test]
    fn test_sweep_pattern() {
        let p = test_params();
        let right = WheelCommand::new(55, -55);
        let left = WheelCommand::new(-55, 55);

        // Step 0 is phase 0, steps 1 to 5 phase 1, 6 to 10 phase 2, ...
        assert_eq!(sweep_command(0, 50.0, &p.centre), left);
        assert_eq!(sweep_command(19, 50.0, &p.centre), left);
        assert_eq!(sweep_command(20, 50.0, &p.centre), right);
        assert_eq!(sweep_command(119, 50.0, &p.centre), right);
        assert_eq!(sweep_command(120, 50.0, &p.centre), left);
        assert_eq!(sweep_command(219, 50.0, &p.centre), left);
        assert_eq!(sweep_command(220, 50.0, &p.centre), right);
    }

    #[test]
    fn test_first_sighting_nudge() {
        let p = test_params();
        let mut persistant = AutoMgrPersistantData {
            drive_ctrl: crate::loco_ctrl::DriveCtrl::new(p.drive_ctrl).unwrap(),
            target: None,
            last_cmd: WheelCommand::ZERO,
            num_ticks: 0,
        };
        let off_axis = TickInput {
            fix: None,
            sighting: Some(MarkerSighting::Found { distance_cm: 700.0, angle_deg: 30.0 }),
        };
        let lost = TickInput { fix: None, sighting: Some(MarkerSighting::NotFound) };

        let mut centre = Centre::new();
        let mut cmds = Vec::new();

        // Sightings are ignored for the whole nudge
        cmds.push(centre.step(&p, &mut persistant, &off_axis).unwrap().data);
        while centre.is_nudging() {
            cmds.push(centre.step(&p, &mut persistant, &lost).unwrap().data);
        }

        let fwd = WheelCommand::new(50, 50);
        let mut expected = vec![WheelCommand::ZERO; 5];
        expected.extend(vec![fwd; 8]);
        expected.push(WheelCommand::ZERO);
        assert_eq!(cmds, expected);
        assert!(!centre.is_searching());

        // Back to pivoting, no second nudge
        let out = centre.step(&p, &mut persistant, &off_axis).unwrap();
        assert_eq!(out.data, WheelCommand::new(18, -18));
        assert!(!centre.is_nudging());
    }

    #[test]
    fn test_centred_first_sighting_skips_nudge() {
        let p = test_params();
        let mut persistant = AutoMgrPersistantData {
            drive_ctrl: crate::loco_ctrl::DriveCtrl::new(p.drive_ctrl).unwrap(),
            target: None,
            last_cmd: WheelCommand::ZERO,
            num_ticks: 0,
        };
        let ahead = TickInput {
            fix: None,
            sighting: Some(MarkerSighting::Found { distance_cm: 700.0, angle_deg: -3.0 }),
        };

        let out = Centre::new().step(&p, &mut persistant, &ahead).unwrap();
        assert!(matches!(out.action, crate::auto::auto_mgr::StateAction::Replace(AutoMgrState::Approach(_))));
    }

    #[test]
    fn test_hold_or_lose() {
        let mut lost = 0;
        let last = WheelCommand::new(20, -20);

        let out = hold_or_lose(&mut lost, 2, last);
        assert_eq!(out.data, last);
        let out = hold_or_lose(&mut lost, 2, last);
        assert_eq!(out.data, last);

        let out = hold_or_lose(&mut lost, 2, last);
        assert_eq!(out.data, WheelCommand::ZERO);
        assert!(matches!(out.action, crate::auto::auto_mgr::StateAction::Replace(AutoMgrState::Stop(_))));
    }
}
