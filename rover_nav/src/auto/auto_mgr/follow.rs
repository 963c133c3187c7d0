//! # [`Follow`] AutoMgr state

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use comms_if::eqpt::{gps::Coordinate, mech::WheelCommand};
use log::{info, warn};

use crate::{auto::per::MarkerSighting, geo};

use super::{
    AutoMgrError,
    AutoMgrPersistantData,
    AutoMgrState,
    FailureCause,
    NavOutcome,
    StepOutput,
    SuccessCause,
    TickInput,
    params::{AutoMgrParams, KickstartSegment},
    states::{Centre, Stop},
};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Drives to each waypoint in turn.
///
/// Possible transitions:
/// - Centre, when the marker is sighted or the last waypoint is reached with a target set
/// - Stop, when the last waypoint is reached with no target, or a leg times out
#[derive(Debug)]
pub struct Follow {
    waypoints: Vec<Coordinate>,

    /// Index of the waypoint currently being driven to
    leg: usize,

    /// Ticks spent on the current leg
    leg_ticks: u64,

    kickstart: Vec<KickstartSegment>,
    kickstart_segment: usize,
    kickstart_ticks: u32,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Follow {
    pub fn new(waypoints: Vec<Coordinate>, kickstart: Vec<KickstartSegment>) -> Self {
        Self {
            waypoints,
            leg: 0,
            leg_ticks: 0,
            kickstart,
            kickstart_segment: 0,
            kickstart_ticks: 0,
        }
    }

    pub fn is_kickstarting(&self) -> bool {
        self.kickstart
            .iter()
            .enumerate()
            .skip(self.kickstart_segment)
            .any(|(i, s)| match i == self.kickstart_segment {
                true => self.kickstart_ticks < s.ticks,
                false => s.ticks > 0,
            })
    }

    /// Index of the waypoint currently being driven to.
    pub fn leg(&self) -> usize {
        self.leg
    }

    pub fn step(
        &mut self,
        params: &AutoMgrParams,
        persistant: &mut AutoMgrPersistantData,
        input: &TickInput,
    ) -> Result<StepOutput, AutoMgrError> {
        if let Some(cmd) = self.kickstart_step() {
            return Ok(StepOutput::hold(cmd));
        }

        // Hand over to centring as soon as the marker is seen
        if let Some(MarkerSighting::Found { .. }) = input.sighting {
            info!("Marker sighted while driving to waypoint {}", self.leg);
            return Ok(StepOutput::replace(
                AutoMgrState::Centre(Centre::new()),
                WheelCommand::ZERO,
            ));
        }

        let fix = match input.fix {
            Some(f) => f,
            None => {
                warn!("No GPS fix, waiting with the rover stopped");
                return Ok(StepOutput::hold(WheelCommand::ZERO));
            }
        };

        // Move on past every waypoint we are already at
        while self.leg < self.waypoints.len()
            && geo::distance_km(&fix.coordinates, &self.waypoints[self.leg])
                <= params.follow.arrival_threshold_km
        {
            info!("Reached waypoint {} at {}", self.leg, fix.coordinates);
            self.leg += 1;
            self.leg_ticks = 0;
            persistant.drive_ctrl.reset();
        }

        if self.leg >= self.waypoints.len() {
            let next = match persistant.target {
                Some(_) => AutoMgrState::Centre(Centre::new()),
                None => AutoMgrState::Stop(Stop::new(NavOutcome::Success(
                    SuccessCause::ArrivedAtWaypoints
                ))),
            };
            return Ok(StepOutput::replace(next, WheelCommand::ZERO));
        }

        self.leg_ticks += 1;
        if let Some(max) = params.follow.max_leg_ticks {
            if self.leg_ticks > max {
                warn!("Waypoint {} not reached after {} ticks", self.leg, max);
                return Ok(StepOutput::replace(
                    AutoMgrState::Stop(Stop::new(NavOutcome::Failure(
                        FailureCause::WaypointUnreachable
                    ))),
                    WheelCommand::ZERO,
                ));
            }
        }

        let target = &self.waypoints[self.leg];

        // Drive straight until the GPS gives us a heading
        let error = match fix.true_bearing_deg {
            Some(h) => geo::relative_bearing(h, geo::bearing_deg(&fix.coordinates, target)),
            None => 0.0,
        };

        let cmd = persistant.drive_ctrl.step(
            params.base_speed,
            error,
            params.follow.tick_ms as f64,
            &params.gains,
        );

        Ok(StepOutput::hold(cmd))
    }

    /// Command for the next kickstart tick, or `None` once the kickstart is over.
    fn kickstart_step(&mut self) -> Option<WheelCommand> {
        while let Some(seg) = self.kickstart.get(self.kickstart_segment) {
            if self.kickstart_ticks < seg.ticks {
                self.kickstart_ticks += 1;
                return Some(WheelCommand::from_speeds(seg.left, seg.right));
            }
            self.kickstart_segment += 1;
            self.kickstart_ticks = 0;
        }

        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_kickstart_sequence() {
        let mut f = Follow::new(
            vec![Coordinate::new(1.0, 1.0)],
            vec![
                KickstartSegment { left: 50.0, right: 50.0, ticks: 2 },
                KickstartSegment { left: 0.0, right: 0.0, ticks: 0 },
                KickstartSegment { left: -20.0, right: 20.0, ticks: 1 },
            ],
        );

        assert!(f.is_kickstarting());
        assert_eq!(f.kickstart_step(), Some(WheelCommand::new(50, 50)));
        assert_eq!(f.kickstart_step(), Some(WheelCommand::new(50, 50)));
        assert!(f.is_kickstarting());
        assert_eq!(f.kickstart_step(), Some(WheelCommand::new(-20, 20)));
        assert!(!f.is_kickstarting());
        assert_eq!(f.kickstart_step(), None);
        assert_eq!(f.leg(), 0);
    }
}
