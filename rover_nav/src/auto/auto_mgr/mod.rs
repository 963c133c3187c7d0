//! # AutoMgr module
//!
//! This module implements the [`AutoMgr`] state machine, which sequences the rover's navigation
//! and homing. The state machine is broken down into a number of modes:
//!
//! - `Follow` - Drive to each GPS waypoint in turn, after an open loop kickstart which gets a GPS
//!   heading. Hands over to `Centre` as soon as the target marker is sighted.
//! - `Centre` - Pivot on the spot until the marker is in front of the rover, sweeping to search for
//!   it if it has not been seen yet.
//! - `Approach` - Drive towards the marker, steering on its angle, until close enough.
//! - `Stop` - Terminal, the rover is stationary and the mission outcome is known.
//!
//! Exactly one wheel command is produced each tick, and the drive controller's error accumulator
//! is reset on every state change.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod approach;
mod centre;
mod follow;
pub mod params;
mod report;
mod stop;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{fmt::Display, time::{Duration, Instant}};

use comms_if::eqpt::{gps::{Coordinate, GpsFix}, mech::WheelCommand};
use log::{debug, error, info, warn};
use serde::Serialize;
use util::task::CancelToken;

use crate::{
    auto::{
        loc::GpsTrack,
        per::{MarkerSighting, MarkerSource, MarkerTarget},
    },
    loco_ctrl::{DriveCtrl, DriveCtrlError},
    mech_client::SharedWheelCommand,
};

pub use self::{
    params::{
        AutoMgrParams, ApproachParams, CentreParams, FollowParams, KickstartSegment
    },
    report::MissionReport,
};

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub mod states {
    pub use super::approach::Approach;
    pub use super::centre::Centre;
    pub use super::follow::Follow;
    pub use super::stop::Stop;
}

use states::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Autonomy Manager
///
/// This struct is responsible for managing the state of the navigation system, stepping the
/// current state once per tick and performing the transitions it asks for.
pub struct AutoMgr {
    /// Parameters for the AutoMgr and all it's states.
    pub params: AutoMgrParams,

    /// Persistant data of the AutoMgr.
    ///
    /// This is data which is valid over all states, such as the drive controller and the last
    /// command sent.
    pub persistant: AutoMgrPersistantData,

    state: AutoMgrState,
}

pub struct AutoMgrPersistantData {
    /// Drive controller, owning the error accumulator for the current state.
    pub drive_ctrl: DriveCtrl,

    /// The marker (or gate) being homed on, if any.
    pub target: Option<MarkerTarget>,

    /// Command issued on the previous tick, held while a marker is briefly lost.
    pub last_cmd: WheelCommand,

    /// Number of ticks stepped so far.
    pub num_ticks: u64,
}

/// Sensor data available to a state for one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Latest GPS fix, `None` before the first fix
    pub fix: Option<GpsFix>,

    /// Marker sighting for this tick, `None` if the marker was not looked for
    pub sighting: Option<MarkerSighting>,
}

/// Output of a state's step function.
pub struct StepOutput {
    /// Action to perform on the state machine itself
    pub action: StateAction,

    /// Wheel command for this tick
    pub data: WheelCommand,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur in the autonomy manager.
#[derive(Debug, thiserror::Error)]
pub enum AutoMgrError {
    #[error("Failed to load AutoMgrParams: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid AutoMgrParams: {0}")]
    InvalidParams(String),

    #[error("Drive controller error: {0}")]
    DriveCtrlError(DriveCtrlError),

    #[error("At least one waypoint is required")]
    NoWaypoints,
}

#[derive(Debug)]
pub enum AutoMgrState {
    // In a box to reduce the size of the state enum
    Follow(Box<Follow>),
    Centre(Centre),
    Approach(Approach),
    Stop(Stop),
}

/// Actions that can be performed on the state machine at the end of a state's step function.
#[derive(Debug)]
pub enum StateAction {
    None,
    Replace(AutoMgrState),
}

/// Final result of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NavOutcome {
    Success(SuccessCause),
    Failure(FailureCause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SuccessCause {
    /// All waypoints reached and no marker was to be found
    ArrivedAtWaypoints,

    /// Stopped within range of the marker
    ReachedMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureCause {
    /// The search sweep timed out without a sighting
    MarkerNeverFound,

    /// The marker was out of sight for longer than the loss tolerance
    MarkerLost,

    /// A waypoint leg took longer than allowed
    WaypointUnreachable,

    /// The mission was cancelled or a state errored
    Aborted,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AutoMgr {
    pub fn init(
        params_path: &str,
        waypoints: Vec<Coordinate>,
        target: Option<MarkerTarget>,
    ) -> Result<Self, AutoMgrError> {
        // Load parameters
        let params: AutoMgrParams = util::params::load(params_path)
            .map_err(AutoMgrError::ParamLoadError)?;

        Self::new(params, waypoints, target)
    }

    pub fn new(
        params: AutoMgrParams,
        waypoints: Vec<Coordinate>,
        target: Option<MarkerTarget>,
    ) -> Result<Self, AutoMgrError> {
        params.are_valid().map_err(AutoMgrError::InvalidParams)?;

        if waypoints.is_empty() {
            return Err(AutoMgrError::NoWaypoints);
        }

        let drive_ctrl = DriveCtrl::new(params.drive_ctrl)
            .map_err(AutoMgrError::DriveCtrlError)?;

        let kickstart = match target {
            Some(_) => params.follow.kickstart_marker.clone(),
            None => params.follow.kickstart_plain.clone(),
        };

        info!(
            "AutoMgr initialised with {} waypoints, target: {}",
            waypoints.len(),
            target.map(|t| t.to_string()).unwrap_or_else(|| "none".into())
        );

        Ok(Self {
            params,
            persistant: AutoMgrPersistantData {
                drive_ctrl,
                target,
                last_cmd: WheelCommand::ZERO,
                num_ticks: 0,
            },
            state: AutoMgrState::Follow(Box::new(Follow::new(waypoints, kickstart))),
        })
    }

    /// Step the current state once, returning the wheel command for this tick.
    pub fn step(&mut self, fix: Option<GpsFix>, sighting: Option<MarkerSighting>) -> WheelCommand {
        let input = TickInput { fix, sighting };

        let output = self.state.step(&self.params, &mut self.persistant, &input);

        if let StateAction::Replace(s) = output.action {
            info!("AutoMgr state change to: {}", s);
            self.persistant.drive_ctrl.reset();
            self.state = s;
        }

        self.persistant.num_ticks += 1;
        self.persistant.last_cmd = output.data;

        output.data
    }

    /// Run one tick against the live sensors, sampling the marker only when the state needs it.
    pub fn tick<M: MarkerSource + ?Sized>(
        &mut self,
        track: &GpsTrack,
        markers: &mut M
    ) -> WheelCommand {
        let fix = track.current();

        let sighting = match (self.persistant.target, self.needs_marker()) {
            (Some(t), true) => Some(markers.sight(t)),
            _ => None,
        };

        self.step(fix, sighting)
    }

    /// Run the control loop until the mission finishes or is cancelled.
    ///
    /// Each tick's command is written to `speeds` for the wheel sender.
    pub fn run<M: MarkerSource + ?Sized>(
        &mut self,
        track: &GpsTrack,
        markers: &mut M,
        speeds: &SharedWheelCommand,
        cancel: &CancelToken,
    ) -> NavOutcome {
        loop {
            if cancel.is_cancelled() {
                warn!("AutoMgr cancelled");
                self.abort();
                speeds.set(WheelCommand::ZERO);
            }

            if let Some(outcome) = self.outcome() {
                speeds.set(WheelCommand::ZERO);
                return outcome;
            }

            let start = Instant::now();
            let period = self.tick_period();

            let cmd = self.tick(track, markers);
            speeds.set(cmd);
            debug!("Tick {}: {} {}", self.persistant.num_ticks, self.state, cmd);

            let elapsed = start.elapsed();
            if elapsed < period {
                std::thread::sleep(period - elapsed);
            }
            else {
                warn!("AutoMgr tick overran: {:?} > {:?}", elapsed, period);
            }
        }
    }

    /// Force the state machine into `Stop` with an aborted outcome.
    pub fn abort(&mut self) {
        if self.outcome().is_none() {
            self.state = AutoMgrState::Stop(Stop::new(NavOutcome::Failure(FailureCause::Aborted)));
            info!("AutoMgr state change to: {}", self.state);
            self.persistant.drive_ctrl.reset();
        }
    }

    /// Whether the current state uses a marker sighting this tick.
    pub fn needs_marker(&self) -> bool {
        self.persistant.target.is_some() && self.state.needs_marker()
    }

    /// Period at which the current state should be stepped.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.state.tick_ms(&self.params))
    }

    /// The mission outcome, once the machine has stopped.
    pub fn outcome(&self) -> Option<NavOutcome> {
        match &self.state {
            AutoMgrState::Stop(s) => Some(s.outcome()),
            _ => None,
        }
    }

    pub fn state(&self) -> &AutoMgrState {
        &self.state
    }

    /// Summary of the mission so far.
    pub fn report(&self, final_fix: Option<GpsFix>) -> MissionReport {
        MissionReport {
            outcome: self.outcome(),
            final_state: self.state.to_string(),
            num_ticks: self.persistant.num_ticks,
            target: self.persistant.target,
            final_fix,
        }
    }
}

impl Display for AutoMgrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutoMgrState::Follow(_) => write!(f, "AutoMgrState::Follow"),
            AutoMgrState::Centre(c) if c.is_searching() => {
                write!(f, "AutoMgrState::Centre (searching)")
            }
            AutoMgrState::Centre(c) if c.is_nudging() => {
                write!(f, "AutoMgrState::Centre (nudging)")
            }
            AutoMgrState::Centre(_) => write!(f, "AutoMgrState::Centre"),
            AutoMgrState::Approach(_) => write!(f, "AutoMgrState::Approach"),
            AutoMgrState::Stop(s) => write!(f, "AutoMgrState::Stop({:?})", s.outcome()),
        }
    }
}

impl AutoMgrState {
    fn step(
        &mut self,
        params: &AutoMgrParams,
        persistant: &mut AutoMgrPersistantData,
        input: &TickInput,
    ) -> StepOutput {
        let out = match self {
            AutoMgrState::Follow(follow) => follow.step(params, persistant, input),
            AutoMgrState::Centre(centre) => centre.step(params, persistant, input),
            AutoMgrState::Approach(approach) => approach.step(params, persistant, input),
            AutoMgrState::Stop(stop) => stop.step(params, persistant, input),
        };

        // If a state errors we log it and stop the rover rather than crashing
        match out {
            Ok(o) => o,
            Err(e) => {
                error!("{}", e);
                StepOutput::replace(
                    AutoMgrState::Stop(Stop::new(NavOutcome::Failure(FailureCause::Aborted))),
                    WheelCommand::ZERO,
                )
            }
        }
    }

    fn needs_marker(&self) -> bool {
        match self {
            AutoMgrState::Follow(f) => !f.is_kickstarting(),
            AutoMgrState::Centre(c) => !c.is_nudging(),
            AutoMgrState::Approach(_) => true,
            AutoMgrState::Stop(_) => false,
        }
    }

    fn tick_ms(&self, params: &AutoMgrParams) -> u64 {
        match self {
            AutoMgrState::Follow(_) => params.follow.tick_ms,
            AutoMgrState::Centre(_) => params.centre.tick_ms,
            AutoMgrState::Approach(_) => params.approach.tick_ms,
            AutoMgrState::Stop(_) => 0,
        }
    }
}

impl StepOutput {
    /// Stay in the current state, issuing the command.
    pub fn hold(data: WheelCommand) -> Self {
        Self {
            action: StateAction::None,
            data,
        }
    }

    pub fn replace(state: AutoMgrState, data: WheelCommand) -> Self {
        Self {
            action: StateAction::Replace(state),
            data,
        }
    }
}

impl NavOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, NavOutcome::Success(_))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::auto_mgr::params::test_params;
    use crate::geo;

    fn fix_at(c: Coordinate, heading: Option<f64>) -> GpsFix {
        GpsFix {
            coordinates: c,
            height_m: 0.0,
            time_ms: 0,
            horizontal_error_mm: 10.0,
            vertical_error_mm: 10.0,
            true_bearing_deg: heading,
        }
    }

    fn origin() -> Coordinate {
        Coordinate::new(51.4545, -2.5879)
    }

    fn no_kickstart() -> AutoMgrParams {
        let mut p = test_params();
        p.follow.kickstart_marker.clear();
        p.follow.kickstart_plain.clear();
        p
    }

    const FOUND_AHEAD: MarkerSighting = MarkerSighting::Found { distance_cm: 900.0, angle_deg: 2.0 };

    #[test]
    fn test_shipped_params_valid() {
        let p: AutoMgrParams =
            util::params::from_str(include_str!("../../../../params/nav.toml")).unwrap();

        assert!(p.are_valid().is_ok());
        assert_eq!(p.follow.kickstart_marker, test_params().follow.kickstart_marker);
        assert_eq!(p.approach.stop_distance_cm, 350.0);
    }

    #[test]
    fn test_requires_waypoints() {
        assert!(matches!(
            AutoMgr::new(test_params(), vec![], None),
            Err(AutoMgrError::NoWaypoints)
        ));
    }

    #[test]
    fn test_kickstart_then_follow() {
        let wp = geo::destination(&origin(), 50.0, 90.0);
        let mut mgr = AutoMgr::new(test_params(), vec![wp], Some(MarkerTarget::Single(3))).unwrap();

        // No marker sampling during the kickstart
        assert!(!mgr.needs_marker());

        let mut cmds = Vec::new();
        for _ in 0..40 {
            cmds.push(mgr.step(None, None));
        }
        assert_eq!(cmds[0], WheelCommand::new(-60, -60));
        assert_eq!(cmds[9], WheelCommand::new(-60, -60));
        assert_eq!(cmds[10], WheelCommand::ZERO);
        assert_eq!(cmds[20], WheelCommand::new(80, 20));
        assert_eq!(cmds[39], WheelCommand::new(80, 20));
        assert!(mgr.needs_marker());

        // No fix yet, so wait with the wheels stopped
        assert_eq!(mgr.step(None, Some(MarkerSighting::NotFound)), WheelCommand::ZERO);

        // Heading north, waypoint due east, so turn right
        let cmd = mgr.step(Some(fix_at(origin(), Some(0.0))), Some(MarkerSighting::NotFound));
        assert!(cmd.left > cmd.right);
        assert!(matches!(mgr.state(), AutoMgrState::Follow(_)));
    }

    #[test]
    fn test_no_heading_drives_straight() {
        let wp = geo::destination(&origin(), 50.0, 135.0);
        let mut mgr = AutoMgr::new(no_kickstart(), vec![wp], None).unwrap();

        assert_eq!(mgr.step(Some(fix_at(origin(), None)), None), WheelCommand::new(50, 50));
        assert_eq!(mgr.persistant.drive_ctrl.error_accumulation(), 0.0);
    }

    #[test]
    fn test_sighting_during_follow_starts_centring() {
        let wp = geo::destination(&origin(), 50.0, 0.0);
        let mut mgr = AutoMgr::new(no_kickstart(), vec![wp], Some(MarkerTarget::Single(3))).unwrap();

        mgr.step(Some(fix_at(origin(), Some(20.0))), Some(MarkerSighting::NotFound));
        assert!(mgr.persistant.drive_ctrl.error_accumulation() != 0.0);

        let cmd = mgr.step(Some(fix_at(origin(), Some(20.0))), Some(FOUND_AHEAD));
        assert_eq!(cmd, WheelCommand::ZERO);
        assert!(matches!(mgr.state(), AutoMgrState::Centre(_)));
        assert_eq!(mgr.persistant.drive_ctrl.error_accumulation(), 0.0);
    }

    #[test]
    fn test_multiple_waypoints_in_order() {
        let wp0 = geo::destination(&origin(), 1.0, 0.0);
        let wp1 = geo::destination(&origin(), 40.0, 0.0);
        let mut mgr = AutoMgr::new(no_kickstart(), vec![wp0, wp1], None).unwrap();

        // Already at the first waypoint, so drive on to the second
        let cmd = mgr.step(Some(fix_at(origin(), None)), None);
        assert_eq!(cmd, WheelCommand::new(50, 50));
        assert!(matches!(mgr.state(), AutoMgrState::Follow(_)));

        let cmd = mgr.step(Some(fix_at(wp1, None)), None);
        assert_eq!(cmd, WheelCommand::ZERO);
        assert_eq!(mgr.outcome(), Some(NavOutcome::Success(SuccessCause::ArrivedAtWaypoints)));
    }

    #[test]
    fn test_leg_timeout() {
        let mut params = no_kickstart();
        params.follow.max_leg_ticks = Some(5);

        let wp = geo::destination(&origin(), 100.0, 0.0);
        let mut mgr = AutoMgr::new(params, vec![wp], None).unwrap();

        for _ in 0..5 {
            mgr.step(Some(fix_at(origin(), Some(0.0))), None);
            assert!(mgr.outcome().is_none());
        }
        assert_eq!(mgr.step(Some(fix_at(origin(), Some(0.0))), None), WheelCommand::ZERO);
        assert_eq!(
            mgr.outcome(),
            Some(NavOutcome::Failure(FailureCause::WaypointUnreachable))
        );
    }

    #[test]
    fn test_centre_then_approach_then_stop() {
        let mut mgr = AutoMgr::new(
            no_kickstart(),
            vec![origin()],
            Some(MarkerTarget::Single(3)),
        )
        .unwrap();

        // Arrive at the only waypoint, start centring
        mgr.step(Some(fix_at(origin(), None)), Some(MarkerSighting::NotFound));
        assert!(matches!(mgr.state(), AutoMgrState::Centre(_)));

        // First sighting off to the right, nudge forward then pivot right
        let right = Some(MarkerSighting::Found { distance_cm: 800.0, angle_deg: 30.0 });
        let cmd = mgr.step(None, right);
        assert_eq!(cmd, WheelCommand::ZERO);
        assert!(!mgr.needs_marker());
        for _ in 0..13 {
            mgr.step(None, None);
        }
        assert!(mgr.needs_marker());

        let cmd = mgr.step(None, right);
        assert_eq!(cmd, WheelCommand::new(18, -18));

        // Marker briefly lost, hold the last command
        let cmd = mgr.step(None, Some(MarkerSighting::NotFound));
        assert_eq!(cmd, WheelCommand::new(18, -18));

        // Centred
        let cmd = mgr.step(None, Some(MarkerSighting::Found { distance_cm: 800.0, angle_deg: -14.0 }));
        assert_eq!(cmd, WheelCommand::ZERO);
        assert!(matches!(mgr.state(), AutoMgrState::Approach(_)));

        // Approach at reduced speed
        let cmd = mgr.step(None, Some(MarkerSighting::Found { distance_cm: 600.0, angle_deg: 0.0 }));
        assert_eq!(cmd, WheelCommand::new(42, 42));

        let cmd = mgr.step(None, Some(MarkerSighting::Found { distance_cm: 349.0, angle_deg: 1.0 }));
        assert_eq!(cmd, WheelCommand::ZERO);
        assert_eq!(mgr.outcome(), Some(NavOutcome::Success(SuccessCause::ReachedMarker)));
        assert!(!mgr.needs_marker());

        // Stopped is terminal
        assert_eq!(mgr.step(None, Some(FOUND_AHEAD)), WheelCommand::ZERO);
        assert_eq!(mgr.outcome(), Some(NavOutcome::Success(SuccessCause::ReachedMarker)));
    }

    #[test]
    fn test_approach_loses_marker() {
        let mut mgr = AutoMgr::new(
            no_kickstart(),
            vec![origin()],
            Some(MarkerTarget::Single(3)),
        )
        .unwrap();

        mgr.step(Some(fix_at(origin(), None)), None);
        mgr.step(None, Some(FOUND_AHEAD));
        assert!(matches!(mgr.state(), AutoMgrState::Approach(_)));

        let last = mgr.step(None, Some(FOUND_AHEAD));
        for _ in 0..15 {
            assert_eq!(mgr.step(None, Some(MarkerSighting::NotFound)), last);
        }
        assert_eq!(mgr.step(None, Some(MarkerSighting::NotFound)), WheelCommand::ZERO);
        assert_eq!(mgr.outcome(), Some(NavOutcome::Failure(FailureCause::MarkerLost)));
    }

    #[test]
    fn test_run_stops_when_cancelled() {
        let mut mgr = AutoMgr::new(no_kickstart(), vec![origin()], None).unwrap();
        let track = GpsTrack::new();
        let speeds = SharedWheelCommand::new();
        speeds.set(WheelCommand::new(40, 40));

        let cancel = CancelToken::new();
        let canceller = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                cancel.cancel();
            })
        };

        let mut markers: Option<crate::auto::per::MarkerTracker> = None;
        let outcome = mgr.run(&track, &mut markers, &speeds, &cancel);
        canceller.join().unwrap();

        assert_eq!(outcome, NavOutcome::Failure(FailureCause::Aborted));
        assert_eq!(speeds.get(), WheelCommand::ZERO);
        assert!(mgr.persistant.num_ticks >= 1);
    }

    #[test]
    fn test_abort() {
        let mut mgr = AutoMgr::new(no_kickstart(), vec![origin()], None).unwrap();
        mgr.abort();
        assert_eq!(mgr.outcome(), Some(NavOutcome::Failure(FailureCause::Aborted)));
        assert_eq!(mgr.tick_period(), Duration::from_millis(0));

        let report = mgr.report(None);
        assert_eq!(report.num_ticks, 0);
        assert_eq!(report.outcome, Some(NavOutcome::Failure(FailureCause::Aborted)));
    }
}
