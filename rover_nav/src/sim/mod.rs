//! # Simulation backend
//!
//! A flat-ground differential drive model of the rover standing in for the real GPS receiver,
//! cameras and marker detector. It is driven from the same [`SharedWheelCommand`] the wheel sender
//! reads, so the rest of the software runs unchanged.
//!
//! The world is loaded from `sim.toml`. Markers are placed relative to the start position.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod devices;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{
    gps::Coordinate,
    mech::{WheelCommand, MAX_WHEEL_SPEED},
};
use serde::Deserialize;
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use util::{maths::lin_map, task::PeriodicJob};

use crate::{geo, mech_client::SharedWheelCommand};

pub use devices::{SimCamera, SimCameraProvider, SimGps, SimMarkerPrimitive};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated world, loaded from `sim.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {
    pub start: Coordinate,

    pub start_heading_deg: f64,

    /// Ground speed of a wheel at the maximum wheel speed command
    ///
    /// Units: meters/second
    pub max_speed_mps: f64,

    /// Distance between the left and right wheels
    ///
    /// Units: meters
    pub track_width_m: f64,

    /// Period of the world update
    pub step_period_ms: u64,

    /// Markers further away than this are not detected
    ///
    /// Units: centimeters
    pub marker_max_range_cm: f64,

    pub markers: Vec<SimMarker>,
}

/// A marker placed relative to the start position.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SimMarker {
    pub id: u32,
    pub distance_m: f64,
    pub bearing_deg: f64,
}

/// State of the simulated world.
#[derive(Debug, Clone)]
pub struct SimWorld {
    pub position: Coordinate,

    /// True heading of the rover, `[0, 360)`
    pub heading_deg: f64,

    /// Markers by ID and position
    pub markers: Vec<(u32, Coordinate)>,

    /// Simulation time
    pub time_ms: u64,

    max_speed_mps: f64,
    track_width_m: f64,
}

pub type SharedWorld = Arc<Mutex<SimWorld>>;

/// Periodic job advancing the world with the latest wheel command.
pub struct SimDriver {
    world: SharedWorld,
    command: SharedWheelCommand,
    period: Duration,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimParams {
    pub fn are_valid(&self) -> Result<(), String> {
        if !(self.max_speed_mps > 0.0) {
            return Err("max_speed_mps must be positive".into());
        }
        if !(self.track_width_m > 0.0) {
            return Err("track_width_m must be positive".into());
        }
        if self.step_period_ms == 0 {
            return Err("step_period_ms must be non-zero".into());
        }

        Ok(())
    }
}

impl SimWorld {
    pub fn new(params: &SimParams) -> Self {
        let markers = params
            .markers
            .iter()
            .map(|m| (m.id, geo::destination(&params.start, m.distance_m, m.bearing_deg)))
            .collect();

        Self {
            position: params.start,
            heading_deg: geo::normalise_deg(params.start_heading_deg),
            markers,
            time_ms: 0,
            max_speed_mps: params.max_speed_mps,
            track_width_m: params.track_width_m,
        }
    }

    pub fn shared(self) -> SharedWorld {
        Arc::new(Mutex::new(self))
    }

    /// Advance the rover for `dt` with the given wheel command.
    pub fn advance(&mut self, cmd: WheelCommand, dt: Duration) {
        let dt_s = dt.as_secs_f64();
        let wheel_range = (-MAX_WHEEL_SPEED, MAX_WHEEL_SPEED);
        let ground_range = (-self.max_speed_mps, self.max_speed_mps);

        let v_left = lin_map(wheel_range, ground_range, cmd.left as f64);
        let v_right = lin_map(wheel_range, ground_range, cmd.right as f64);

        let speed = (v_left + v_right) / 2.0;

        // Left faster than right turns clockwise, which is a positive compass rate
        let turn_deg = ((v_left - v_right) / self.track_width_m * dt_s).to_degrees();

        let distance = speed * dt_s;
        if distance != 0.0 {
            let mid_heading = self.heading_deg + turn_deg / 2.0;
            let (d, brg) = match distance > 0.0 {
                true => (distance, mid_heading),
                false => (-distance, mid_heading + 180.0),
            };
            self.position = geo::destination(&self.position, d, geo::normalise_deg(brg));
        }

        self.heading_deg = geo::normalise_deg(self.heading_deg + turn_deg);
        self.time_ms += dt.as_millis() as u64;
    }

    /// Distance (cm) and angle off the rover's heading (deg) of every marker.
    pub fn marker_views(&self) -> Vec<(u32, f64, f64)> {
        self.markers
            .iter()
            .map(|(id, pos)| {
                (
                    *id,
                    geo::distance_meters(&self.position, pos) * 100.0,
                    geo::relative_bearing(self.heading_deg, geo::bearing_deg(&self.position, pos)),
                )
            })
            .collect()
    }
}

impl SimDriver {
    pub fn new(world: SharedWorld, command: SharedWheelCommand, period: Duration) -> Self {
        Self {
            world,
            command,
            period,
        }
    }
}

impl PeriodicJob for SimDriver {
    fn tick(&mut self) {
        lock(&self.world).advance(self.command.get(), self.period);
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Lock the world, recovering it if another thread panicked while holding it.
pub(crate) fn lock(world: &Mutex<SimWorld>) -> MutexGuard<'_, SimWorld> {
    match world.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auto::{
        auto_mgr::{params::test_params, AutoMgr, AutoMgrState, FailureCause, NavOutcome, SuccessCause},
        loc::GpsTrack,
        per::{ArucoDetector, ArTrackerParams, CameraCalibration, MarkerTarget, MarkerTracker},
    };
    use approx::assert_abs_diff_eq;
    use comms_if::eqpt::{
        cam::{CamId, MarkerDictionary},
        gps::GpsReceiver,
    };

    fn sim_params(markers: Vec<SimMarker>) -> SimParams {
        SimParams {
            start: Coordinate::new(38.406_354, -110.791_900),
            start_heading_deg: 0.0,
            max_speed_mps: 0.9,
            track_width_m: 0.5,
            step_period_ms: 50,
            marker_max_range_cm: 800.0,
            markers,
        }
    }

    fn tracker_params() -> ArTrackerParams {
        ArTrackerParams {
            calibration: CameraCalibration {
                degrees_per_pixel: 0.1,
                vdegrees_per_pixel: 0.1,
                focal_length: 500.0,
                focal_length_30h: 520.0,
                focal_length_30v: 510.0,
                known_marker_width_cm: 20.0,
                frame_width: 640,
                frame_height: 480,
            },
            dictionary: MarkerDictionary::Dict4x4_50,
            threshold_cutoffs: vec![40, 100, 160, 220],
            open_attempts: 1,
            open_backoff_ms: 0,
        }
    }

    /// Everything needed to step a mission deterministically, without threads.
    struct Mission {
        world: SharedWorld,
        gps: SimGps,
        track: GpsTrack,
        tracker: MarkerTracker,
        mgr: AutoMgr,
        states: Vec<String>,
        cmds: Vec<WheelCommand>,
    }

    impl Mission {
        fn new(
            sim: SimParams,
            waypoints: Vec<(f64, f64)>,
            target: Option<MarkerTarget>,
            params: crate::auto::auto_mgr::AutoMgrParams,
        ) -> Self {
            let world = SimWorld::new(&sim).shared();
            let ar = tracker_params();

            let waypoints = waypoints
                .into_iter()
                .map(|(d, b)| geo::destination(&sim.start, d, b))
                .collect();

            let mut provider = SimCameraProvider;
            let detector = ArucoDetector::new(
                SimMarkerPrimitive::new(world.clone(), ar.calibration, sim.marker_max_range_cm),
                ar.dictionary,
                ar.threshold_cutoffs.clone(),
            );
            let tracker = MarkerTracker::open(&mut provider, &[CamId(0)], Box::new(detector), &ar)
                .unwrap();

            Self {
                gps: SimGps::new(world.clone()),
                world,
                track: GpsTrack::new(),
                tracker,
                mgr: AutoMgr::new(params, waypoints, target).unwrap(),
                states: Vec::new(),
                cmds: Vec::new(),
            }
        }

        /// Run until the mission ends, moving the world by one tick period between ticks.
        fn run(&mut self, max_ticks: usize) -> NavOutcome {
            let mut cmd = WheelCommand::ZERO;

            for _ in 0..max_ticks {
                if let Some(o) = self.mgr.outcome() {
                    return o;
                }

                let period = self.mgr.tick_period();
                lock(&self.world).advance(cmd, period);
                if let Some(fix) = self.gps.reading() {
                    self.track.update(fix);
                }

                cmd = self.mgr.tick(&self.track, &mut self.tracker);
                self.cmds.push(cmd);
                self.states.push(self.mgr.state().to_string());
            }

            panic!("Mission did not finish in {} ticks", max_ticks);
        }

        fn visited(&self, name: &str) -> bool {
            self.states.iter().any(|s| s.starts_with(name))
        }
    }

    fn no_kickstart() -> crate::auto::auto_mgr::AutoMgrParams {
        let mut p = test_params();
        p.follow.kickstart_marker.clear();
        p.follow.kickstart_plain.clear();
        p
    }

    #[test]
    fn test_shipped_params_valid() {
        let p: SimParams =
            util::params::from_str(include_str!("../../../params/sim.toml")).unwrap();

        assert!(p.are_valid().is_ok());
        assert_eq!(SimWorld::new(&p).markers.len(), 3);
    }

    #[test]
    fn test_world_kinematics() {
        let mut world = SimWorld::new(&sim_params(vec![]));
        let start = world.position;

        // Full speed straight ahead for a second
        world.advance(WheelCommand::new(90, 90), Duration::from_secs(1));
        assert_abs_diff_eq!(geo::distance_meters(&start, &world.position), 0.9, epsilon = 1e-6);
        assert_eq!(world.heading_deg, 0.0);
        assert_eq!(world.time_ms, 1000);

        // Pivot on the spot, 0.36 m/s differential over a 0.5 m track is 0.72 rad/s
        let here = world.position;
        world.advance(WheelCommand::new(18, -18), Duration::from_secs(1));
        assert_abs_diff_eq!(geo::distance_meters(&here, &world.position), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(world.heading_deg, 0.72f64.to_degrees(), epsilon = 1e-9);

        // Reversing moves backwards
        world.heading_deg = 90.0;
        world.advance(WheelCommand::new(-45, -45), Duration::from_secs(2));
        assert_abs_diff_eq!(geo::distance_meters(&here, &world.position), 0.9, epsilon = 1e-6);
        assert!(world.position.longitude < here.longitude);
    }

    #[test]
    fn test_marker_views() {
        let world = SimWorld::new(&sim_params(vec![SimMarker {
            id: 7,
            distance_m: 5.0,
            bearing_deg: 30.0,
        }]));

        let views = world.marker_views();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].0, 7);
        assert_abs_diff_eq!(views[0].1, 500.0, epsilon = 1e-3);
        assert_abs_diff_eq!(views[0].2, 30.0, epsilon = 1e-3);
    }

    #[test]
    fn test_arrives_without_marker() {
        let mut m = Mission::new(sim_params(vec![]), vec![(2.6, 0.0)], None, no_kickstart());

        let outcome = m.run(100);

        assert_eq!(outcome, NavOutcome::Success(SuccessCause::ArrivedAtWaypoints));
        assert_eq!(m.cmds[0], WheelCommand::new(50, 50));
        assert!(!m.visited("AutoMgrState::Centre"));
        assert!(!m.visited("AutoMgrState::Approach"));
    }

    #[test]
    fn test_follows_waypoints_after_kickstart() {
        let mut m = Mission::new(
            sim_params(vec![]),
            vec![(8.0, 60.0), (16.0, 45.0)],
            None,
            test_params(),
        );

        let outcome = m.run(1000);

        assert_eq!(outcome, NavOutcome::Success(SuccessCause::ArrivedAtWaypoints));
        assert_eq!(m.cmds[0], WheelCommand::new(50, 50));

        let end = lock(&m.world).position;
        let last_wp = geo::destination(&sim_params(vec![]).start, 16.0, 45.0);
        assert!(geo::distance_meters(&end, &last_wp) <= 2.5);
    }

    #[test]
    fn test_marker_never_found() {
        let mut params = no_kickstart();
        params.centre.max_search_ticks = 60;

        let mut m = Mission::new(
            sim_params(vec![]),
            vec![(2.6, 0.0)],
            Some(MarkerTarget::Single(3)),
            params,
        );

        let outcome = m.run(200);

        assert_eq!(outcome, NavOutcome::Failure(FailureCause::MarkerNeverFound));
        assert!(m.visited("AutoMgrState::Centre (searching)"));

        // The sweep went both ways
        assert!(m.cmds.contains(&WheelCommand::new(-55, 55)));
        assert!(m.cmds.contains(&WheelCommand::new(55, -55)));
    }

    #[test]
    fn test_homes_on_marker() {
        let sim = sim_params(vec![SimMarker {
            id: 3,
            distance_m: 14.3,
            bearing_deg: 12.0,
        }]);

        let mut m = Mission::new(sim, vec![(10.0, 0.0)], Some(MarkerTarget::Single(3)), no_kickstart());

        let outcome = m.run(2000);

        assert_eq!(outcome, NavOutcome::Success(SuccessCause::ReachedMarker));
        assert!(m.visited("AutoMgrState::Centre"));
        assert!(m.visited("AutoMgrState::Approach"));

        let world = lock(&m.world);
        let (_, dist_cm, _) = world.marker_views()[0];
        assert!(dist_cm <= 350.0);
        assert!(dist_cm > 300.0);
        assert!(matches!(m.mgr.state(), AutoMgrState::Stop(_)));
    }

    #[test]
    fn test_marker_lost_while_centring() {
        let sim = sim_params(vec![SimMarker {
            id: 3,
            distance_m: 6.0,
            bearing_deg: 25.0,
        }]);

        let mut m = Mission::new(sim, vec![(0.0, 0.0)], Some(MarkerTarget::Single(3)), no_kickstart());

        // The marker is in view from the start, so centring begins straight away
        m.mgr.tick(&m.track, &mut m.tracker);
        if let Some(fix) = m.gps.reading() {
            m.track.update(fix);
        }
        m.mgr.tick(&m.track, &mut m.tracker);
        assert!(matches!(m.mgr.state(), AutoMgrState::Centre(c) if !c.is_searching()));

        // Knock the marker over
        lock(&m.world).markers.clear();

        let outcome = m.run(100);
        assert_eq!(outcome, NavOutcome::Failure(FailureCause::MarkerLost));
    }
}
