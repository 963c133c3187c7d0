//! Main rover navigation executable entry point.
//!
//! # Architecture
//!
//! The executable drives the rover along a list of GPS waypoints and then, if a marker is given,
//! homes in on it. It consists of:
//!
//!     - A GPS sampler task, feeding fixes into the shared `GpsTrack`
//!     - A wheel sender task, resending the latest wheel command to the motor controller
//!     - The AutoMgr control loop on the main thread, which samples the track and the cameras and
//!       sets the wheel command each tick
//!
//! Ctrl-C aborts the mission, stopping the rover. At the end of the mission the LEDs signal the
//! outcome and a mission report is saved into the session directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use comms_if::{
    eqpt::{
        cam::{CamId, CameraProvider, MarkerPrimitive},
        gps::GpsReceiver,
        mech::LedMsg,
    },
    net::UdpLink,
};
use nav_lib::{
    auto::{
        AutoMgr,
        auto_mgr::NavOutcome,
        loc::{GpsSampler, GpsTrack},
        per::{ArTrackerParams, ArucoDetector, MarkerTarget, MarkerTracker},
    },
    mech_client::{LedSignal, SharedWheelCommand, WheelSender},
    params::RovExecParams,
    waypoints,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
    task::{CancelToken, PeriodicTask},
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Autonomous waypoint following and ArUco marker homing.
#[derive(Debug, StructOpt)]
#[structopt(name = "rover_nav")]
struct Opt {
    /// Waypoint file, one "<lat> <lon>" per line
    #[structopt(short = "f", long = "file", parse(from_os_str))]
    coords: PathBuf,

    /// ID of the marker to home on after the last waypoint
    #[structopt(short = "a", long = "aruco")]
    aruco_id: Option<u32>,

    /// ID of the second gate post, homes on the gate between this and the marker
    #[structopt(short = "g", long = "gate")]
    gate_id: Option<u32>,

    /// Camera indices in priority order
    #[structopt(short = "c", long = "camera")]
    cameras: Vec<u32>,

    /// Use the simulated world instead of the rover's hardware
    #[structopt(long)]
    sim: bool,

    /// More verbose logging (-v debug, -vv trace)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,
}

/// Everything a mission needs before the equipment is brought up.
struct Mission {
    session: Session,
    exec_params: RovExecParams,
    ar_params: ArTrackerParams,
    auto_mgr: AutoMgr,
    cam_ids: Vec<CamId>,
    wheel_cmd: SharedWheelCommand,
    cancel: CancelToken,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "rover_nav",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    // At -v the per-tick GPS and simulation logs stay at info, -vv shows everything
    let (level, module_levels) = match opt.verbose {
        0 => (LevelFilter::Info, vec![]),
        1 => (LevelFilter::Debug, vec![
            ("nav_lib::auto::loc", LevelFilter::Info),
            ("nav_lib::sim", LevelFilter::Info),
        ]),
        _ => (LevelFilter::Trace, vec![]),
    };
    logger_init(level, &module_levels, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Rover Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: RovExecParams = util::params::load("rov_exec.toml")
        .wrap_err("Could not load exec params")?;
    exec_params.are_valid()
        .map_err(|e| eyre!("Invalid exec params: {}", e))?;

    let ar_params: ArTrackerParams = util::params::load("ar_tracker.toml")
        .wrap_err("Could not load ArTracker params")?;
    ar_params.are_valid()
        .map_err(|e| eyre!("Invalid ArTracker params: {}", e))?;

    info!("Exec parameters loaded");

    // ---- MISSION DEFINITION ----

    let target = match (opt.aruco_id, opt.gate_id) {
        (Some(a), Some(g)) => Some(MarkerTarget::Gate(a, g)),
        (Some(a), None) => Some(MarkerTarget::Single(a)),
        (None, Some(_)) => return Err(eyre!("A gate post ID needs a marker ID (-a) as well")),
        (None, None) => None,
    };

    if let Some(t) = target {
        for id in t.ids() {
            if !ar_params.dictionary.contains(id) {
                return Err(eyre!(
                    "Marker {} is not in the {:?} dictionary", id, ar_params.dictionary
                ));
            }
        }
    }

    let waypoints = waypoints::load_waypoints(&opt.coords)
        .wrap_err("Failed to load the waypoint file")?;
    info!("Loaded {} waypoints from {:?}", waypoints.len(), opt.coords);

    let auto_mgr = AutoMgr::init("nav.toml", waypoints, target)
        .wrap_err("Failed to initialise AutoMgr")?;

    let cam_ids = match opt.cameras.is_empty() {
        true => vec![CamId(0)],
        false => opt.cameras.iter().map(|c| CamId(*c)).collect(),
    };

    let cancel = CancelToken::new();
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupted, aborting the mission");
        handler_cancel.cancel();
    }).wrap_err("Failed to install the interrupt handler")?;

    let mission = Mission {
        session,
        exec_params,
        ar_params,
        auto_mgr,
        cam_ids,
        wheel_cmd: SharedWheelCommand::new(),
        cancel,
    };

    // ---- RUN ----

    let outcome: NavOutcome = match opt.sim {
        #[cfg(feature = "sim")]
        true => run_sim(mission)?,
        _ => return Err(eyre!(
            "No GPS or camera bindings are built into this executable, run with --sim"
        )),
    };

    match outcome {
        NavOutcome::Success(cause) => {
            info!("Mission complete: {:?}", cause);
            Ok(())
        }
        NavOutcome::Failure(cause) => Err(eyre!("Mission failed: {:?}", cause)),
    }
}

/// Run the mission in the simulated world.
#[cfg(feature = "sim")]
fn run_sim(mission: Mission) -> Result<NavOutcome, Report> {
    use nav_lib::sim::{
        SimCameraProvider, SimDriver, SimGps, SimMarkerPrimitive, SimParams, SimWorld
    };

    let sim_params: SimParams = util::params::load("sim.toml")
        .wrap_err("Could not load sim params")?;
    sim_params.are_valid()
        .map_err(|e| eyre!("Invalid sim params: {}", e))?;

    let world = SimWorld::new(&sim_params).shared();
    info!("Simulated world initialised with {} markers", sim_params.markers.len());

    let step = Duration::from_millis(sim_params.step_period_ms);
    let driver = PeriodicTask::spawn(
        "sim_driver",
        step,
        CancelToken::new(),
        SimDriver::new(world.clone(), mission.wheel_cmd.clone(), step)
    ).wrap_err("Failed to start the simulation")?;

    let primitive = SimMarkerPrimitive::new(
        world.clone(),
        mission.ar_params.calibration,
        sim_params.marker_max_range_cm
    );

    let outcome = run_mission(mission, SimGps::new(world), &mut SimCameraProvider, primitive);

    driver.stop().wrap_err("Simulation did not stop cleanly")?;

    outcome
}

/// Bring up the equipment, run the AutoMgr to completion, then signal and record the outcome.
fn run_mission<R, C, P>(
    mission: Mission,
    mut gps: R,
    cam_provider: &mut C,
    primitive: P,
) -> Result<NavOutcome, Report>
where
    R: GpsReceiver + 'static,
    C: CameraProvider,
    P: MarkerPrimitive + 'static,
{
    let Mission {
        session,
        exec_params,
        ar_params,
        mut auto_mgr,
        cam_ids,
        wheel_cmd,
        cancel,
    } = mission;

    // ---- INITIALISE EQUIPMENT ----

    gps.init(&exec_params.gps_host, exec_params.gps_port)
        .wrap_err("Failed to initialise the GPS receiver")?;
    info!("GPS receiver initialised");

    let link = UdpLink::connect(&exec_params.mbed_host, exec_params.mbed_port)
        .wrap_err("Failed to open the actuator link")?;
    info!("Actuator link open to {}", link.endpoint());

    let leds = LedSignal::new(link.clone());

    let mut markers = match auto_mgr.persistant.target {
        Some(t) => {
            let detector = ArucoDetector::new(
                primitive,
                ar_params.dictionary,
                ar_params.threshold_cutoffs.clone()
            );
            let tracker = MarkerTracker::open(
                cam_provider,
                &cam_ids,
                Box::new(detector),
                &ar_params
            ).wrap_err("Failed to initialise the marker tracker")?;

            info!("Tracking {} with cameras {:?}", t, tracker.camera_ids());
            Some(tracker)
        }
        None => None,
    };

    // ---- START TASKS ----

    let track = GpsTrack::new();

    let gps_task = PeriodicTask::spawn(
        "gps_sampler",
        Duration::from_millis(exec_params.gps_period_ms),
        CancelToken::new(),
        GpsSampler::new(gps, track.clone())
    ).wrap_err("Failed to start the GPS sampler")?;

    let wheel_task = PeriodicTask::spawn(
        "wheel_sender",
        Duration::from_millis(exec_params.wheel_period_ms),
        CancelToken::new(),
        WheelSender::new(link, wheel_cmd.clone())
    ).wrap_err("Failed to start the wheel sender")?;

    // ---- MISSION ----

    leds.set(LedMsg::RED);
    info!("Begining mission\n");

    let outcome = auto_mgr.run(&track, &mut markers, &wheel_cmd, &cancel);

    // ---- SHUTDOWN ----

    if let Err(e) = wheel_task.stop() {
        error!("{}", e);
    }
    if let Err(e) = gps_task.stop() {
        warn!("{}", e);
    }

    let colour = match outcome.is_success() {
        true => LedMsg::GREEN,
        false => LedMsg::RED,
    };
    leds.flash(
        colour,
        exec_params.led_flash_count,
        Duration::from_millis(exec_params.led_flash_period_ms)
    );

    let report_path = session
        .save_json("mission_report.json", &auto_mgr.report(track.current()))
        .wrap_err("Failed to save the mission report")?;
    info!("Mission report saved to {:?}", report_path);

    Ok(outcome)
}
