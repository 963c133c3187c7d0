//! # Rover navigation library.
//!
//! This library allows other crates in the workspace to access items defined inside the rover
//! navigation crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autonomy module - waypoint following and marker homing
pub mod auto;

/// Geodesic maths on GPS coordinates
pub mod geo;

/// Locomotion control module - converts heading errors into differential wheel speeds
pub mod loco_ctrl;

/// Mechanisms client - sends wheel speed and LED demands to the motor controller
pub mod mech_client;

/// Parameters for the rover executable
pub mod params;

/// Simulation backend - stands in for the GPS, cameras and marker detection
#[cfg(feature = "sim")]
pub mod sim;

/// Waypoint file parsing
pub mod waypoints;
