//! # Autonomy Module
//!
//! This module provides the rover's autonomous navigation, driving it along a list of GPS
//! waypoints and then homing on an ArUco marker or gate.

pub use auto_mgr::AutoMgr;

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Automation Manager module
pub mod auto_mgr;

/// Localisation module - provides the rover with an idea of where it is in the world
pub mod loc;

/// Perception module - finds markers in camera frames and estimates their range
pub mod per;
