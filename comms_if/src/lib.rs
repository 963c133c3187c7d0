//! # Communications interface crate.
//!
//! Provides the interfaces between the navigation software and the rover's
//! equipment: the GPS receiver, the cameras and the motor controller link.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command and data definitions for equipment (GPS, cameras, mechanisms)
pub mod eqpt;

/// Network module
pub mod net;
