//! # Equipment Interface
//!
//! This module defines the capabilities and messages exchanged with the rover's equipment.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod cam;
pub mod gps;
pub mod mech;
