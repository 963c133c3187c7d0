//! # Mission report
//!
//! Summary of a mission, saved into the session directory when the mission ends.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use comms_if::eqpt::gps::GpsFix;
use serde::Serialize;

use crate::auto::per::MarkerTarget;

use super::NavOutcome;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MissionReport {
    /// `None` if the mission was still running when the report was made
    pub outcome: Option<NavOutcome>,

    pub final_state: String,

    pub num_ticks: u64,

    pub target: Option<MarkerTarget>,

    pub final_fix: Option<GpsFix>,
}
