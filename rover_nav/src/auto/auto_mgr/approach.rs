//! # [`Approach`] AutoMgr state

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use comms_if::eqpt::mech::WheelCommand;
use log::info;

use crate::{auto::per::MarkerSighting, loco_ctrl::GainSchedule};

use super::{
    AutoMgrError,
    AutoMgrPersistantData,
    AutoMgrState,
    NavOutcome,
    StepOutput,
    SuccessCause,
    TickInput,
    centre::hold_or_lose,
    params::AutoMgrParams,
    states::Stop,
};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Drives towards the centred marker, steering on its angle.
///
/// Possible transitions:
/// - Stop, once within the stop distance or if the marker is lost
#[derive(Debug, Default)]
pub struct Approach {
    lost_ticks: u32,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Approach {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(
        &mut self,
        params: &AutoMgrParams,
        persistant: &mut AutoMgrPersistantData,
        input: &TickInput,
    ) -> Result<StepOutput, AutoMgrError> {
        match input.sighting.unwrap_or_default() {
            MarkerSighting::Found { distance_cm, angle_deg } => {
                self.lost_ticks = 0;

                if distance_cm <= params.approach.stop_distance_cm {
                    info!("Marker reached, {:.0} cm away", distance_cm);
                    return Ok(StepOutput::replace(
                        AutoMgrState::Stop(Stop::new(NavOutcome::Success(
                            SuccessCause::ReachedMarker
                        ))),
                        WheelCommand::ZERO,
                    ));
                }

                let gains = GainSchedule {
                    drive: params.approach.gains,
                    pivot: params.gains.pivot,
                };

                let cmd = persistant.drive_ctrl.step(
                    params.base_speed - params.approach.speed_offset,
                    angle_deg,
                    params.approach.tick_ms as f64,
                    &gains,
                );

                Ok(StepOutput::hold(cmd))
            }
            MarkerSighting::NotFound => Ok(hold_or_lose(
                &mut self.lost_ticks,
                params.approach.loss_tolerance_ticks,
                persistant.last_cmd,
            )),
        }
    }
}
