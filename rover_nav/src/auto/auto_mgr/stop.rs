//! # [`Stop`] AutoMgr state

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::mech::WheelCommand;

use super::{
    AutoMgrError, AutoMgrPersistantData, NavOutcome, StepOutput, TickInput, params::AutoMgrParams
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Terminal state of the AutoMgr.
///
/// The rover is held stationary and there are no transitions out.
#[derive(Debug)]
pub struct Stop {
    outcome: NavOutcome,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Stop {
    pub fn new(outcome: NavOutcome) -> Self {
        Self { outcome }
    }

    pub fn outcome(&self) -> NavOutcome {
        self.outcome
    }

    pub fn step(
        &mut self,
        _params: &AutoMgrParams,
        _persistant: &mut AutoMgrPersistantData,
        _input: &TickInput,
    ) -> Result<StepOutput, AutoMgrError> {
        Ok(StepOutput::hold(WheelCommand::ZERO))
    }
}
