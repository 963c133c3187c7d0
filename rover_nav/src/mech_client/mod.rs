//! # Mechanisms Client
//!
//! This module sends the commanded wheel speeds and LED colours to the motor controller. The
//! control loop writes the latest command into a [`SharedWheelCommand`] and the [`WheelSender`]
//! job resends it every period, whether or not it has changed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::mech::{LedMsg, WheelCommand, WheelSpeedMsg},
    net::{ActuatorSink, LinkError},
};
use log::{debug, warn};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;
use util::task::PeriodicJob;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The latest wheel command, shared between the control loop and the sender.
///
/// Both sides are packed into one atomic word so readers never see half an update.
#[derive(Clone, Debug, Default)]
pub struct SharedWheelCommand(Arc<AtomicU16>);

/// Periodic job sending the shared wheel command to the motor controller.
pub struct WheelSender<S: ActuatorSink> {
    sink: S,
    command: SharedWheelCommand,
    num_send_errors: u64,
}

/// Drives the rover's status LEDs.
pub struct LedSignal<S: ActuatorSink> {
    sink: S,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SharedWheelCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, cmd: WheelCommand) {
        self.0.store(cmd.to_bits(), Ordering::Release);
    }

    pub fn get(&self) -> WheelCommand {
        WheelCommand::from_bits(self.0.load(Ordering::Acquire))
    }
}

impl<S: ActuatorSink> WheelSender<S> {
    pub fn new(sink: S, command: SharedWheelCommand) -> Self {
        Self {
            sink,
            command,
            num_send_errors: 0,
        }
    }

    /// Encode and send the latest command once.
    pub fn send(&mut self) -> Result<usize, LinkError> {
        let msg = WheelSpeedMsg::from(self.command.get());
        self.sink.send(&msg.encode())
    }
}

impl<S: ActuatorSink> PeriodicJob for WheelSender<S> {
    fn tick(&mut self) {
        match self.send() {
            Ok(_) => self.num_send_errors = 0,
            Err(e) => {
                self.num_send_errors += 1;
                warn!("Wheel speeds not sent ({} in a row): {}", self.num_send_errors, e);
            }
        }
    }

    fn on_stop(&mut self) {
        // Leave the rover stationary
        self.command.set(WheelCommand::ZERO);
        if let Err(e) = self.send() {
            warn!("Could not send the final stop command: {}", e);
        }
    }
}

impl<S: ActuatorSink> LedSignal<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn set(&self, colour: LedMsg) {
        debug!("LEDs set to {:?}", colour);
        if let Err(e) = self.sink.send(&colour.encode()) {
            warn!("Could not set the LEDs: {}", e);
        }
    }

    /// Flash between the colour and off, ending on the colour.
    pub fn flash(&self, colour: LedMsg, count: u32, period: Duration) {
        for _ in 0..count {
            self.set(colour);
            std::thread::sleep(period / 2);
            self.set(LedMsg::OFF);
            std::thread::sleep(period / 2);
        }
        self.set(colour);
    }
}
