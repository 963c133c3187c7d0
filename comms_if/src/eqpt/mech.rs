//! # Mechanisms Equipment Commands
//!
//! Messages sent to the motor controller over the actuator link. All messages start with the
//! `0x01` start byte followed by a message type byte.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Largest wheel speed magnitude that can be commanded.
pub const MAX_WHEEL_SPEED: f64 = 90.0;

pub const START_BYTE: u8 = 0x01;
pub const WHEEL_MSG_TYPE: u8 = 0x01;
pub const LED_MSG_TYPE: u8 = 0x02;

pub const WHEEL_MSG_LEN: usize = 9;
pub const LED_MSG_LEN: usize = 5;

/// Wire value of a stationary wheel.
const WHEEL_BYTE_SCALE: f64 = 126.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Differential wheel speeds demanded of the rover, each side in `[-90, 90]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelCommand {
    pub left: i8,
    pub right: i8,
}

/// Six wheel speed message in wire order: front, middle, rear left then front, middle, rear
/// right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelSpeedMsg {
    pub wheels: [u8; 6],
}

/// RGB colour for the rover's status LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedMsg {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    #[error("Expected a {0} byte message, got {1} bytes")]
    WrongLength(usize, usize),

    #[error("Unexpected message header {0:#04x} {1:#04x}")]
    BadHeader(u8, u8),

    #[error("Checksum mismatch, message says {0:#04x} but bytes sum to {1:#04x}")]
    BadChecksum(u8, u8),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WheelCommand {
    pub const ZERO: WheelCommand = WheelCommand { left: 0, right: 0 };

    pub fn new(left: i8, right: i8) -> Self {
        Self { left, right }.clamped()
    }

    /// Build a command from floating point speeds, clamping into range and truncating toward
    /// zero.
    pub fn from_speeds(left: f64, right: f64) -> Self {
        Self {
            left: to_speed_i8(left),
            right: to_speed_i8(right),
        }
    }

    /// Pack both sides into one word so the pair can be shared atomically.
    pub fn to_bits(&self) -> u16 {
        ((self.left as u8 as u16) << 8) | (self.right as u8 as u16)
    }

    pub fn from_bits(bits: u16) -> Self {
        Self {
            left: (bits >> 8) as u8 as i8,
            right: (bits & 0xFF) as u8 as i8,
        }
    }

    fn clamped(self) -> Self {
        Self {
            left: self.left.max(-(MAX_WHEEL_SPEED as i8)).min(MAX_WHEEL_SPEED as i8),
            right: self.right.max(-(MAX_WHEEL_SPEED as i8)).min(MAX_WHEEL_SPEED as i8),
        }
    }
}

impl Default for WheelCommand {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Display for WheelCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.left, self.right)
    }
}

impl WheelSpeedMsg {
    /// Encode the message, appending the checksum of the preceding 8 bytes.
    pub fn encode(&self) -> [u8; WHEEL_MSG_LEN] {
        let mut buf = [0u8; WHEEL_MSG_LEN];
        buf[0] = START_BYTE;
        buf[1] = WHEEL_MSG_TYPE;
        buf[2..8].copy_from_slice(&self.wheels);
        buf[8] = checksum(&buf[..8]);
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != WHEEL_MSG_LEN {
            return Err(DecodeError::WrongLength(WHEEL_MSG_LEN, bytes.len()));
        }
        if bytes[0] != START_BYTE || bytes[1] != WHEEL_MSG_TYPE {
            return Err(DecodeError::BadHeader(bytes[0], bytes[1]));
        }

        let expected = checksum(&bytes[..8]);
        if bytes[8] != expected {
            return Err(DecodeError::BadChecksum(bytes[8], expected));
        }

        let mut wheels = [0u8; 6];
        wheels.copy_from_slice(&bytes[2..8]);

        Ok(Self { wheels })
    }

    /// Approximate wheel speeds represented by the message.
    pub fn speeds(&self) -> [f64; 6] {
        let mut s = [0f64; 6];
        for (speed, byte) in s.iter_mut().zip(self.wheels.iter()) {
            *speed = (*byte as f64 / WHEEL_BYTE_SCALE - 1.0) * MAX_WHEEL_SPEED;
        }
        s
    }
}

impl From<WheelCommand> for WheelSpeedMsg {
    fn from(cmd: WheelCommand) -> Self {
        let l = wheel_byte(cmd.left);
        let r = wheel_byte(cmd.right);

        Self {
            wheels: [l, l, l, r, r, r],
        }
    }
}

impl LedMsg {
    pub const RED: LedMsg = LedMsg { r: 255, g: 0, b: 0 };
    pub const GREEN: LedMsg = LedMsg { r: 0, g: 255, b: 0 };
    pub const OFF: LedMsg = LedMsg { r: 0, g: 0, b: 0 };

    pub fn encode(&self) -> [u8; LED_MSG_LEN] {
        [START_BYTE, LED_MSG_TYPE, self.r, self.g, self.b]
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Map a speed in `[-90, 90]` onto its wire byte, `-90 -> 0`, `0 -> 126`, `90 -> 252`.
pub fn wheel_byte(speed: i8) -> u8 {
    ((speed as f64 / MAX_WHEEL_SPEED + 1.0) * WHEEL_BYTE_SCALE) as u8
}

/// Sum of the bytes modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

fn to_speed_i8(speed: f64) -> i8 {
    if speed.is_nan() {
        return 0;
    }
    speed.max(-MAX_WHEEL_SPEED).min(MAX_WHEEL_SPEED).trunc() as i8
}
