//! # Rover Executable Parameters
//!
//! This module provide parameters for the rover executable, loaded from `rov_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RovExecParams {

    /// Host of the motor controller's actuator link
    pub mbed_host: String,

    /// UDP port of the motor controller's actuator link
    pub mbed_port: u16,

    /// Host of the GPS receiver
    pub gps_host: String,

    /// Port of the GPS receiver
    pub gps_port: u16,

    /// Period at which the GPS receiver is sampled
    pub gps_period_ms: u64,

    /// Period at which the wheel speeds are resent to the motor controller
    pub wheel_period_ms: u64,

    /// Number of flashes of the LEDs at the end of a mission
    pub led_flash_count: u32,

    pub led_flash_period_ms: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RovExecParams {
    pub fn are_valid(&self) -> Result<(), String> {
        if self.gps_period_ms == 0 || self.wheel_period_ms == 0 {
            return Err("Task periods must be non-zero".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_exec_params() {
        let p: RovExecParams = util::params::from_str(
            r#"
            mbed_host = "10.0.0.2"
            mbed_port = 1001
            gps_host = "localhost"
            gps_port = 55556
            gps_period_ms = 100
            wheel_period_ms = 100
            led_flash_count = 5
            led_flash_period_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(p.mbed_port, 1001);
        assert!(p.are_valid().is_ok());
        assert!(RovExecParams { wheel_period_ms: 0, ..p }.are_valid().is_err());
    }

    #[test]
    fn test_shipped_params_valid() {
        let p: RovExecParams =
            util::params::from_str(include_str!("../../params/rov_exec.toml")).unwrap();
        assert!(p.are_valid().is_ok());

        // GPS is polled and wheel speeds resent every 100 ms
        assert_eq!(p.gps_period_ms, 100);
        assert_eq!(p.wheel_period_ms, 100);
    }
}
