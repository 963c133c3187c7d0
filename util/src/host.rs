//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable pointing at the software root.
pub const SW_ROOT_ENV: &str = "ROVER_SW_ROOT";

/// Get the software root directory.
///
/// This is the value of `ROVER_SW_ROOT` if set, otherwise the current working
/// directory.
pub fn get_sw_root() -> std::io::Result<PathBuf> {
    match std::env::var_os(SW_ROOT_ENV) {
        Some(p) => Ok(PathBuf::from(p)),
        None => std::env::current_dir()
    }
}
