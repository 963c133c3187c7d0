//! # Waypoint files
//!
//! Waypoint files are plain text with one `<latitude> <longitude>` pair per line, in decimal
//! degrees. Byte order marks are stripped wherever they appear and blank lines are ignored. Any
//! other malformed line fails the whole file.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::gps::Coordinate;
use std::path::{Path, PathBuf};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const BOM: char = '\u{feff}';

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WaypointError {
    #[error("Could not read waypoint file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Line {0}: expected \"<lat> <lon>\", found {1:?}")]
    MalformedLine(usize, String),

    #[error("Line {0}: {1:?} is not a number")]
    InvalidNumber(usize, String),

    #[error("Line {0}: coordinate ({1}, {2}) is out of range")]
    OutOfRange(usize, f64, f64),

    #[error("The waypoint file contains no waypoints")]
    Empty,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Load and parse a waypoint file.
pub fn load_waypoints<P: AsRef<Path>>(path: P) -> Result<Vec<Coordinate>, WaypointError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| WaypointError::FileLoadError(path.to_path_buf(), e))?;

    parse_waypoints(&text)
}

/// Parse the contents of a waypoint file, keeping the order of the lines.
pub fn parse_waypoints(text: &str) -> Result<Vec<Coordinate>, WaypointError> {
    let mut waypoints = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line_num = i + 1;
        let line = line.replace(BOM, "");
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 2 {
            return Err(WaypointError::MalformedLine(line_num, line.to_string()));
        }

        let parse = |t: &str| {
            t.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| WaypointError::InvalidNumber(line_num, t.to_string()))
        };

        let lat = parse(tokens[0])?;
        let lon = parse(tokens[1])?;

        if lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(WaypointError::OutOfRange(line_num, lat, lon));
        }

        waypoints.push(Coordinate::new(lat, lon));
    }

    if waypoints.is_empty() {
        return Err(WaypointError::Empty);
    }

    Ok(waypoints)
}
