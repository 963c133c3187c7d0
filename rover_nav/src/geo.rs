//! # Geodesic maths
//!
//! Distance and bearing between GPS coordinates on the WGS84 ellipsoid, using Karney's geodesic
//! solution.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::gps::Coordinate;
use geo::{GeodesicBearing, GeodesicDestination, GeodesicDistance, Point};
use util::maths::{get_ang_dist, wrap_deg_360};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Geodesic distance between two coordinates in meters.
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    to_point(a).geodesic_distance(&to_point(b))
}

/// Geodesic distance between two coordinates in kilometers.
pub fn distance_km(a: &Coordinate, b: &Coordinate) -> f64 {
    distance_meters(a, b) / 1000.0
}

/// Initial true bearing from `a` to `b` in degrees, `[0, 360)`.
pub fn bearing_deg(a: &Coordinate, b: &Coordinate) -> f64 {
    wrap_deg_360(to_point(a).geodesic_bearing(to_point(b)))
}

/// Coordinate reached by travelling `distance_m` from `origin` along the initial true bearing
/// `bearing_deg`.
pub fn destination(origin: &Coordinate, distance_m: f64, bearing_deg: f64) -> Coordinate {
    from_point(to_point(origin).geodesic_destination(bearing_deg, distance_m))
}

/// Signed turn in degrees, `(-180, 180]`, that takes the rover from its heading onto the target
/// bearing. Positive is clockwise (turn right).
pub fn relative_bearing(rover_heading_deg: f64, target_true_bearing_deg: f64) -> f64 {
    get_ang_dist(rover_heading_deg, target_true_bearing_deg, 360.0)
}

/// Wrap any angle into `[0, 360)`.
pub fn normalise_deg(angle_deg: f64) -> f64 {
    wrap_deg_360(angle_deg)
}

fn to_point(c: &Coordinate) -> Point<f64> {
    Point::new(c.longitude, c.latitude)
}

fn from_point(p: Point<f64>) -> Coordinate {
    Coordinate::new(p.y(), p.x())
}
