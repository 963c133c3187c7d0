//! Skid steer calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::clamp;

use super::{GainSchedule, Params};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the left and right wheel speeds steering the rover onto a heading error.
///
/// A positive error (target to the right) speeds up the left side and slows the right. The
/// error is integrated into `error_accumulation`, which the caller owns and resets between
/// phases of a manouvre.
pub fn compute_speeds(
    error_accumulation: &mut f64,
    base_speed: f64,
    error_deg: f64,
    elapsed_ms: f64,
    gains: &GainSchedule,
    params: &Params
) -> (f64, f64) {
    *error_accumulation += error_deg * elapsed_ms;

    let g = gains.select(base_speed);

    let mut correction = error_deg * g.k_p;
    if params.use_integral {
        correction += *error_accumulation * g.k_i;
    }

    let left = clamp(&(base_speed + correction), &params.min_speed, &params.max_speed);
    let right = clamp(&(base_speed - correction), &params.min_speed, &params.max_speed);

    (apply_dead_zone(left, params), apply_dead_zone(right, params))
}

/// Bump a speed inside the dead zone out to the floor, keeping its direction.
pub fn apply_dead_zone(speed: f64, params: &Params) -> f64 {
    if speed != 0.0 && speed.abs() < params.dead_zone {
        params.dead_zone_floor.copysign(speed)
    }
    else {
        speed
    }
}
