//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Get the signed angular distance from `a` to `b` for angles which wrap with
/// the given `period` (e.g. 360 for degrees).
///
/// The result is the shortest turn taking `a` onto `b`, in the range
/// `(-period/2, period/2]`. Positive values are clockwise for compass angles.
pub fn get_ang_dist<T>(a: T, b: T, period: T) -> T
where
    T: Float
{
    let c = rem_euclid(a - b, period);
    let d = rem_euclid(b - a, period);

    if c < d {
        -c
    }
    else {
        d
    }
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn wrap_deg_360<T>(value: T) -> T
where
    T: Float
{
    let full = T::from(360.0).unwrap_or_else(T::nan);
    let r = rem_euclid(value, full);

    // Round-off in rem_euclid can land exactly on the period
    if r >= full { T::zero() } else { r }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}
