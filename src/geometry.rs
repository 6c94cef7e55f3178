//! Small helpers over `kurbo` points and vectors.

use kurbo::{Point, Vec2};
use std::f64::consts::{PI, TAU};

/// Ticks (100ns units) per millisecond.
pub const TICKS_PER_MS: f64 = 10_000.0;

/// Threshold for treating a value as zero.
pub const EPSILON: f64 = 2.220_446_049_250_313e-16;

pub fn is_finite_point(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

pub fn is_zero(value: f64) -> bool {
    value.abs() < 10.0 * EPSILON
}

/// Signed angle in radians that rotates `from` onto `to`, in `[-π, π]`.
pub fn angle_between(from: Vec2, to: Vec2) -> f64 {
    if is_zero(from.hypot2()) || is_zero(to.hypot2()) {
        return 0.0;
    }
    from.cross(to).atan2(from.dot(to))
}

/// Wraps an angle into `[-π, π]`.
pub fn wrap_angle(mut angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    while angle > PI {
        angle -= TAU;
    }
    while angle < -PI {
        angle += TAU;
    }
    angle
}

/// Replaces an infinity with the largest finite value of the same sign.
pub fn force_finite(value: f64) -> f64 {
    if value == f64::INFINITY {
        f64::MAX
    } else if value == f64::NEG_INFINITY {
        -f64::MAX
    } else {
        value
    }
}

/// Mean position of `points`, or `None` when there are none.
///
/// Accumulated as a running mean so finite inputs never overflow.
pub fn centroid<I>(points: I) -> Option<Point>
where
    I: IntoIterator<Item = Point>,
{
    let mut count = 0usize;
    let mut mean = Vec2::ZERO;
    for p in points {
        count += 1;
        let k = count as f64;
        mean += p.to_vec2() / k - mean / k;
    }
    (count > 0).then(|| mean.to_point())
}
