//! Math primitives shared by the rxd engine crates.

use nalgebra as na;

/// 3D vector alias.
pub type Vec3 = na::Vector3<f64>;

/// Positive modulo: wraps `i` into `[0, n)` regardless of the sign of `i`.
///
/// `n` must be positive.
#[inline]
pub fn positive_modulo(i: i64, n: i64) -> i64 {
    ((i % n) + n) % n
}
