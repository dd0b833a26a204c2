//! Simulation box geometry.
//!
//! Positions are box-centered: each axis spans `[-L/2, L/2)`. Periodic axes
//! wrap, non-periodic axes are hard walls as far as cell resolution is
//! concerned.

use rxd_math::Vec3;

/// Box geometry plus the global step constants shared by all programs.
#[derive(Debug, Clone)]
pub struct Context {
    pub box_size: Vec3,
    pub periodic: [bool; 3],
    /// Integration time step.
    pub dt: f64,
    /// Thermal energy, scales the drift term of the diffusion integrator.
    pub kbt: f64,
}

impl Context {
    pub fn new(box_size: Vec3, periodic: [bool; 3]) -> Self {
        Self {
            box_size,
            periodic,
            dt: 1e-2,
            kbt: 1.0,
        }
    }

    /// Shortest vector from `a` to `b`, minimum-image on periodic axes.
    pub fn shortest_difference(&self, a: &Vec3, b: &Vec3) -> Vec3 {
        let mut d = b - a;
        for axis in 0..3 {
            if self.periodic[axis] {
                let l = self.box_size[axis];
                d[axis] -= l * (d[axis] / l).round();
            }
        }
        d
    }

    /// Squared distance under the minimum-image convention.
    pub fn dist_sq(&self, a: &Vec3, b: &Vec3) -> f64 {
        self.shortest_difference(a, b).norm_squared()
    }

    /// Wraps `pos` into `[-L/2, L/2)` on periodic axes; non-periodic axes
    /// are left untouched.
    pub fn fix_position(&self, pos: &mut Vec3) {
        for axis in 0..3 {
            if self.periodic[axis] {
                let l = self.box_size[axis];
                pos[axis] -= l * (pos[axis] / l + 0.5).floor();
            }
        }
    }

    /// True when `pos` lies inside the box on every non-periodic axis.
    pub fn in_box(&self, pos: &Vec3) -> bool {
        (0..3).all(|axis| {
            self.periodic[axis]
                || (pos[axis] >= -0.5 * self.box_size[axis]
                    && pos[axis] < 0.5 * self.box_size[axis])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn shortest_difference_wraps_periodic_axes() {
        let ctx = Context::new(Vec3::new(10.0, 10.0, 10.0), [true, true, true]);
        let a = Vec3::new(4.5, 0.0, 0.0);
        let b = Vec3::new(-4.5, 0.0, 0.0);
        let d = ctx.shortest_difference(&a, &b);
        assert_relative_eq!(d.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn shortest_difference_plain_on_nonperiodic_axes() {
        let ctx = Context::new(Vec3::new(10.0, 10.0, 10.0), [false, false, false]);
        let a = Vec3::new(4.5, 0.0, 0.0);
        let b = Vec3::new(-4.5, 0.0, 0.0);
        assert_relative_eq!(ctx.shortest_difference(&a, &b).x, -9.0, epsilon = 1e-12);
    }

    #[test]
    fn fix_position_wraps_into_box() {
        let ctx = Context::new(Vec3::new(10.0, 10.0, 30.0), [true, true, false]);
        let mut p = Vec3::new(6.0, 5.0, 16.0);
        ctx.fix_position(&mut p);
        assert_relative_eq!(p.x, -4.0, epsilon = 1e-12);
        // the upper box face belongs to the opposite side
        assert_relative_eq!(p.y, -5.0, epsilon = 1e-12);
        // non-periodic axis untouched, even out of range
        assert_relative_eq!(p.z, 16.0, epsilon = 1e-12);
    }

    #[test]
    fn in_box_respects_periodicity() {
        let ctx = Context::new(Vec3::new(10.0, 10.0, 30.0), [true, true, false]);
        assert!(ctx.in_box(&Vec3::new(100.0, 0.0, 0.0)));
        assert!(!ctx.in_box(&Vec3::new(0.0, 0.0, 15.0)));
        assert!(ctx.in_box(&Vec3::new(0.0, 0.0, 14.9)));
    }
}
