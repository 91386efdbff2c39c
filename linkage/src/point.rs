/// A point-like memory layout to achieve zero copy.
///
/// The joints of a mechanism are stored as plain `[f64; 2]` arrays, this
/// trait provides the vector arithmetic and the placement formulas on them.
pub trait Point: Sized + Copy {
    /// Create a new point.
    fn point(x: f64, y: f64) -> Self;
    /// X coordinate.
    fn x(&self) -> f64;
    /// Y coordinate.
    fn y(&self) -> f64;

    /// Vector addition.
    fn add(&self, rhs: &Self) -> Self {
        Self::point(self.x() + rhs.x(), self.y() + rhs.y())
    }

    /// Vector subtraction.
    fn sub(&self, rhs: &Self) -> Self {
        Self::point(self.x() - rhs.x(), self.y() - rhs.y())
    }

    /// Scale the vector.
    fn scale(&self, k: f64) -> Self {
        Self::point(self.x() * k, self.y() * k)
    }

    /// Rotate the vector by +90°.
    fn perp(&self) -> Self {
        Self::point(-self.y(), self.x())
    }

    /// Length of the vector.
    fn norm(&self) -> f64 {
        self.x().hypot(self.y())
    }

    /// Euclidean distance.
    fn dist(&self, rhs: &Self) -> f64 {
        rhs.sub(self).norm()
    }

    /// 2-D cross product (z component).
    fn cross(&self, rhs: &Self) -> f64 {
        self.x() * rhs.y() - self.y() * rhs.x()
    }

    /// Direction angle of the vector.
    fn angle(&self) -> f64 {
        self.y().atan2(self.x())
    }

    /// Midpoint.
    fn mid(&self, rhs: &Self) -> Self {
        self.add(rhs).scale(0.5)
    }

    /// Place a point at distance `d0` and angle `a0` from this point.
    fn pla(&self, d0: f64, a0: f64) -> Self {
        Self::point(self.x() + d0 * a0.cos(), self.y() + d0 * a0.sin())
    }

    /// Place a point at distance `d0` from this point, along the direction
    /// `from -> self` turned by `a0`.
    ///
    /// With `a0 = 0` the result extends the segment `from -> self`.
    fn extend(&self, d0: f64, a0: f64, from: &Self) -> Self {
        self.pla(d0, self.sub(from).angle() + a0)
    }
}

impl Point for [f64; 2] {
    #[inline(always)]
    fn point(x: f64, y: f64) -> Self {
        [x, y]
    }
    #[inline(always)]
    fn x(&self) -> f64 {
        self[0]
    }
    #[inline(always)]
    fn y(&self) -> f64 {
        self[1]
    }
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_angle(a: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let a = a.rem_euclid(TAU);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn extend_is_collinear() {
        let p = [3., 4.].extend(5., 0., &[0., 0.]);
        assert_abs_diff_eq!(p[0], 6., epsilon = 1e-12);
        assert_abs_diff_eq!(p[1], 8., epsilon = 1e-12);
        let p = [1., 0.].extend(1., FRAC_PI_2, &[0., 0.]);
        assert_abs_diff_eq!(p[0], 1., epsilon = 1e-12);
        assert_abs_diff_eq!(p[1], 1., epsilon = 1e-12);
    }

    #[test]
    fn wrap() {
        assert_abs_diff_eq!(wrap_angle(3. * PI), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(-FRAC_PI_2), -FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(1.5 * PI), -FRAC_PI_2, epsilon = 1e-12);
    }
}
