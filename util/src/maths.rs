//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

/// Clamp a value into the range `[min, max]`.
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

/// The sign of a value, which is zero for a zero value (unlike `f64::signum`).
pub fn sign<T>(value: T) -> T
where
    T: Float
{
    if value == T::zero() {
        T::zero()
    }
    else {
        value.signum()
    }
}

/// The unnormalised sinc function, `sin(x)/x`, which is `1` at `x = 0`.
pub fn sinc<T>(value: T) -> T
where
    T: Float
{
    if value.abs() < T::epsilon() {
        T::one()
    }
    else {
        value.sin() / value
    }
}

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_pi<T>(value: T) -> T
where
    T: Float + FloatConst
{
    let pi_t = T::PI();

    pi_t - rem_euclid(pi_t - value, pi_t + pi_t)
}

/// Get the signed shortest angular distance from `a` to `b`.
///
/// The result is in the range (-pi, pi], positive when `b` is anticlockwise
/// of `a`.
pub fn get_ang_dist<T>(a: T, b: T) -> T
where
    T: Float + FloatConst
{
    wrap_pi(b - a)
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

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    const PI: f64 = std::f64::consts::PI;
    const TAU: f64 = std::f64::consts::TAU;

    #[test]
    fn test_wrap_pi() {
        assert_abs_diff_eq!(wrap_pi(0f64), 0f64);
        assert_abs_diff_eq!(wrap_pi(PI), PI);
        assert_abs_diff_eq!(wrap_pi(-PI), PI);
        assert_abs_diff_eq!(wrap_pi(TAU + 1.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_pi(-TAU - 1.0), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_pi(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_get_ang_dist() {
        assert_abs_diff_eq!(get_ang_dist(1f64, 2f64), 1f64, epsilon = 1e-12);
        assert_abs_diff_eq!(get_ang_dist(2f64, 1f64), -1f64, epsilon = 1e-12);
        assert_abs_diff_eq!(get_ang_dist(0f64, TAU), 0f64, epsilon = 1e-12);
        assert_abs_diff_eq!(get_ang_dist(PI - 0.1, -PI + 0.1), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(get_ang_dist(-PI + 0.1, PI - 0.1), -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_sinc() {
        assert_eq!(sinc(0f64), 1f64);
        assert_abs_diff_eq!(sinc(PI / 2.0), 2.0 / PI, epsilon = 1e-12);
        assert_abs_diff_eq!(sinc(-0.3f64), (0.3f64).sin() / 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(0f64), 0f64);
        assert_eq!(sign(-0f64), 0f64);
        assert_eq!(sign(-2.5f64), -1f64);
        assert_eq!(sign(0.1f64), 1f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&13.0, &-12.0, &12.0), 12.0);
        assert_eq!(clamp(&-13.0, &-12.0, &12.0), -12.0);
        assert_eq!(clamp(&3.0, &-12.0, &12.0), 3.0);
    }
}
