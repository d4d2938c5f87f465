//! Cubic Hermite splines fitted through waypoints, and their subdivision into points

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;
use std::f64::consts::PI;

use crate::loc::Pose2d;

use super::TrajError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Scale applied to the distance to the neighbouring waypoint to get the end tangent length.
const END_TANGENT_SCALE: f64 = 1.2;

/// Maximum forward step between two subdivided points.
///
/// Units: meters
const MAX_DX_M: f64 = 0.127;

/// Maximum lateral step between two subdivided points.
///
/// Units: meters
const MAX_DY_M: f64 = 0.00127;

/// Maximum heading change between two subdivided points.
///
/// Units: radians
const MAX_DHEADING_RAD: f64 = 0.0872;

/// Subdivision of a single spline is abandoned after this many iterations.
const MAX_SUBDIVISION_ITERS: usize = 5000;

/// Waypoints closer than this are treated as coincident.
///
/// Units: meters
const MIN_WAYPOINT_SPACING_M: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point on a path, with the curvature of the path at that point.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct PoseWithCurvature {
    pub pose: Pose2d,

    /// Units: 1/meters
    pub curvature_radpm: f64,
}

/// A cubic Hermite segment between two points, defined by the points and their tangents.
#[derive(Debug, Copy, Clone)]
pub(super) struct CubicHermiteSpline {
    p0: Vector2<f64>,
    m0: Vector2<f64>,
    p1: Vector2<f64>,
    m1: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CubicHermiteSpline {
    pub(super) fn new(p0: Vector2<f64>, m0: Vector2<f64>, p1: Vector2<f64>, m1: Vector2<f64>) -> Self {
        Self { p0, m0, p1, m1 }
    }

    /// Position, first and second derivatives at parameter `t` in [0, 1].
    fn derivatives(&self, t: f64) -> (Vector2<f64>, Vector2<f64>, Vector2<f64>) {
        let t2 = t * t;
        let t3 = t2 * t;

        let pos = self.p0 * (2.0 * t3 - 3.0 * t2 + 1.0)
            + self.m0 * (t3 - 2.0 * t2 + t)
            + self.p1 * (-2.0 * t3 + 3.0 * t2)
            + self.m1 * (t3 - t2);

        let d1 = self.p0 * (6.0 * t2 - 6.0 * t)
            + self.m0 * (3.0 * t2 - 4.0 * t + 1.0)
            + self.p1 * (-6.0 * t2 + 6.0 * t)
            + self.m1 * (3.0 * t2 - 2.0 * t);

        let d2 = self.p0 * (12.0 * t - 6.0)
            + self.m0 * (6.0 * t - 4.0)
            + self.p1 * (-12.0 * t + 6.0)
            + self.m1 * (6.0 * t - 2.0);

        (pos, d1, d2)
    }

    /// Pose and curvature at parameter `t` in [0, 1].
    pub(super) fn point(&self, t: f64) -> PoseWithCurvature {
        let (pos, d1, d2) = self.derivatives(t);

        let speed_sq = d1.norm_squared();
        let curvature_radpm = (d1[0] * d2[1] - d1[1] * d2[0]) / (speed_sq * speed_sq.sqrt());

        PoseWithCurvature {
            pose: Pose2d::new(pos[0], pos[1], d1[1].atan2(d1[0])),
            curvature_radpm,
        }
    }

    /// Subdivide the spline until each step between consecutive points is small enough.
    ///
    /// The returned list starts with the point at `t = 0` and ends with the point at `t = 1`.
    pub(super) fn subdivide(&self) -> Result<Vec<PoseWithCurvature>, TrajError> {
        let mut points = vec![self.point(0.0)];

        // Intervals still to check, the next one to check is at the end
        let mut stack = vec![(0.0, 1.0)];
        let mut iters = 0;

        while let Some((t0, t1)) = stack.pop() {
            let start = self.point(t0);
            let end = self.point(t1);

            let (dx, dy, dheading) = twist_between(&start.pose, &end.pose);

            if dx.abs() > MAX_DX_M || dy.abs() > MAX_DY_M || dheading.abs() > MAX_DHEADING_RAD {
                let mid = 0.5 * (t0 + t1);
                stack.push((mid, t1));
                stack.push((t0, mid));
            }
            else {
                points.push(end);
            }

            iters += 1;
            if iters >= MAX_SUBDIVISION_ITERS {
                return Err(TrajError::InfeasiblePath(
                    "spline could not be subdivided, it may contain a cusp".into(),
                ));
            }
        }

        Ok(points)
    }
}

/// Fit clamped cubic splines through the waypoints and subdivide them into a single list of
/// points with their curvatures.
///
/// When `reversed` is set the path is driven backwards, so the headings in the returned points
/// point against the direction of travel and the curvatures are negated.
pub(super) fn path_points(
    start: &Pose2d,
    interior: &[Vector2<f64>],
    end: &Pose2d,
    reversed: bool,
) -> Result<Vec<PoseWithCurvature>, TrajError> {
    let (start, end) = if reversed {
        (
            Pose2d::new(start.x_m, start.y_m, start.heading_rad + PI),
            Pose2d::new(end.x_m, end.y_m, end.heading_rad + PI),
        )
    }
    else {
        (*start, *end)
    };

    let splines = fit_splines(&start, interior, &end)?;

    let mut points = Vec::new();
    for (i, spline) in splines.iter().enumerate() {
        let spline_points = spline.subdivide()?;

        // The first point of each following spline is the last point of the previous one
        let skip = if i == 0 { 0 } else { 1 };
        points.extend(spline_points.into_iter().skip(skip));
    }

    if reversed {
        for p in points.iter_mut() {
            p.pose = Pose2d::new(p.pose.x_m, p.pose.y_m, p.pose.heading_rad + PI);
            p.curvature_radpm = -p.curvature_radpm;
        }
    }

    if points.iter().any(|p| !p.curvature_radpm.is_finite()) {
        return Err(TrajError::InfeasiblePath(
            "path has a point with undefined curvature".into(),
        ));
    }

    Ok(points)
}

/// Fit one cubic spline per pair of consecutive waypoints.
///
/// The tangent at the start and end follows the heading of the pose, with a length
/// proportional to the distance to the neighbouring waypoint. Interior tangents are chosen so
/// that the second derivative is continuous across waypoints.
pub(super) fn fit_splines(
    start: &Pose2d,
    interior: &[Vector2<f64>],
    end: &Pose2d,
) -> Result<Vec<CubicHermiteSpline>, TrajError> {
    let mut waypoints = Vec::with_capacity(interior.len() + 2);
    waypoints.push(start.position());
    waypoints.extend_from_slice(interior);
    waypoints.push(end.position());

    if let Some(i) = waypoints
        .iter()
        .position(|w| !w[0].is_finite() || !w[1].is_finite())
    {
        return Err(TrajError::InfeasiblePath(format!(
            "waypoint {} is not finite",
            i
        )));
    }
    if !start.heading_rad.is_finite() || !end.heading_rad.is_finite() {
        return Err(TrajError::InfeasiblePath("end headings must be finite".into()));
    }

    if let Some(i) = waypoints
        .windows(2)
        .position(|w| (w[1] - w[0]).norm() < MIN_WAYPOINT_SPACING_M)
    {
        return Err(TrajError::InfeasiblePath(format!(
            "waypoints {} and {} are coincident",
            i,
            i + 1
        )));
    }

    let n = waypoints.len();

    let start_tangent =
        start.forward() * END_TANGENT_SCALE * (waypoints[1] - waypoints[0]).norm();
    let end_tangent =
        end.forward() * END_TANGENT_SCALE * (waypoints[n - 1] - waypoints[n - 2]).norm();

    let mut tangents = vec![start_tangent];

    if n > 2 {
        // Continuity of the second derivative gives m[i-1] + 4 m[i] + m[i+1] = 3 (p[i+1] - p[i-1])
        // for each interior waypoint, with the end tangents known.
        let mut rhs: Vec<Vector2<f64>> = (1..n - 1)
            .map(|i| (waypoints[i + 1] - waypoints[i - 1]) * 3.0)
            .collect();
        rhs[0] -= start_tangent;
        let last = rhs.len() - 1;
        rhs[last] -= end_tangent;

        tangents.extend(solve_tridiagonal(1.0, 4.0, 1.0, &rhs));
    }

    tangents.push(end_tangent);

    Ok((0..n - 1)
        .map(|i| CubicHermiteSpline::new(waypoints[i], tangents[i], waypoints[i + 1], tangents[i + 1]))
        .collect())
}

/// Solve a tridiagonal system with constant diagonals (sub `a`, main `b`, super `c`) using the
/// Thomas algorithm.
fn solve_tridiagonal(a: f64, b: f64, c: f64, rhs: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
    let n = rhs.len();
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![Vector2::zeros(); n];

    c_prime[0] = c / b;
    d_prime[0] = rhs[0] / b;

    for i in 1..n {
        let denom = b - a * c_prime[i - 1];
        c_prime[i] = c / denom;
        d_prime[i] = (rhs[i] - d_prime[i - 1] * a) / denom;
    }

    let mut x = d_prime.clone();
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - x[i + 1] * c_prime[i];
    }

    x
}

/// The constant curvature motion (forward, lateral, heading change) which takes `start` to
/// `end`.
fn twist_between(start: &Pose2d, end: &Pose2d) -> (f64, f64, f64) {
    let rel = end.relative_to(start);
    let dheading = rel.heading_rad;
    let half_dheading = 0.5 * dheading;
    let cos_minus_one = dheading.cos() - 1.0;

    let half_by_tan = if cos_minus_one.abs() < 1e-9 {
        1.0 - dheading * dheading / 12.0
    }
    else {
        -(half_dheading * dheading.sin()) / cos_minus_one
    };

    (
        half_by_tan * rel.x_m + half_dheading * rel.y_m,
        -half_dheading * rel.x_m + half_by_tan * rel.y_m,
        dheading,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_straight_spline() {
        let points = path_points(
            &Pose2d::new(0.0, 0.0, 0.0),
            &[],
            &Pose2d::new(2.0, 0.0, 0.0),
            false,
        )
        .unwrap();

        assert!(points.len() >= 16);
        for p in points.iter() {
            assert_abs_diff_eq!(p.pose.y_m, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(p.pose.heading_rad, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(p.curvature_radpm, 0.0, epsilon = 1e-12);
        }
        for w in points.windows(2) {
            assert!(w[1].pose.x_m - w[0].pose.x_m <= MAX_DX_M + 1e-12);
        }
    }

    #[test]
    fn test_passes_through_waypoints() {
        let start = Pose2d::new(0.0, 0.0, 0.0);
        let end = Pose2d::new(3.0, 0.0, 0.0);
        let interior = [Vector2::new(1.0, 1.0), Vector2::new(2.0, -1.0)];

        let splines = fit_splines(&start, &interior, &end).unwrap();
        assert_eq!(splines.len(), 3);

        let p = splines[0].point(1.0);
        assert_abs_diff_eq!(p.pose.x_m, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.pose.y_m, 1.0, epsilon = 1e-12);

        // Continuous tangent and curvature across the interior waypoint
        let q = splines[1].point(0.0);
        assert_abs_diff_eq!(p.pose.heading_rad, q.pose.heading_rad, epsilon = 1e-9);
        assert_abs_diff_eq!(p.curvature_radpm, q.curvature_radpm, epsilon = 1e-9);

        let points = path_points(&start, &interior, &end, false).unwrap();
        let first = points.first().unwrap();
        let last = points.last().unwrap();
        assert!(first.pose.approx_eq(&start, 1e-12, 1e-12));
        assert!(last.pose.approx_eq(&end, 1e-9, 1e-9));

        // No duplicated points at the joins
        for w in points.windows(2) {
            assert!(w[0].pose.distance_to(&w[1].pose) > 0.0);
        }
    }

    #[test]
    fn test_end_headings_followed() {
        let start = Pose2d::new(0.0, 0.0, 0.0);
        let end = Pose2d::new(1.0, 1.0, FRAC_PI_2);

        let points = path_points(&start, &[], &end, false).unwrap();
        let last = points.last().unwrap();
        assert_abs_diff_eq!(last.pose.heading_rad, FRAC_PI_2, epsilon = 1e-9);

        // Left turn has positive curvature
        assert!(points[points.len() / 2].curvature_radpm > 0.0);
    }

    #[test]
    fn test_reversed() {
        let start = Pose2d::new(0.0, 0.0, 0.0);
        let end = Pose2d::new(-2.0, 0.0, 0.0);

        let points = path_points(&start, &[], &end, true).unwrap();
        for p in points.iter() {
            assert_abs_diff_eq!(p.pose.heading_rad, 0.0, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(points.last().unwrap().pose.x_m, -2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_coincident_waypoints() {
        let res = path_points(
            &Pose2d::new(0.0, 0.0, 0.0),
            &[Vector2::new(0.0, 0.0)],
            &Pose2d::new(1.0, 0.0, 0.0),
            false,
        );
        assert!(matches!(res, Err(TrajError::InfeasiblePath(_))));
    }
}
