//! Assigns a velocity profile to a list of path points

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{PoseWithCurvature, TrajConstraint, TrajError, TrajectoryState};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Steps shorter than this are treated as zero length.
///
/// Units: meters
const MIN_STEP_M: f64 = 1e-6;

/// Tolerance used when comparing accelerations and velocities.
const EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits on the motion at a single path point.
#[derive(Debug, Copy, Clone)]
struct ConstrainedPoint {
    point: PoseWithCurvature,

    /// Distance along the path to this point
    dist_m: f64,

    /// Speed at this point, unsigned
    max_vel_ms: f64,

    min_accel_mss: f64,

    max_accel_mss: f64,
}

/// Global limits applied to every point.
pub(super) struct Limits {
    pub start_vel_ms: f64,
    pub end_vel_ms: f64,
    pub max_vel_ms: f64,
    pub max_accel_mss: f64,
    pub reversed: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Time-parameterise the path points, returning one trajectory state per point.
///
/// A forward pass limits the speed at each point to what can be reached by accelerating from
/// the previous point, and a backward pass limits it to what can be stopped from (down to the
/// end velocity) before the next point. The resulting speed profile is then integrated to find
/// the time at each point.
pub(super) fn parameterize(
    points: &[PoseWithCurvature],
    constraints: &[&dyn TrajConstraint],
    limits: &Limits,
) -> Result<Vec<TrajectoryState>, TrajError> {
    if points.is_empty() {
        return Err(TrajError::InfeasiblePath("path has no points".into()));
    }

    let mut constrained: Vec<ConstrainedPoint> = Vec::with_capacity(points.len());

    // Forward pass
    let mut pred = ConstrainedPoint {
        point: points[0],
        dist_m: 0.0,
        max_vel_ms: limits.start_vel_ms,
        min_accel_mss: -limits.max_accel_mss,
        max_accel_mss: limits.max_accel_mss,
    };

    for (i, point) in points.iter().enumerate() {
        let ds = point.pose.distance_to(&pred.point.pose);
        let mut current = ConstrainedPoint {
            point: *point,
            dist_m: pred.dist_m + ds,
            max_vel_ms: 0.0,
            min_accel_mss: 0.0,
            max_accel_mss: 0.0,
        };

        loop {
            // Fastest speed reachable by accelerating from the predecessor
            current.max_vel_ms = limits.max_vel_ms.min(
                (pred.max_vel_ms.powi(2) + 2.0 * pred.max_accel_mss * ds)
                    .max(0.0)
                    .sqrt(),
            );
            current.min_accel_mss = -limits.max_accel_mss;
            current.max_accel_mss = limits.max_accel_mss;

            for c in constraints.iter() {
                current.max_vel_ms = current.max_vel_ms.min(c.max_velocity_ms(
                    &point.pose,
                    point.curvature_radpm,
                    current.max_vel_ms,
                ));
            }

            enforce_accel_limits(&mut current, constraints, limits.reversed)?;

            if ds < MIN_STEP_M {
                break;
            }

            let actual_accel = (current.max_vel_ms.powi(2) - pred.max_vel_ms.powi(2)) / (2.0 * ds);

            if current.max_accel_mss < actual_accel - EPSILON {
                // The predecessor accelerates too hard to stay within this point's limits, so
                // lower its acceleration and try again
                pred.max_accel_mss = current.max_accel_mss;
            }
            else {
                if actual_accel > pred.min_accel_mss {
                    pred.max_accel_mss = actual_accel;
                }
                break;
            }
        }

        if i > 0 {
            constrained[i - 1] = pred;
        }
        constrained.push(current);
        pred = current;
    }

    // Backward pass
    let last = constrained.len() - 1;
    let mut succ = ConstrainedPoint {
        point: constrained[last].point,
        dist_m: constrained[last].dist_m,
        max_vel_ms: limits.end_vel_ms,
        min_accel_mss: -limits.max_accel_mss,
        max_accel_mss: limits.max_accel_mss,
    };

    for i in (0..=last).rev() {
        let mut current = constrained[i];
        // Negative, as the successor is further along the path
        let ds = current.dist_m - succ.dist_m;

        loop {
            // Fastest speed from which the successor's speed can be reached by decelerating
            let new_max_vel_ms = (succ.max_vel_ms.powi(2) + 2.0 * succ.min_accel_mss * ds)
                .max(0.0)
                .sqrt();

            if new_max_vel_ms >= current.max_vel_ms {
                break;
            }

            current.max_vel_ms = new_max_vel_ms;

            if ds > -MIN_STEP_M {
                break;
            }

            enforce_accel_limits(&mut current, constraints, limits.reversed)?;

            let actual_accel = (current.max_vel_ms.powi(2) - succ.max_vel_ms.powi(2)) / (2.0 * ds);

            if current.min_accel_mss > actual_accel + EPSILON {
                succ.min_accel_mss = current.min_accel_mss;
            }
            else {
                succ.min_accel_mss = actual_accel;
                break;
            }
        }

        if i < last {
            constrained[i + 1] = succ;
        }
        constrained[i] = current;
        succ = current;
    }

    integrate(&constrained, limits.reversed)
}

/// Integrate the speed profile over distance to get the time at each point.
fn integrate(constrained: &[ConstrainedPoint], reversed: bool) -> Result<Vec<TrajectoryState>, TrajError> {
    let dir = if reversed { -1.0 } else { 1.0 };

    let mut states: Vec<TrajectoryState> = Vec::with_capacity(constrained.len());
    let mut time_s: f64 = 0.0;
    let mut dist_m: f64 = 0.0;
    let mut vel_ms: f64 = 0.0;

    for (i, c) in constrained.iter().enumerate() {
        let ds = c.dist_m - dist_m;
        let mut accel_mss: f64 = 0.0;
        let mut dt: f64 = 0.0;

        if i > 0 {
            accel_mss = (c.max_vel_ms.powi(2) - vel_ms.powi(2)) / (2.0 * ds);

            if accel_mss.abs() > EPSILON {
                dt = (c.max_vel_ms - vel_ms) / accel_mss;
            }
            else if vel_ms.abs() > EPSILON {
                dt = ds / vel_ms;
            }
            else {
                return Err(TrajError::InfeasiblePath(format!(
                    "vehicle cannot move between points {} and {}",
                    i - 1,
                    i
                )));
            }

            // The acceleration of a state applies until the next state
            states[i - 1].accel_mss = accel_mss * dir;
        }

        vel_ms = c.max_vel_ms;
        dist_m = c.dist_m;
        time_s += dt;

        states.push(TrajectoryState {
            time_s,
            pose: c.point.pose,
            velocity_ms: vel_ms * dir,
            accel_mss: accel_mss * dir,
            curvature_radpm: c.point.curvature_radpm,
        });
    }

    Ok(states)
}

/// Narrow the point's acceleration range to the range allowed by every constraint.
fn enforce_accel_limits(
    point: &mut ConstrainedPoint,
    constraints: &[&dyn TrajConstraint],
    reversed: bool,
) -> Result<(), TrajError> {
    let dir = if reversed { -1.0 } else { 1.0 };

    for c in constraints.iter() {
        let (min, max) = c.min_max_accel(
            &point.point.pose,
            point.point.curvature_radpm,
            point.max_vel_ms * dir,
        );

        if min > max {
            return Err(TrajError::InfeasiblePath(format!(
                "constraints leave no achievable acceleration at ({:.3}, {:.3})",
                point.point.pose.x_m, point.point.pose.y_m
            )));
        }

        // Constraints work in the signed direction of travel, the profile is unsigned
        let (min, max) = if reversed { (-max, -min) } else { (min, max) };

        point.min_accel_mss = point.min_accel_mss.max(min);
        point.max_accel_mss = point.max_accel_mss.min(max);
    }

    Ok(())
}
