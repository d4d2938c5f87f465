//! Trajectory and trajectory state definitions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::loc::Pose2d;

use super::TrajError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest start time accepted as "zero" when validating loaded trajectories.
const START_TIME_TOL_S: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One reference state of a trajectory.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryState {
    /// Time since the start of the trajectory
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Reference pose
    pub pose: Pose2d,

    /// Signed linear velocity, negative when driving backwards
    ///
    /// Units: meters/second
    pub velocity_ms: f64,

    /// Signed linear acceleration
    ///
    /// Units: meters/second^2
    pub accel_mss: f64,

    /// Curvature of the path, positive when turning anticlockwise
    ///
    /// Units: 1/meters
    pub curvature_radpm: f64,
}

/// A time-indexed sequence of reference states.
///
/// Invariants, enforced on construction:
/// - there is at least one state
/// - the first state is at time zero
/// - times are strictly increasing
/// - every value is finite
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    states: Vec<TrajectoryState>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajectoryState {
    /// Reference angular velocity of the state.
    ///
    /// Units: radians/second
    pub fn angular_velocity_rads(&self) -> f64 {
        self.velocity_ms * self.curvature_radpm
    }

    fn is_finite(&self) -> bool {
        [
            self.time_s,
            self.pose.x_m,
            self.pose.y_m,
            self.pose.heading_rad,
            self.velocity_ms,
            self.accel_mss,
            self.curvature_radpm,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

impl Trajectory {
    /// Build a trajectory from a list of states, checking the trajectory invariants.
    pub fn from_states(states: Vec<TrajectoryState>) -> Result<Self, TrajError> {
        let first = states
            .first()
            .ok_or_else(|| TrajError::InvalidRecords("trajectory has no states".into()))?;

        if first.time_s.abs() > START_TIME_TOL_S {
            return Err(TrajError::InvalidRecords(format!(
                "first state must be at time 0, found {} s",
                first.time_s
            )));
        }

        if let Some(i) = states.iter().position(|s| !s.is_finite()) {
            return Err(TrajError::InvalidRecords(format!(
                "state {} contains a non-finite value",
                i
            )));
        }

        if let Some(i) = states.windows(2).position(|w| w[1].time_s <= w[0].time_s) {
            return Err(TrajError::InvalidRecords(format!(
                "state times are not strictly increasing at state {}",
                i + 1
            )));
        }

        Ok(Self { states })
    }

    pub fn states(&self) -> &[TrajectoryState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Time of the last state.
    ///
    /// Units: seconds
    pub fn total_time_s(&self) -> f64 {
        self.last_state().time_s
    }

    pub fn initial_pose(&self) -> Pose2d {
        self.states[0].pose
    }

    pub fn last_state(&self) -> &TrajectoryState {
        // Construction guarantees at least one state
        &self.states[self.states.len() - 1]
    }

    /// Get the reference state at the given time.
    ///
    /// Times before the start return the first state and times after the end return the last
    /// state, so a caller which overruns the trajectory holds the final reference. Between
    /// states the pose, velocity and curvature are linearly interpolated, the acceleration is
    /// that of the earlier state.
    pub fn sample(&self, time_s: f64) -> TrajectoryState {
        let first = &self.states[0];
        let last = self.last_state();

        if !(time_s > first.time_s) {
            return *first;
        }
        if time_s >= last.time_s {
            return *last;
        }

        // Index of the first state after the time, which can't be the first state as the time
        // is past that
        let idx = self.states.partition_point(|s| s.time_s <= time_s);
        let prev = &self.states[idx - 1];
        let next = &self.states[idx];

        let frac = (time_s - prev.time_s) / (next.time_s - prev.time_s);

        TrajectoryState {
            time_s,
            pose: prev.pose.interpolate(&next.pose, frac),
            velocity_ms: lerp(prev.velocity_ms, next.velocity_ms, frac),
            accel_mss: prev.accel_mss,
            curvature_radpm: lerp(prev.curvature_radpm, next.curvature_radpm, frac),
        }
    }

    /// Move the trajectory so that it starts at `new_start`, keeping its shape relative to the
    /// start pose.
    pub fn relative_to_start(&self, new_start: &Pose2d) -> Trajectory {
        let old_start = self.initial_pose();

        let states = self
            .states
            .iter()
            .map(|s| TrajectoryState {
                pose: new_start.transform_by(&s.pose.relative_to(&old_start)),
                ..*s
            })
            .collect();

        Trajectory { states }
    }

    /// Append `other` to the end of this trajectory.
    ///
    /// The first state of `other` is dropped, as it is expected to coincide with the last
    /// state of this trajectory.
    pub fn concatenate(&self, other: &Trajectory) -> Trajectory {
        let offset_s = self.total_time_s();

        let mut states = self.states.clone();
        states.extend(other.states.iter().skip(1).map(|s| TrajectoryState {
            time_s: s.time_s + offset_s,
            ..*s
        }));

        Trajectory { states }
    }
}

fn lerp(a: f64, b: f64, frac: f64) -> f64 {
    a + (b - a) * frac
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn state(time_s: f64, x_m: f64, velocity_ms: f64) -> TrajectoryState {
        TrajectoryState {
            time_s,
            pose: Pose2d::new(x_m, 0.0, 0.0),
            velocity_ms,
            accel_mss: 1.0,
            curvature_radpm: 0.0,
        }
    }

    fn straight() -> Trajectory {
        Trajectory::from_states(vec![
            state(0.0, 0.0, 0.0),
            state(1.0, 0.5, 1.0),
            state(2.0, 1.5, 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_sample_clamps() {
        let traj = straight();

        assert_eq!(traj.sample(-1.0), traj.states()[0]);
        assert_eq!(traj.sample(std::f64::NEG_INFINITY), traj.states()[0]);
        assert_eq!(traj.sample(2.5), traj.states()[2]);
        assert_eq!(traj.sample(traj.total_time_s()), traj.states()[2]);
    }

    #[test]
    fn test_sample_interpolates() {
        let traj = straight();

        let s = traj.sample(0.5);
        assert_abs_diff_eq!(s.time_s, 0.5);
        assert_abs_diff_eq!(s.pose.x_m, 0.25);
        assert_abs_diff_eq!(s.velocity_ms, 0.5);

        let s = traj.sample(1.75);
        assert_abs_diff_eq!(s.pose.x_m, 1.25);
        assert_abs_diff_eq!(s.velocity_ms, 1.0);
    }

    #[test]
    fn test_invalid_states() {
        assert!(matches!(
            Trajectory::from_states(vec![]),
            Err(TrajError::InvalidRecords(_))
        ));
        assert!(matches!(
            Trajectory::from_states(vec![state(0.1, 0.0, 0.0)]),
            Err(TrajError::InvalidRecords(_))
        ));
        assert!(matches!(
            Trajectory::from_states(vec![state(0.0, 0.0, 0.0), state(0.0, 0.1, 0.1)]),
            Err(TrajError::InvalidRecords(_))
        ));
        assert!(matches!(
            Trajectory::from_states(vec![state(0.0, std::f64::NAN, 0.0)]),
            Err(TrajError::InvalidRecords(_))
        ));
    }

    #[test]
    fn test_relative_to_start() {
        let moved = straight().relative_to_start(&Pose2d::new(1.0, 1.0, FRAC_PI_2));
        let last = moved.last_state();

        assert_abs_diff_eq!(last.pose.x_m, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(last.pose.y_m, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(last.pose.heading_rad, FRAC_PI_2, epsilon = 1e-12);
        assert_eq!(last.time_s, 2.0);
    }

    #[test]
    fn test_concatenate() {
        let first = straight();
        let second = straight().relative_to_start(&first.last_state().pose);

        let joined = first.concatenate(&second);
        assert_eq!(joined.len(), 5);
        assert_abs_diff_eq!(joined.total_time_s(), 4.0);
        assert_abs_diff_eq!(joined.last_state().pose.x_m, 3.0, epsilon = 1e-12);
        assert!(Trajectory::from_states(joined.states().to_vec()).is_ok());
    }
}
