//! Trajectory generator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector2;

use crate::kinematics::DiffDriveKinematics;
use crate::loc::Pose2d;
use crate::wheel_servo::SimpleFeedforward;

use super::{
    parameterizer::{self, Limits},
    spline,
    DiffDriveKinematicsConstraint,
    DiffDriveVoltageConstraint,
    Params,
    TrajConstraint,
    TrajError,
    Trajectory,
    TrajectoryState,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Generates trajectories between waypoints under a fixed set of constraints.
#[derive(Debug, Clone)]
pub struct TrajGenerator {
    params: Params,

    kinematics_constraint: DiffDriveKinematicsConstraint,

    voltage_constraint: DiffDriveVoltageConstraint,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajGenerator {
    /// Create a new generator.
    ///
    /// The feedforward model and kinematics are used to build the voltage and kinematics
    /// constraints which every generated trajectory respects.
    pub fn new(
        params: Params,
        feedforward: SimpleFeedforward,
        kinematics: DiffDriveKinematics,
    ) -> Result<Self, TrajError> {
        params.validate()?;

        if params.max_voltage_v <= feedforward.ks_v {
            return Err(TrajError::InfeasiblePath(format!(
                "max voltage ({} V) does not overcome static friction ({} V)",
                params.max_voltage_v, feedforward.ks_v
            )));
        }

        Ok(Self {
            kinematics_constraint: DiffDriveKinematicsConstraint::new(
                kinematics,
                params.max_velocity_ms,
            ),
            voltage_constraint: DiffDriveVoltageConstraint::new(
                feedforward,
                kinematics,
                params.max_voltage_v,
            ),
            params,
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Generate a trajectory from `start` through each of the `interior` waypoints in order,
    /// finishing at `end`.
    ///
    /// The returned trajectory is sampled every `time_step_s`, with a final sample exactly at
    /// the end of the trajectory.
    pub fn generate(
        &self,
        start: &Pose2d,
        interior: &[Vector2<f64>],
        end: &Pose2d,
    ) -> Result<Trajectory, TrajError> {
        let dense = self.generate_dense(start, interior, end)?;
        let traj = self.resample(&dense)?;

        debug!(
            "Generated trajectory of {} states ({} path points) lasting {:.3} s",
            traj.len(),
            dense.len(),
            traj.total_time_s()
        );

        Ok(traj)
    }

    /// Generate the trajectory with one state per path point, before resampling.
    ///
    /// The constraints hold exactly at each of these states.
    pub(super) fn generate_dense(
        &self,
        start: &Pose2d,
        interior: &[Vector2<f64>],
        end: &Pose2d,
    ) -> Result<Trajectory, TrajError> {
        let points = spline::path_points(start, interior, end, self.params.reversed)?;

        let constraints: [&dyn TrajConstraint; 2] =
            [&self.kinematics_constraint, &self.voltage_constraint];

        let limits = Limits {
            start_vel_ms: self.params.start_velocity_ms,
            end_vel_ms: self.params.end_velocity_ms,
            max_vel_ms: self.params.max_velocity_ms,
            max_accel_mss: self.params.max_accel_mss,
            reversed: self.params.reversed,
        };

        let dense = parameterizer::parameterize(&points, &constraints, &limits)?;
        let dense = Trajectory::from_states(dense)
            .map_err(|e| TrajError::InfeasiblePath(format!("profile is invalid: {}", e)))?;

        if dense.total_time_s() <= 0.0 {
            return Err(TrajError::InfeasiblePath("trajectory has zero duration".into()));
        }

        Ok(dense)
    }

    /// Sample the dense trajectory at the fixed time step.
    fn resample(&self, dense: &Trajectory) -> Result<Trajectory, TrajError> {
        let total_s = dense.total_time_s();
        let step_s = self.params.time_step_s;

        // Drop a sample which would land almost on top of the final one
        let end_margin_s = step_s * 1e-3;

        let mut states: Vec<TrajectoryState> = Vec::new();
        let mut i = 0u64;
        loop {
            let time_s = i as f64 * step_s;
            if time_s >= total_s - end_margin_s {
                break;
            }
            states.push(dense.sample(time_s));
            i += 1;
        }
        states.push(*dense.last_state());

        Trajectory::from_states(states)
            .map_err(|e| TrajError::InfeasiblePath(format!("resampling failed: {}", e)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn feedforward() -> SimpleFeedforward {
        SimpleFeedforward {
            ks_v: 0.12124,
            kv_vspm: 2.9834,
            ka_vs2pm: 0.40143,
        }
    }

    fn params() -> Params {
        Params {
            max_velocity_ms: 1.0,
            max_accel_mss: 2.0,
            max_voltage_v: 10.0,
            time_step_s: 0.02,
            start_velocity_ms: 0.0,
            end_velocity_ms: 0.0,
            reversed: false,
        }
    }

    fn generator(params: Params) -> Result<TrajGenerator, TrajError> {
        TrajGenerator::new(
            params,
            feedforward(),
            DiffDriveKinematics::new(0.46355).unwrap(),
        )
    }

    #[test]
    fn test_s_curve() {
        let gen = generator(params()).unwrap();
        let start = Pose2d::new(0.0, 0.0, 0.0);
        let end = Pose2d::new(3.0, 0.0, 0.0);

        let traj = gen
            .generate(&start, &[Vector2::new(1.0, 1.0), Vector2::new(2.0, -1.0)], &end)
            .unwrap();

        assert!(traj.total_time_s() > 0.0);
        assert!(traj.states()[0].pose.approx_eq(&start, 1e-9, 1e-9));
        assert!(traj.last_state().pose.approx_eq(&end, 1e-6, 1e-6));

        for w in traj.states().windows(2) {
            assert!(w[1].time_s > w[0].time_s);
            assert!(w[1].time_s - w[0].time_s <= 0.02 + 1e-9);
        }

        for s in traj.states() {
            assert!(s.velocity_ms >= 0.0);
            assert!(s.velocity_ms <= 1.0 + 1e-9);
            assert!(s.accel_mss.abs() <= 2.0 + 1e-6);
        }

        assert_abs_diff_eq!(traj.states()[0].velocity_ms, 0.0);
        assert_abs_diff_eq!(traj.last_state().velocity_ms, 0.0, epsilon = 1e-9);
    }

    fn max_wheel_speed(traj: &Trajectory) -> f64 {
        let kinematics = DiffDriveKinematics::new(0.46355).unwrap();
        traj.states()
            .iter()
            .map(|s| {
                let wheels = kinematics.to_wheel_speeds(&crate::kinematics::ChassisSpeeds::new(
                    s.velocity_ms,
                    s.angular_velocity_rads(),
                ));
                wheels.left_ms.abs().max(wheels.right_ms.abs())
            })
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_s_curve_wheel_speeds() {
        let gen = generator(params()).unwrap();
        let start = Pose2d::new(0.0, 0.0, 0.0);
        let end = Pose2d::new(3.0, 0.0, 0.0);
        let interior = [Vector2::new(1.0, 1.0), Vector2::new(2.0, -1.0)];

        // The constraint holds exactly at every path point
        let dense = gen.generate_dense(&start, &interior, &end).unwrap();
        assert!(max_wheel_speed(&dense) <= 1.0 + 1e-9);

        // Interpolating velocity and curvature separately between path points lets the outer
        // wheel slightly exceed the limit in tight turns
        let traj = gen.generate(&start, &interior, &end).unwrap();
        assert!(max_wheel_speed(&traj) <= 1.0 + 1e-2);
    }

    #[test]
    fn test_reversed() {
        let mut p = params();
        p.reversed = true;
        let gen = generator(p).unwrap();

        let start = Pose2d::new(0.0, 0.0, 0.0);
        let end = Pose2d::new(-2.0, 0.0, 0.0);
        let traj = gen.generate(&start, &[], &end).unwrap();

        assert!(traj.states().iter().all(|s| s.velocity_ms <= 0.0));
        assert!(traj.last_state().pose.approx_eq(&end, 1e-6, 1e-6));
        assert!(traj.sample(traj.total_time_s() / 2.0).pose.x_m < 0.0);
    }

    #[test]
    fn test_invalid_constraints() {
        let mut p = params();
        p.max_velocity_ms = 0.0;
        assert!(matches!(generator(p), Err(TrajError::InvalidConstraints(_))));

        let mut p = params();
        p.max_accel_mss = -1.0;
        assert!(matches!(generator(p), Err(TrajError::InvalidConstraints(_))));

        let mut p = params();
        p.max_voltage_v = 0.1;
        assert!(matches!(generator(p), Err(TrajError::InfeasiblePath(_))));
    }

    #[test]
    fn test_coincident_start_end() {
        let gen = generator(params()).unwrap();
        let pose = Pose2d::new(1.0, 1.0, 0.0);

        assert!(matches!(
            gen.generate(&pose, &[], &pose),
            Err(TrajError::InfeasiblePath(_))
        ));
    }
}
