//! Constraints on the velocity and acceleration along a trajectory

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use drive_if::eqpt::WheelSpeeds;

use crate::kinematics::{ChassisSpeeds, DiffDriveKinematics};
use crate::loc::Pose2d;
use crate::wheel_servo::SimpleFeedforward;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A limit on the motion of the vehicle at a point on the path.
pub trait TrajConstraint {
    /// The maximum speed allowed at the point.
    ///
    /// Units: meters/second
    fn max_velocity_ms(&self, pose: &Pose2d, curvature_radpm: f64, velocity_ms: f64) -> f64;

    /// The minimum and maximum acceleration allowed at the point while travelling at the
    /// given signed velocity.
    ///
    /// Units: meters/second^2
    fn min_max_accel(&self, pose: &Pose2d, curvature_radpm: f64, velocity_ms: f64) -> (f64, f64);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits the speed of the outer wheel while turning.
#[derive(Debug, Clone)]
pub struct DiffDriveKinematicsConstraint {
    kinematics: DiffDriveKinematics,

    max_speed_ms: f64,
}

/// Limits the voltage either wheel needs to follow the trajectory.
#[derive(Debug, Clone)]
pub struct DiffDriveVoltageConstraint {
    feedforward: SimpleFeedforward,

    kinematics: DiffDriveKinematics,

    max_voltage_v: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DiffDriveKinematicsConstraint {
    pub fn new(kinematics: DiffDriveKinematics, max_speed_ms: f64) -> Self {
        Self {
            kinematics,
            max_speed_ms,
        }
    }
}

impl TrajConstraint for DiffDriveKinematicsConstraint {
    fn max_velocity_ms(&self, _pose: &Pose2d, curvature_radpm: f64, _velocity_ms: f64) -> f64 {
        self.max_speed_ms
            / (1.0 + curvature_radpm.abs() * self.kinematics.track_width_m() / 2.0)
    }

    fn min_max_accel(&self, _: &Pose2d, _: f64, _: f64) -> (f64, f64) {
        (std::f64::NEG_INFINITY, std::f64::INFINITY)
    }
}

impl DiffDriveVoltageConstraint {
    pub fn new(
        feedforward: SimpleFeedforward,
        kinematics: DiffDriveKinematics,
        max_voltage_v: f64,
    ) -> Self {
        Self {
            feedforward,
            kinematics,
            max_voltage_v,
        }
    }
}

impl TrajConstraint for DiffDriveVoltageConstraint {
    fn max_velocity_ms(&self, _pose: &Pose2d, curvature_radpm: f64, _velocity_ms: f64) -> f64 {
        self.feedforward.max_achievable_velocity(self.max_voltage_v)
            / (1.0 + curvature_radpm.abs() * self.kinematics.track_width_m() / 2.0)
    }

    fn min_max_accel(&self, _pose: &Pose2d, curvature_radpm: f64, velocity_ms: f64) -> (f64, f64) {
        let WheelSpeeds { left_ms, right_ms } = self.kinematics.to_wheel_speeds(&ChassisSpeeds::new(
            velocity_ms,
            velocity_ms * curvature_radpm,
        ));

        let mut max_wheel_accel = self
            .feedforward
            .max_achievable_accel(self.max_voltage_v, left_ms.max(right_ms));
        let mut min_wheel_accel = self
            .feedforward
            .min_achievable_accel(self.max_voltage_v, left_ms.min(right_ms));

        let half_track_m = self.kinematics.track_width_m() / 2.0;
        let abs_curv = curvature_radpm.abs();

        // Turning about a point between the wheels reverses the inner wheel
        if half_track_m * abs_curv > 1.0 {
            if velocity_ms > 0.0 {
                min_wheel_accel = -min_wheel_accel;
            }
            else if velocity_ms < 0.0 {
                max_wheel_accel = -max_wheel_accel;
            }
        }

        // The outer wheel accelerates faster than the chassis, the inner wheel slower
        if velocity_ms == 0.0 {
            let scale = 1.0 + half_track_m * abs_curv;
            (min_wheel_accel / scale, max_wheel_accel / scale)
        }
        else {
            let dir = velocity_ms.signum();
            (
                min_wheel_accel / (1.0 - half_track_m * abs_curv * dir),
                max_wheel_accel / (1.0 + half_track_m * abs_curv * dir),
            )
        }
    }
}
