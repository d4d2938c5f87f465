//! RAMSETE tracking controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;

use drive_if::eqpt::WheelSpeeds;
use util::maths::sinc;

use crate::kinematics::{ChassisSpeeds, DiffDriveKinematics};
use crate::loc::Pose2d;
use crate::traj::TrajectoryState;

use super::{Params, TrajCtrlError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The RAMSETE controller.
#[derive(Debug, Clone)]
pub struct Ramsete {
    params: Params,

    kinematics: DiffDriveKinematics,

    /// Pose error of the last calculation, in the vehicle frame
    last_error: Option<Pose2d>,
}

/// Output of one controller calculation.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct RamseteOutput {
    /// Error along the vehicle's forward axis
    ///
    /// Units: meters
    pub e_x_m: f64,

    /// Error to the left of the vehicle
    ///
    /// Units: meters
    pub e_y_m: f64,

    /// Heading error, reference minus current
    ///
    /// Units: radians
    pub e_theta_rad: f64,

    /// Gain applied to the errors
    pub k: f64,

    /// Commanded chassis speeds
    pub cmd: ChassisSpeeds,

    /// Wheel speeds which achieve the commanded chassis speeds
    pub wheel_targets: WheelSpeeds,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Ramsete {
    pub fn new(params: &Params, kinematics: DiffDriveKinematics) -> Result<Self, TrajCtrlError> {
        params.validate()?;

        Ok(Self {
            params: params.clone(),
            kinematics,
            last_error: None,
        })
    }

    /// Calculate the wheel speed targets which bring the vehicle from `current` towards the
    /// reference state.
    pub fn calculate(&mut self, current: &Pose2d, reference: &TrajectoryState) -> RamseteOutput {
        let error = reference.pose.relative_to(current);
        self.last_error = Some(error);

        let v_ref_ms = reference.velocity_ms;
        let w_ref_rads = reference.angular_velocity_rads();

        let b = self.params.b;
        let k = 2.0 * self.params.zeta * (w_ref_rads.powi(2) + b * v_ref_ms.powi(2)).sqrt();

        let e_x_m = error.x_m;
        let e_y_m = error.y_m;
        let e_theta_rad = error.heading_rad;

        let cmd = if self.params.enabled {
            ChassisSpeeds::new(
                v_ref_ms * e_theta_rad.cos() + k * e_x_m,
                w_ref_rads + k * e_theta_rad + b * v_ref_ms * sinc(e_theta_rad) * e_y_m,
            )
        }
        else {
            ChassisSpeeds::new(v_ref_ms, w_ref_rads)
        };

        trace!(
            "RAMSETE: e = ({:.4}, {:.4}, {:.4}), k = {:.4}, cmd = {:?}",
            e_x_m, e_y_m, e_theta_rad, k, cmd
        );

        RamseteOutput {
            e_x_m,
            e_y_m,
            e_theta_rad,
            k,
            cmd,
            wheel_targets: self.kinematics.to_wheel_speeds(&cmd),
        }
    }

    /// Returns true if the pose error of the last calculation is within the tolerances.
    ///
    /// With the controller disabled, or before any calculation, this is always true.
    pub fn at_reference(&self) -> bool {
        if !self.params.enabled {
            return true;
        }

        match self.last_error {
            Some(e) => {
                e.x_m.abs() < self.params.pos_tolerance_m
                    && e.y_m.abs() < self.params.pos_tolerance_m
                    && e.heading_rad.abs() < self.params.heading_tolerance_rad
            }
            None => true,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.params.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.params.enabled
    }

    /// Forget the error of the last calculation, used when a new run starts.
    pub fn reset(&mut self) {
        self.last_error = None;
    }
}
