//! # Drive Executable Parameters
//!
//! This module provides the parameters for the drive executables, which group together the
//! parameters of each module so they can be kept in a single file.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Deserialize;

use crate::{drive_ctrl, loc::Pose2d, sim, traj};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DriveExecParams {
    /// Period of one control cycle
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// If true each cycle is paced to the cycle period, otherwise cycles run back to back.
    #[serde(default)]
    pub realtime: bool,

    /// Extra time to keep cycling after the trajectory is complete, letting the vehicle settle
    ///
    /// Units: seconds
    #[serde(default)]
    pub settle_time_s: f64,

    /// Trajectory generation parameters
    pub traj_gen: traj::Params,

    /// The path to generate a trajectory along when no trajectory file is given
    pub path: PathParams,

    /// Drive control parameters
    pub drive_ctrl: drive_ctrl::Params,

    /// Simulated equipment parameters
    pub sim: sim::Params,
}

/// Waypoints of a path.
#[derive(Debug, Clone, Deserialize)]
pub struct PathParams {
    pub start: Pose2d,

    /// Interior waypoints, as `[x_m, y_m]` pairs
    #[serde(default)]
    pub interior: Vec<[f64; 2]>,

    pub end: Pose2d,

    /// If true the pose estimate is reset to the start of the trajectory when the run starts.
    #[serde(default = "default_reset_pose")]
    pub reset_pose: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PathParams {
    pub fn interior(&self) -> Vec<Vector2<f64>> {
        self.interior
            .iter()
            .map(|p| Vector2::new(p[0], p[1]))
            .collect()
    }
}

fn default_reset_pose() -> bool {
    true
}
