//! # Trajectory module
//!
//! A trajectory is a time-indexed sequence of reference states (pose, velocity, acceleration and
//! curvature) which the vehicle should follow. Trajectories are either generated in-process from
//! a set of waypoints by the [`TrajGenerator`], or loaded from a precomputed record file (see
//! [`Trajectory::load_csv`] and [`Trajectory::from_pathweaver_json`]).
//!
//! Generation happens in four steps:
//!
//! 1. A clamped cubic spline is fitted through the start pose, the interior waypoints and the
//!    end pose, with the tangent at each end following the pose heading.
//! 2. The spline is subdivided into a dense list of points, each carrying its pose and
//!    curvature.
//! 3. A velocity profile is assigned to the points by a forward and a backward pass, respecting
//!    the velocity and acceleration limits of each [`TrajConstraint`].
//! 4. The profile is integrated into time and resampled at a fixed time step.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod constraints;
mod generator;
mod parameterizer;
pub mod params;
mod record;
mod spline;
mod trajectory;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use constraints::{DiffDriveKinematicsConstraint, DiffDriveVoltageConstraint, TrajConstraint};
pub use generator::TrajGenerator;
pub use params::Params;
pub use record::TrajRecord;
pub use spline::PoseWithCurvature;
pub use trajectory::{Trajectory, TrajectoryState};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while generating or loading a trajectory.
#[derive(Debug, thiserror::Error)]
pub enum TrajError {
    #[error("Invalid trajectory constraints: {0}")]
    InvalidConstraints(String),

    #[error("No feasible trajectory exists: {0}")]
    InfeasiblePath(String),

    #[error("Trajectory records are invalid: {0}")]
    InvalidRecords(String),

    #[error("Could not read or write the trajectory file: {0}")]
    IoError(std::io::Error),

    #[error("Could not parse the trajectory CSV: {0}")]
    CsvError(csv::Error),

    #[error("Could not parse the trajectory JSON: {0}")]
    JsonError(serde_json::Error),
}
