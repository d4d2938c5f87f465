//! # Drive library.
//!
//! This library allows other crates in the workspace (and the binaries of this crate) to access
//! the motion control core of the vehicle.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Kinematics - converts between chassis speeds and wheel speeds
pub mod kinematics;

/// Localisation module - dead-reckoning pose estimation from heading and wheel displacement
pub mod loc;

/// Trajectory module - generates, stores and samples time-parameterised reference trajectories
pub mod traj;

/// Trajectory control module - keeps the vehicle on the reference trajectory
pub mod traj_ctrl;

/// Wheel servo - converts wheel speed targets into wheel voltage demands
pub mod wheel_servo;

/// Drive control module - runs the control loop once per cycle
pub mod drive_ctrl;

/// Simulated drive equipment
pub mod sim;

/// Parameters of the drive executables
pub mod params;
