//! # Trajectory control module
//!
//! Trajectory control keeps the vehicle on the reference trajectory. It does this with the
//! RAMSETE control law, a nonlinear feedback law which drives the pose error to zero about a
//! time-parameterised reference.
//!
//! Each cycle the error between the reference pose and the current pose is expressed in the
//! vehicle's own frame as `(e_x, e_y, e_theta)`, where `e_x` is the error along the vehicle's
//! forward axis, `e_y` to the left of it and `e_theta` the heading error. The commanded speeds
//! are then
//!
//! ```text
//! k     = 2 * zeta * sqrt(w_ref^2 + b * v_ref^2)
//! v_cmd = v_ref * cos(e_theta) + k * e_x
//! w_cmd = w_ref + k * e_theta + b * v_ref * sinc(e_theta) * e_y
//! ```
//!
//! where `v_ref` and `w_ref` are the reference linear and angular velocities. The gain `k`
//! grows with the reference speed, so the controller corrects harder when the reference is
//! moving faster. With zero error the commands are exactly the reference speeds.
//!
//! `b` (> 0) sets how aggressively errors are corrected and `zeta` (in (0, 1)) the damping of
//! the response.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
mod ramsete;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use params::Params;
pub use ramsete::{Ramsete, RamseteOutput};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur while setting up trajectory control.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("RAMSETE gain b must be positive, found {0}")]
    InvalidB(f64),

    #[error("RAMSETE gain zeta must be between 0 and 1, found {0}")]
    InvalidZeta(f64),

    #[error("Reference tolerances must be non-negative, found {0} m and {1} rad")]
    InvalidTolerance(f64, f64),
}
