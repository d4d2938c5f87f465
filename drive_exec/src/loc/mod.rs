//! # Localisation module
//!
//! This module provides localisation for the vehicle in the form of wheel odometry: the heading
//! from the inertial sensor is combined with the displacement of each side of the vehicle to
//! dead-reckon a planar pose. There is no correction from absolute references, so error in the
//! estimate grows with distance travelled.
//!
//! All headings produced by this module are wrapped into (-pi, pi].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod estimator;
mod pose;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use estimator::PoseEstimator;
pub use pose::Pose2d;
