//! Odometric pose estimator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use drive_if::eqpt::WheelDisplacement;
use util::maths::{get_ang_dist, wrap_pi};

use super::Pose2d;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Estimates the pose of the vehicle by integrating heading and wheel displacement.
///
/// Each update treats the motion since the previous update as a constant curvature arc: the
/// vehicle travels the mean of the two wheel displacement increments while its heading changes
/// by the difference between the current and previous heading readings. The heading itself is
/// taken from the heading source, the wheel displacements are only used for position.
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    /// Current estimate
    pose: Pose2d,

    /// Added to the raw heading reading to get the field heading
    heading_offset_rad: f64,

    /// Field heading at the previous update
    prev_heading_rad: f64,

    /// Displacement reading at the previous update
    prev_disp: WheelDisplacement,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseEstimator {
    /// Create a new estimator at the given pose, with the given sensor readings as the baseline.
    pub fn new(pose: Pose2d, heading_rad: f64, disp: WheelDisplacement) -> Self {
        let mut est = Self {
            pose,
            heading_offset_rad: 0.0,
            prev_heading_rad: 0.0,
            prev_disp: disp,
        };
        est.reset(pose, heading_rad, disp);
        est
    }

    /// Reinitialise the estimate to `pose`, using the given sensor readings as the new baseline.
    ///
    /// The raw heading reading is not required to be zero, the offset between it and the pose's
    /// heading is remembered and applied to all future readings.
    pub fn reset(&mut self, pose: Pose2d, heading_rad: f64, disp: WheelDisplacement) {
        let pose = Pose2d::new(pose.x_m, pose.y_m, pose.heading_rad);

        self.heading_offset_rad = get_ang_dist(heading_rad, pose.heading_rad);
        self.prev_heading_rad = pose.heading_rad;
        self.prev_disp = disp;
        self.pose = pose;
    }

    /// Update the estimate with new sensor readings and return the new pose.
    pub fn update(&mut self, heading_rad: f64, disp: WheelDisplacement) -> Pose2d {
        let heading_rad = wrap_pi(heading_rad + self.heading_offset_rad);

        let delta_left_m = disp.left_m - self.prev_disp.left_m;
        let delta_right_m = disp.right_m - self.prev_disp.right_m;
        let delta_dist_m = (delta_left_m + delta_right_m) / 2.0;
        let delta_heading_rad = get_ang_dist(self.prev_heading_rad, heading_rad);

        let integrated = self.pose.exp(delta_dist_m, delta_heading_rad);

        // Trust the heading source over the integrated heading
        self.pose = Pose2d::new(integrated.x_m, integrated.y_m, heading_rad);
        self.prev_heading_rad = heading_rad;
        self.prev_disp = disp;

        trace!(
            "Pose update: ds = {:.4} m, dh = {:.4} rad -> {:?}",
            delta_dist_m, delta_heading_rad, self.pose
        );

        self.pose
    }

    pub fn pose(&self) -> Pose2d {
        self.pose
    }
}
