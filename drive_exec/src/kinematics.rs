//! # Differential drive kinematics
//!
//! Converts between chassis speeds (linear and angular velocity of the vehicle body) and the
//! linear speeds of the left and right wheels. Positive angular velocity is anticlockwise, so
//! the right wheel runs faster than the left while turning left.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use drive_if::eqpt::WheelSpeeds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic model of a differential drive vehicle.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct DiffDriveKinematics {
    /// Distance between the left and right wheel contact points.
    ///
    /// Units: meters
    track_width_m: f64,
}

/// Speeds of the vehicle body.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChassisSpeeds {
    /// Units: meters/second
    pub linear_ms: f64,

    /// Units: radians/second
    pub angular_rads: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum KinematicsError {
    #[error("Track width must be positive and finite, found {0}")]
    InvalidTrackWidth(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DiffDriveKinematics {
    pub fn new(track_width_m: f64) -> Result<Self, KinematicsError> {
        if !track_width_m.is_finite() || track_width_m <= 0.0 {
            return Err(KinematicsError::InvalidTrackWidth(track_width_m));
        }

        Ok(Self { track_width_m })
    }

    pub fn track_width_m(&self) -> f64 {
        self.track_width_m
    }

    /// Get the wheel speeds required to achieve the given chassis speeds.
    pub fn to_wheel_speeds(&self, speeds: &ChassisSpeeds) -> WheelSpeeds {
        let half_track_m = self.track_width_m / 2.0;

        WheelSpeeds {
            left_ms: speeds.linear_ms - speeds.angular_rads * half_track_m,
            right_ms: speeds.linear_ms + speeds.angular_rads * half_track_m,
        }
    }

    /// Get the chassis speeds produced by the given wheel speeds.
    pub fn to_chassis_speeds(&self, speeds: &WheelSpeeds) -> ChassisSpeeds {
        ChassisSpeeds {
            linear_ms: (speeds.left_ms + speeds.right_ms) / 2.0,
            angular_rads: (speeds.right_ms - speeds.left_ms) / self.track_width_m,
        }
    }
}

impl ChassisSpeeds {
    pub fn new(linear_ms: f64, angular_rads: f64) -> Self {
        Self {
            linear_ms,
            angular_rads,
        }
    }
}
