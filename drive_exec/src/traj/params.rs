//! Trajectory generation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

use super::TrajError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory generation.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Maximum speed of either wheel
    ///
    /// Units: meters/second
    pub max_velocity_ms: f64,

    /// Maximum acceleration of the vehicle body
    ///
    /// Units: meters/second^2
    pub max_accel_mss: f64,

    /// Maximum voltage either wheel may need to follow the trajectory. Keep this below the
    /// servo's saturation voltage so there is headroom left for the feedback correction.
    ///
    /// Units: volts
    pub max_voltage_v: f64,

    /// Period between samples of the generated trajectory
    ///
    /// Units: seconds
    #[serde(default = "default_time_step_s")]
    pub time_step_s: f64,

    /// Velocity at the start of the trajectory
    ///
    /// Units: meters/second
    #[serde(default)]
    pub start_velocity_ms: f64,

    /// Velocity at the end of the trajectory
    ///
    /// Units: meters/second
    #[serde(default)]
    pub end_velocity_ms: f64,

    /// If true the vehicle drives the path backwards.
    #[serde(default)]
    pub reversed: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check that the parameters describe a usable set of constraints.
    pub fn validate(&self) -> Result<(), TrajError> {
        let fields = [
            ("max_velocity_ms", self.max_velocity_ms),
            ("max_accel_mss", self.max_accel_mss),
            ("max_voltage_v", self.max_voltage_v),
            ("time_step_s", self.time_step_s),
        ];

        for (name, value) in fields.iter() {
            if !value.is_finite() || *value <= 0.0 {
                return Err(TrajError::InvalidConstraints(format!(
                    "{} must be positive and finite, found {}",
                    name, value
                )));
            }
        }

        for (name, value) in [
            ("start_velocity_ms", self.start_velocity_ms),
            ("end_velocity_ms", self.end_velocity_ms),
        ]
        .iter()
        {
            if !value.is_finite() || *value < 0.0 || *value > self.max_velocity_ms {
                return Err(TrajError::InvalidConstraints(format!(
                    "{} must be between 0 and max_velocity_ms, found {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

fn default_time_step_s() -> f64 {
    0.02
}
