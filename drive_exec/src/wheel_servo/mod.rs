//! # Wheel servo module
//!
//! Each side of the vehicle has its own [`WheelServo`], which turns a target wheel speed into a
//! voltage demand. The demand is the sum of an open loop feedforward term, from the
//! characterised motor model
//!
//! ```text
//! V = ks * sign(v) + kv * v + ka * a
//! ```
//!
//! and a proportional correction on the difference between the target and measured wheel
//! speeds. The result is saturated to the voltage range of the motors.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use util::maths::{clamp, sign};

pub use params::{Params, ServoProfile};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Permanent magnet DC motor feedforward model.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct SimpleFeedforward {
    /// Units: volts
    pub ks_v: f64,

    /// Units: volts/(meter/second)
    pub kv_vspm: f64,

    /// Units: volts/(meter/second^2)
    pub ka_vs2pm: f64,
}

/// Speed servo for one side of the vehicle.
#[derive(Debug, Clone)]
pub struct WheelServo {
    feedforward: SimpleFeedforward,

    kp_vspm: f64,

    max_voltage_v: f64,
}

/// Output of one servo calculation.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct ServoOutput {
    /// Open loop part of the demand
    pub feedforward_v: f64,

    /// Closed loop part of the demand
    pub correction_v: f64,

    /// The saturated demand to send to the motor
    pub voltage_v: f64,

    /// True if the demand was saturated
    pub saturated: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WheelServoError {
    #[error("No servo profile named \"{0}\" exists")]
    UnknownProfile(String),

    #[error("Servo profile contains invalid constants: {0:?}")]
    InvalidProfile(ServoProfile),

    #[error("The maximum voltage must be positive, found {0}")]
    InvalidMaxVoltage(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimpleFeedforward {
    /// Voltage required to hold the given velocity while accelerating at the given rate.
    pub fn calculate(&self, velocity_ms: f64, accel_mss: f64) -> f64 {
        self.ks_v * sign(velocity_ms) + self.kv_vspm * velocity_ms + self.ka_vs2pm * accel_mss
    }

    /// The largest acceleration achievable at the given velocity without exceeding
    /// `max_voltage_v`.
    pub fn max_achievable_accel(&self, max_voltage_v: f64, velocity_ms: f64) -> f64 {
        let headroom_v = max_voltage_v - self.ks_v * sign(velocity_ms) - self.kv_vspm * velocity_ms;

        // Without an acceleration term the model places no limit on acceleration
        if self.ka_vs2pm <= 0.0 {
            return if headroom_v >= 0.0 {
                std::f64::INFINITY
            }
            else {
                std::f64::NEG_INFINITY
            };
        }

        headroom_v / self.ka_vs2pm
    }

    /// The smallest (most negative) acceleration achievable at the given velocity without
    /// exceeding `max_voltage_v`.
    pub fn min_achievable_accel(&self, max_voltage_v: f64, velocity_ms: f64) -> f64 {
        self.max_achievable_accel(-max_voltage_v, velocity_ms)
    }

    /// The largest steady state velocity achievable without exceeding `max_voltage_v`.
    pub fn max_achievable_velocity(&self, max_voltage_v: f64) -> f64 {
        (max_voltage_v - self.ks_v) / self.kv_vspm
    }
}

impl WheelServo {
    /// Create a new servo from the active profile in the parameters.
    pub fn new(params: &Params) -> Result<Self, WheelServoError> {
        let profile = params.profile()?;

        if !(params.max_voltage_v > 0.0) {
            return Err(WheelServoError::InvalidMaxVoltage(params.max_voltage_v));
        }

        Ok(Self {
            feedforward: profile.feedforward(),
            kp_vspm: profile.kp_vspm,
            max_voltage_v: params.max_voltage_v,
        })
    }

    pub fn feedforward(&self) -> &SimpleFeedforward {
        &self.feedforward
    }

    /// Calculate the voltage demand for the given target and measured wheel speed.
    ///
    /// If no target acceleration is known pass zero.
    pub fn calculate(
        &self,
        target_speed_ms: f64,
        target_accel_mss: f64,
        measured_speed_ms: f64,
    ) -> ServoOutput {
        let feedforward_v = self.feedforward.calculate(target_speed_ms, target_accel_mss);
        let correction_v = self.kp_vspm * (target_speed_ms - measured_speed_ms);

        let unsat_v = feedforward_v + correction_v;
        let voltage_v = clamp(&unsat_v, &-self.max_voltage_v, &self.max_voltage_v);

        ServoOutput {
            feedforward_v,
            correction_v,
            voltage_v,
            saturated: voltage_v != unsat_v,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::collections::HashMap;

    fn params() -> Params {
        let mut profiles = HashMap::new();
        profiles.insert(
            "primary".to_string(),
            ServoProfile {
                ks_v: 0.12124,
                kv_vspm: 2.9834,
                ka_vs2pm: 0.40143,
                kp_vspm: 0.090871,
            },
        );
        profiles.insert(
            "alternate".to_string(),
            ServoProfile {
                ks_v: 0.1219,
                kv_vspm: 3.343,
                ka_vs2pm: 1.0356,
                kp_vspm: 2.2662,
            },
        );

        Params {
            max_voltage_v: 12.0,
            active_profile: "primary".to_string(),
            profiles,
        }
    }

    #[test]
    fn test_feedforward() {
        let ff = params().feedforward().unwrap();

        assert_eq!(ff.calculate(0.0, 0.0), 0.0);
        assert_abs_diff_eq!(ff.calculate(1.0, 0.0), 0.12124 + 2.9834, epsilon = 1e-12);
        assert_abs_diff_eq!(
            ff.calculate(-0.5, 2.0),
            -0.12124 - 0.5 * 2.9834 + 2.0 * 0.40143,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_achievable_accel() {
        let ff = params().feedforward().unwrap();

        let max_a = ff.max_achievable_accel(10.0, 1.0);
        assert_abs_diff_eq!(ff.calculate(1.0, max_a), 10.0, epsilon = 1e-9);

        let min_a = ff.min_achievable_accel(10.0, 1.0);
        assert_abs_diff_eq!(ff.calculate(1.0, min_a), -10.0, epsilon = 1e-9);
        assert!(min_a < 0.0 && max_a > 0.0);
    }

    #[test]
    fn test_servo_correction_and_saturation() {
        let servo = WheelServo::new(&params()).unwrap();

        // Wheel running slow gets a positive correction
        let out = servo.calculate(1.0, 0.0, 0.8);
        assert_abs_diff_eq!(out.correction_v, 0.090871 * 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(out.voltage_v, out.feedforward_v + out.correction_v);
        assert!(!out.saturated);

        // Far beyond the motor's capability
        let out = servo.calculate(-10.0, -5.0, 0.0);
        assert_eq!(out.voltage_v, -12.0);
        assert!(out.saturated);
    }

    #[test]
    fn test_profiles() {
        let mut p = params();
        p.active_profile = "alternate".to_string();
        assert_abs_diff_eq!(p.profile().unwrap().kp_vspm, 2.2662);

        p.active_profile = "missing".to_string();
        assert!(matches!(WheelServo::new(&p), Err(WheelServoError::UnknownProfile(_))));

        p.active_profile = "primary".to_string();
        p.max_voltage_v = 0.0;
        assert!(matches!(WheelServo::new(&p), Err(WheelServoError::InvalidMaxVoltage(_))));
    }
}
