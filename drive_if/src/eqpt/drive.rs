//! # Drive Equipment Interface
//!
//! The drive software talks to its equipment through the [`DriveEqpt`] trait. Implementations
//! wrap the real motor controllers and inertial sensor, or a simulation of them. Every value
//! crossing this interface is a plain SI quantity:
//!
//! - headings in radians, anticlockwise positive
//! - wheel displacements in meters, cumulative since the last hardware reset
//! - wheel speeds in meters/second
//! - wheel voltages in volts
//!
//! Drivers running on a separate interrupt context must present tear-free snapshots through
//! these calls.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Cumulative distance travelled by each side of the vehicle.
///
/// Units: meters
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct WheelDisplacement {
    pub left_m: f64,
    pub right_m: f64,
}

/// Linear speed of each side of the vehicle.
///
/// Units: meters/second
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct WheelSpeeds {
    pub left_ms: f64,
    pub right_ms: f64,
}

/// Voltage demands sent to the motors on each side of the vehicle.
///
/// Units: volts
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct WheelVoltages {
    pub left_v: f64,
    pub right_v: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Faults reported by the equipment.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EqptError {
    #[error("The heading source is unavailable")]
    HeadingUnavailable,

    #[error("The wheel encoders are unavailable")]
    EncodersUnavailable,

    #[error("The equipment reported an invalid (non-finite) reading")]
    InvalidReading,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The equipment of a differential drive vehicle.
pub trait DriveEqpt {
    /// Read the absolute heading of the vehicle.
    fn read_heading_rad(&mut self) -> Result<f64, EqptError>;

    /// Read the cumulative displacement of both sides of the vehicle.
    fn read_displacement(&mut self) -> Result<WheelDisplacement, EqptError>;

    /// Read the current speed of both sides of the vehicle.
    fn read_speeds(&mut self) -> Result<WheelSpeeds, EqptError>;

    /// Set the voltage demands of both sides of the vehicle.
    ///
    /// The driver clamps the demands to the range its motors support.
    fn set_voltages(&mut self, dems: &WheelVoltages);
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WheelVoltages {
    /// Demands which stop the motors.
    pub fn zero() -> Self {
        Self::default()
    }

    /// True if both demands are zero.
    pub fn is_zero(&self) -> bool {
        self.left_v == 0.0 && self.right_v == 0.0
    }
}

impl WheelDisplacement {
    /// Returns true if both readings are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.left_m.is_finite() && self.right_m.is_finite()
    }
}

impl WheelSpeeds {
    /// Returns true if both readings are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.left_ms.is_finite() && self.right_ms.is_finite()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_voltages_serde() {
        let dems = WheelVoltages { left_v: 1.25, right_v: -3.5 };
        let json = serde_json::to_string(&dems).unwrap();
        assert_eq!(json, r#"{"left_v":1.25,"right_v":-3.5}"#);

        assert!(WheelVoltages::zero().is_zero());
        assert!(!dems.is_zero());
    }

    #[test]
    fn test_finite_checks() {
        assert!(WheelSpeeds { left_ms: 0.1, right_ms: 0.2 }.is_finite());
        assert!(!WheelDisplacement { left_m: std::f64::NAN, right_m: 0.0 }.is_finite());
    }
}
