//! Wheel servo parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use serde::Deserialize;

use super::{SimpleFeedforward, WheelServoError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the wheel servos.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Magnitude of the largest voltage demand the servos will produce.
    ///
    /// Units: volts
    pub max_voltage_v: f64,

    /// Name of the entry in `profiles` to use.
    pub active_profile: String,

    /// Named sets of characterisation constants.
    ///
    /// More than one set exists because the drive has been characterised more than once, the
    /// active one is chosen with `active_profile`.
    pub profiles: HashMap<String, ServoProfile>,
}

/// One set of wheel characterisation constants.
#[derive(Debug, Copy, Clone, Deserialize)]
pub struct ServoProfile {
    /// Static friction voltage
    ///
    /// Units: volts
    pub ks_v: f64,

    /// Velocity gain
    ///
    /// Units: volts/(meter/second)
    pub kv_vspm: f64,

    /// Acceleration gain
    ///
    /// Units: volts/(meter/second^2)
    pub ka_vs2pm: f64,

    /// Proportional gain on wheel speed error
    ///
    /// Units: volts/(meter/second)
    pub kp_vspm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Get the active profile.
    pub fn profile(&self) -> Result<&ServoProfile, WheelServoError> {
        let profile = self
            .profiles
            .get(&self.active_profile)
            .ok_or_else(|| WheelServoError::UnknownProfile(self.active_profile.clone()))?;

        profile.validate()?;

        Ok(profile)
    }

    /// Get the feedforward model of the active profile.
    pub fn feedforward(&self) -> Result<SimpleFeedforward, WheelServoError> {
        self.profile().map(|p| p.feedforward())
    }
}

impl ServoProfile {
    pub fn feedforward(&self) -> SimpleFeedforward {
        SimpleFeedforward {
            ks_v: self.ks_v,
            kv_vspm: self.kv_vspm,
            ka_vs2pm: self.ka_vs2pm,
        }
    }

    fn validate(&self) -> Result<(), WheelServoError> {
        let all_finite = [self.ks_v, self.kv_vspm, self.ka_vs2pm, self.kp_vspm]
            .iter()
            .all(|k| k.is_finite());

        if !all_finite 
            || self.ks_v < 0.0 
            || self.kv_vspm <= 0.0 
            || self.ka_vs2pm < 0.0 
            || self.kp_vspm < 0.0 
        {
            return Err(WheelServoError::InvalidProfile(*self));
        }

        Ok(())
    }
}
