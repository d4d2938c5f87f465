//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

use super::TrajCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Convergence gain, larger values correct errors more aggressively
    ///
    /// Units: radians^2/meters^2
    pub b: f64,

    /// Damping ratio
    pub zeta: f64,

    /// If false the controller passes the reference speeds straight through with no
    /// correction.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Position error below which the vehicle is considered to be at the reference
    ///
    /// Units: meters
    #[serde(default = "default_pos_tolerance_m")]
    pub pos_tolerance_m: f64,

    /// Heading error below which the vehicle is considered to be at the reference
    ///
    /// Units: radians
    #[serde(default = "default_heading_tolerance_rad")]
    pub heading_tolerance_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn validate(&self) -> Result<(), TrajCtrlError> {
        if !(self.b > 0.0) || !self.b.is_finite() {
            return Err(TrajCtrlError::InvalidB(self.b));
        }

        if !(self.zeta > 0.0 && self.zeta < 1.0) {
            return Err(TrajCtrlError::InvalidZeta(self.zeta));
        }

        if !(self.pos_tolerance_m >= 0.0) || !(self.heading_tolerance_rad >= 0.0) {
            return Err(TrajCtrlError::InvalidTolerance(
                self.pos_tolerance_m,
                self.heading_tolerance_rad,
            ));
        }

        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_pos_tolerance_m() -> f64 {
    0.05
}

fn default_heading_tolerance_rad() -> f64 {
    0.05
}
