//! Drive control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::{traj_ctrl, wheel_servo};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Distance between the left and right wheel contact points
    ///
    /// Units: meters
    pub track_width_m: f64,

    /// Number of consecutive ticks with a sensor fault which are tolerated before an active
    /// run is aborted.
    #[serde(default = "default_max_consec_sensor_faults")]
    pub max_consec_sensor_faults: u32,

    /// Trajectory control parameters
    pub traj_ctrl: traj_ctrl::Params,

    /// Wheel servo parameters, shared by both sides
    pub wheel_servo: wheel_servo::Params,
}

fn default_max_consec_sensor_faults() -> u32 {
    1
}
