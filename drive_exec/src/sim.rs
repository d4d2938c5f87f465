//! # Simulated drive equipment
//!
//! [`SimDrive`] stands in for the motors, encoders and heading sensor of the vehicle. Each side
//! is modelled as a first order system which inverts the characterised feedforward model:
//!
//! ```text
//! a = (V - ks * sign(v) - kv * v) / ka
//! ```
//!
//! so a servo using the same constants tracks the simulated wheels exactly. The true pose of the
//! vehicle is integrated from the wheel motion along constant curvature arcs.
//!
//! Faults can be injected to exercise the fault handling of the control loop.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use serde::Deserialize;

use drive_if::eqpt::{DriveEqpt, EqptError, WheelDisplacement, WheelSpeeds, WheelVoltages};
use util::maths::{clamp, sign};

use crate::kinematics::DiffDriveKinematics;
use crate::loc::Pose2d;
use crate::wheel_servo::SimpleFeedforward;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated equipment.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Largest voltage the simulated motors accept
    ///
    /// Units: volts
    pub max_voltage_v: f64,

    /// True pose of the vehicle at the start of the simulation
    #[serde(default)]
    pub initial_pose: Pose2d,
}

/// Simulated differential drive.
#[derive(Debug, Clone)]
pub struct SimDrive {
    plant: SimpleFeedforward,
    kinematics: DiffDriveKinematics,
    max_voltage_v: f64,

    true_pose: Pose2d,
    speeds: WheelSpeeds,
    disp: WheelDisplacement,
    voltages: WheelVoltages,

    heading_faults: u32,
    encoder_faults: u32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimDrive {
    /// Create a new simulation with the vehicle at rest at the origin.
    ///
    /// `plant` gives the constants of the simulated wheels.
    pub fn new(plant: SimpleFeedforward, kinematics: DiffDriveKinematics, max_voltage_v: f64) -> Self {
        Self {
            plant,
            kinematics,
            max_voltage_v,
            true_pose: Pose2d::default(),
            speeds: WheelSpeeds::default(),
            disp: WheelDisplacement::default(),
            voltages: WheelVoltages::zero(),
            heading_faults: 0,
            encoder_faults: 0,
        }
    }

    pub fn from_params(params: &Params, plant: SimpleFeedforward, kinematics: DiffDriveKinematics) -> Self {
        Self::new(plant, kinematics, params.max_voltage_v).with_initial_pose(params.initial_pose)
    }

    /// Place the vehicle at the given true pose.
    pub fn with_initial_pose(mut self, pose: Pose2d) -> Self {
        self.true_pose = Pose2d::new(pose.x_m, pose.y_m, pose.heading_rad);
        self
    }

    /// Advance the simulation by `dt_s` seconds with the current voltages.
    pub fn step(&mut self, dt_s: f64) {
        if !(dt_s > 0.0) {
            return;
        }

        let old = self.speeds;

        self.speeds.left_ms = self.wheel_step(old.left_ms, self.voltages.left_v, dt_s);
        self.speeds.right_ms = self.wheel_step(old.right_ms, self.voltages.right_v, dt_s);

        let dl_m = 0.5 * (old.left_ms + self.speeds.left_ms) * dt_s;
        let dr_m = 0.5 * (old.right_ms + self.speeds.right_ms) * dt_s;

        self.disp.left_m += dl_m;
        self.disp.right_m += dr_m;

        self.true_pose = self.true_pose.exp(
            0.5 * (dl_m + dr_m),
            (dr_m - dl_m) / self.kinematics.track_width_m(),
        );

        trace!("Sim step: speeds = {:?}, pose = {:?}", self.speeds, self.true_pose);
    }

    /// Speed of one wheel after `dt_s` at the given voltage.
    fn wheel_step(&self, speed_ms: f64, voltage_v: f64, dt_s: f64) -> f64 {
        let ff = &self.plant;

        // Static friction holds a stationary wheel
        if speed_ms == 0.0 && voltage_v.abs() <= ff.ks_v {
            return 0.0;
        }

        // Friction opposes the motion, or the drive if stationary
        let friction_dir = if speed_ms == 0.0 { sign(voltage_v) } else { sign(speed_ms) };
        let drive_v = voltage_v - ff.ks_v * friction_dir - ff.kv_vspm * speed_ms;

        let new_speed_ms = if ff.ka_vs2pm > 0.0 {
            speed_ms + drive_v / ff.ka_vs2pm * dt_s
        }
        else {
            // No inertia, so the wheel is always at its steady state speed
            (voltage_v - ff.ks_v * sign(voltage_v)) / ff.kv_vspm
        };

        // Friction alone can stop the wheel, not reverse it
        if speed_ms != 0.0 && sign(new_speed_ms) != sign(speed_ms) && voltage_v.abs() <= ff.ks_v {
            0.0
        }
        else {
            new_speed_ms
        }
    }

    /// Make the next `n` heading reads fail.
    pub fn inject_heading_faults(&mut self, n: u32) {
        self.heading_faults = n;
    }

    /// Make the next `n` displacement reads fail.
    pub fn inject_encoder_faults(&mut self, n: u32) {
        self.encoder_faults = n;
    }

    pub fn true_pose(&self) -> Pose2d {
        self.true_pose
    }

    pub fn speeds(&self) -> WheelSpeeds {
        self.speeds
    }

    /// The voltages currently applied to the motors.
    pub fn voltages(&self) -> WheelVoltages {
        self.voltages
    }
}

impl DriveEqpt for SimDrive {
    fn read_heading_rad(&mut self) -> Result<f64, EqptError> {
        if self.heading_faults > 0 {
            self.heading_faults -= 1;
            return Err(EqptError::HeadingUnavailable);
        }

        Ok(self.true_pose.heading_rad)
    }

    fn read_displacement(&mut self) -> Result<WheelDisplacement, EqptError> {
        if self.encoder_faults > 0 {
            self.encoder_faults -= 1;
            return Err(EqptError::EncodersUnavailable);
        }

        Ok(self.disp)
    }

    fn read_speeds(&mut self) -> Result<WheelSpeeds, EqptError> {
        Ok(self.speeds)
    }

    fn set_voltages(&mut self, dems: &WheelVoltages) {
        let max = self.max_voltage_v;

        self.voltages = WheelVoltages {
            left_v: clamp(&dems.left_v, &-max, &max),
            right_v: clamp(&dems.right_v, &-max, &max),
        };
    }
}
