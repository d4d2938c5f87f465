//! Drive control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, info, trace, warn};
use serde::Serialize;

// Internal
use drive_if::eqpt::{DriveEqpt, EqptError, WheelDisplacement, WheelSpeeds, WheelVoltages};

use super::Params;
use crate::{
    kinematics::{DiffDriveKinematics, KinematicsError},
    loc::{Pose2d, PoseEstimator},
    traj::{Trajectory, TrajectoryState},
    traj_ctrl::{Ramsete, RamseteOutput, TrajCtrlError},
    wheel_servo::{WheelServo, WheelServoError},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The drive control loop.
///
/// The equipment is owned by the loop for its whole lifetime, use [`DriveCtrl::eqpt`] and
/// [`DriveCtrl::eqpt_mut`] to reach it from outside.
pub struct DriveCtrl<E: DriveEqpt> {
    eqpt: E,

    /// Executing state
    state: DriveCtrlState,

    estimator: PoseEstimator,

    ramsete: Ramsete,

    left_servo: WheelServo,
    right_servo: WheelServo,

    /// The current or most recent run
    run: Option<Run>,

    /// Set by `abort_run`, acted on at the start of the next tick
    abort_requested: bool,

    /// Last voltages sent to the equipment
    last_voltages: WheelVoltages,

    /// Number of consecutive ticks in which a sensor read failed
    consec_sensor_faults: u32,

    max_consec_sensor_faults: u32,

    last_fault: Option<EqptError>,
}

/// A single trajectory run.
struct Run {
    trajectory: Trajectory,

    /// If true the pose estimate is reset to the start of the trajectory when the run starts
    reset_pose: bool,

    /// Time along the trajectory
    elapsed_s: f64,

    /// Time along the trajectory and wheel speed targets of the last tracking step, used to
    /// find the target accelerations
    prev_targets: Option<(f64, WheelSpeeds)>,
}

/// Sensor readings for one tick.
#[derive(Debug, Copy, Clone)]
struct Readings {
    heading_rad: f64,
    disp: WheelDisplacement,
    speeds: WheelSpeeds,
}

/// Record of a single tick, suitable for archiving.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct TickReport {
    /// State at the end of the tick
    pub state: DriveCtrlState,

    /// Time along the trajectory
    pub elapsed_s: f64,

    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,

    pub ref_x_m: f64,
    pub ref_y_m: f64,
    pub ref_heading_rad: f64,
    pub ref_velocity_ms: f64,

    pub e_x_m: f64,
    pub e_y_m: f64,
    pub e_theta_rad: f64,

    pub target_left_ms: f64,
    pub target_right_ms: f64,

    pub target_left_mss: f64,
    pub target_right_mss: f64,

    pub meas_left_ms: f64,
    pub meas_right_ms: f64,

    pub left_v: f64,
    pub right_v: f64,

    /// True if either servo saturated
    pub saturated: bool,

    /// True if a sensor read failed during the tick
    pub sensor_fault: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur in drive control. None of these can occur during a tick.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Invalid kinematics: {0}")]
    KinematicsError(KinematicsError),

    #[error("Could not initialise trajectory control: {0}")]
    TrajCtrlError(TrajCtrlError),

    #[error("Could not initialise the wheel servos: {0}")]
    WheelServoError(WheelServoError),

    #[error("Could not read the initial sensor values: {0}")]
    InitialReadFailed(EqptError),

    /// A run is already loaded. This error occurs when attempting to start a new run before
    /// the current one has finished or been aborted.
    #[error("Attempted to start a run while one is already active")]
    RunAlreadyActive,
}

/// The possible states of the control loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum DriveCtrlState {
    Idle,
    Initializing,
    Tracking,
    Holding,
    Aborted,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriveCtrlState {
    fn default() -> Self {
        DriveCtrlState::Idle
    }
}

impl DriveCtrlState {
    /// Returns true if a run is in progress in this state.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            DriveCtrlState::Initializing | DriveCtrlState::Tracking | DriveCtrlState::Holding
        )
    }
}

impl<E: DriveEqpt> DriveCtrl<E> {
    /// Create the control loop.
    ///
    /// The sensors are read once to seed the pose estimate at the origin.
    pub fn new(params: &Params, mut eqpt: E) -> Result<Self, DriveCtrlError> {
        let kinematics = DiffDriveKinematics::new(params.track_width_m)
            .map_err(DriveCtrlError::KinematicsError)?;

        let ramsete = Ramsete::new(&params.traj_ctrl, kinematics)
            .map_err(DriveCtrlError::TrajCtrlError)?;

        let servo = WheelServo::new(&params.wheel_servo)
            .map_err(DriveCtrlError::WheelServoError)?;

        let heading_rad = eqpt
            .read_heading_rad()
            .map_err(DriveCtrlError::InitialReadFailed)?;
        let disp = eqpt
            .read_displacement()
            .map_err(DriveCtrlError::InitialReadFailed)?;

        if !heading_rad.is_finite() || !disp.is_finite() {
            return Err(DriveCtrlError::InitialReadFailed(EqptError::InvalidReading));
        }

        info!(
            "DriveCtrl initialised with the {} servo profile",
            params.wheel_servo.active_profile
        );

        Ok(Self {
            eqpt,
            state: DriveCtrlState::Idle,
            estimator: PoseEstimator::new(Pose2d::default(), heading_rad, disp),
            ramsete,
            left_servo: servo.clone(),
            right_servo: servo,
            run: None,
            abort_requested: false,
            last_voltages: WheelVoltages::zero(),
            consec_sensor_faults: 0,
            max_consec_sensor_faults: params.max_consec_sensor_faults,
            last_fault: None,
        })
    }

    /// Begin a run along the given trajectory.
    ///
    /// The run begins on the next call to `tick`. If `reset_pose` is set the pose estimate is
    /// reset to the first pose of the trajectory when the run begins.
    ///
    /// Starting a run while another is in `Initializing` or `Tracking` is an error, to stop a
    /// run early call `abort_run` first.
    pub fn start_run(&mut self, trajectory: Trajectory, reset_pose: bool) -> Result<(), DriveCtrlError> {
        match self.state {
            DriveCtrlState::Initializing | DriveCtrlState::Tracking => {
                return Err(DriveCtrlError::RunAlreadyActive)
            }
            _ => (),
        }

        info!(
            "Starting a run of {:.2} s ({} states), reset pose: {}",
            trajectory.total_time_s(),
            trajectory.len(),
            reset_pose
        );

        self.run = Some(Run {
            trajectory,
            reset_pose,
            elapsed_s: 0.0,
            prev_targets: None,
        });
        self.state = DriveCtrlState::Initializing;
        self.abort_requested = false;
        self.consec_sensor_faults = 0;
        self.last_fault = None;
        self.ramsete.reset();

        Ok(())
    }

    /// Request that the current run is aborted.
    ///
    /// The abort happens at the start of the next tick. If no run is active this does nothing.
    pub fn abort_run(&mut self) {
        if self.state.is_active() {
            info!("Abort requested");
            self.abort_requested = true;
        }
    }

    /// Run one cycle of the control loop, `dt_s` seconds after the previous one.
    pub fn tick(&mut self, dt_s: f64) -> TickReport {
        let mut report = TickReport::default();

        // ---- ABORT ----

        if self.abort_requested {
            self.abort_requested = false;

            if self.state.is_active() {
                info!("Run aborted on request");
                self.enter_aborted();
            }
        }

        // ---- SENSING ----

        let readings = match self.read_sensors() {
            Ok(r) => {
                self.consec_sensor_faults = 0;
                self.estimator.update(r.heading_rad, r.disp);
                Some(r)
            }
            Err(e) => {
                // Only faults during a run count towards aborting it
                if self.state.is_active() {
                    self.consec_sensor_faults = self.consec_sensor_faults.saturating_add(1);
                }
                self.last_fault = Some(e);
                report.sensor_fault = true;
                warn!(
                    "Sensor fault ({} consecutive): {}",
                    self.consec_sensor_faults, e
                );
                None
            }
        };

        // Too many faults in a row ends the run
        if self.state.is_active() && self.consec_sensor_faults > self.max_consec_sensor_faults {
            error!(
                "{} consecutive sensor faults, aborting the run",
                self.consec_sensor_faults
            );
            self.enter_aborted();
        }

        // ---- STATE EXECUTION ----

        match self.state {
            DriveCtrlState::Idle | DriveCtrlState::Aborted => (),
            DriveCtrlState::Initializing => self.state_initializing(readings.as_ref(), &mut report),
            DriveCtrlState::Tracking => {
                self.state_tracking(dt_s, readings.as_ref(), &mut report)
            }
            DriveCtrlState::Holding => self.state_holding(),
        }

        // ---- REPORT ----

        let pose = self.estimator.pose();
        report.state = self.state;
        report.elapsed_s = self.elapsed_s();
        report.x_m = pose.x_m;
        report.y_m = pose.y_m;
        report.heading_rad = pose.heading_rad;
        report.left_v = self.last_voltages.left_v;
        report.right_v = self.last_voltages.right_v;
        if let Some(r) = readings {
            report.meas_left_ms = r.speeds.left_ms;
            report.meas_right_ms = r.speeds.right_ms;
        }

        trace!("DriveCtrl tick: {:?}", report);

        report
    }

    /// The current pose estimate.
    pub fn current_pose(&self) -> Pose2d {
        self.estimator.pose()
    }

    pub fn state(&self) -> DriveCtrlState {
        self.state
    }

    /// The reason for the most recent sensor fault since the start of the current run.
    pub fn last_fault(&self) -> Option<EqptError> {
        self.last_fault
    }

    /// Time along the current or most recent run, zero if there has never been a run.
    pub fn elapsed_s(&self) -> f64 {
        self.run.as_ref().map(|r| r.elapsed_s).unwrap_or(0.0)
    }

    /// Returns true if the vehicle was within tolerance of the reference on the last tracking
    /// tick.
    pub fn at_reference(&self) -> bool {
        self.ramsete.at_reference()
    }

    pub fn eqpt(&self) -> &E {
        &self.eqpt
    }

    pub fn eqpt_mut(&mut self) -> &mut E {
        &mut self.eqpt
    }

    /// State initializing.
    ///
    /// Resets the pose estimate if requested and then immediately runs the first tracking step
    /// at the start of the trajectory. If the sensors could not be read the reset is retried on
    /// the next tick.
    fn state_initializing(&mut self, readings: Option<&Readings>, report: &mut TickReport) {
        let readings = match readings {
            Some(r) => r,
            None => {
                self.reissue_voltages();
                return;
            }
        };

        let run = match self.run.as_mut() {
            Some(r) => r,
            None => {
                self.state = DriveCtrlState::Idle;
                return;
            }
        };

        if run.reset_pose {
            self.estimator.reset(
                run.trajectory.initial_pose(),
                readings.heading_rad,
                readings.disp,
            );
            info!("Pose reset to {:?}", self.estimator.pose());
        }

        run.elapsed_s = 0.0;
        run.prev_targets = None;

        self.state = DriveCtrlState::Tracking;
        info!("Tracking started");

        self.track(readings, report);
    }

    /// State tracking.
    ///
    /// Advances the trajectory time, and either moves to holding if the trajectory is finished
    /// or drives towards the reference state.
    fn state_tracking(&mut self, dt_s: f64, readings: Option<&Readings>, report: &mut TickReport) {
        let (elapsed_s, total_s) = match self.run.as_mut() {
            Some(run) => {
                run.elapsed_s += dt_s.max(0.0);
                (run.elapsed_s, run.trajectory.total_time_s())
            }
            None => {
                self.state = DriveCtrlState::Idle;
                return;
            }
        };

        if elapsed_s >= total_s {
            info!("Trajectory complete after {:.3} s, holding", elapsed_s);
            self.state = DriveCtrlState::Holding;
            self.state_holding();
            return;
        }

        match readings {
            Some(r) => self.track(r, report),
            None => self.reissue_voltages(),
        }
    }

    /// State holding.
    ///
    /// Commands zero voltage every tick.
    fn state_holding(&mut self) {
        self.send_voltages(WheelVoltages::zero());
    }

    /// Calculate and send the voltages for the current time along the run.
    fn track(&mut self, readings: &Readings, report: &mut TickReport) {
        let run = match self.run.as_mut() {
            Some(r) => r,
            None => return,
        };

        let reference: TrajectoryState = run.trajectory.sample(run.elapsed_s);
        let pose = self.estimator.pose();

        let ctrl: RamseteOutput = self.ramsete.calculate(&pose, &reference);
        let targets = ctrl.wheel_targets;

        // Divide by the time since the last tracking step, which spans any faulted ticks
        let (accel_left_mss, accel_right_mss) = match run.prev_targets {
            Some((prev_s, prev)) if run.elapsed_s > prev_s => {
                let interval_s = run.elapsed_s - prev_s;
                (
                    (targets.left_ms - prev.left_ms) / interval_s,
                    (targets.right_ms - prev.right_ms) / interval_s,
                )
            }
            _ => (0.0, 0.0),
        };
        run.prev_targets = Some((run.elapsed_s, targets));

        let left = self
            .left_servo
            .calculate(targets.left_ms, accel_left_mss, readings.speeds.left_ms);
        let right = self
            .right_servo
            .calculate(targets.right_ms, accel_right_mss, readings.speeds.right_ms);

        self.send_voltages(WheelVoltages {
            left_v: left.voltage_v,
            right_v: right.voltage_v,
        });

        report.ref_x_m = reference.pose.x_m;
        report.ref_y_m = reference.pose.y_m;
        report.ref_heading_rad = reference.pose.heading_rad;
        report.ref_velocity_ms = reference.velocity_ms;
        report.e_x_m = ctrl.e_x_m;
        report.e_y_m = ctrl.e_y_m;
        report.e_theta_rad = ctrl.e_theta_rad;
        report.target_left_ms = targets.left_ms;
        report.target_right_ms = targets.right_ms;
        report.target_left_mss = accel_left_mss;
        report.target_right_mss = accel_right_mss;
        report.saturated = left.saturated || right.saturated;
    }

    /// Move into the aborted state, stopping the motors.
    fn enter_aborted(&mut self) {
        self.send_voltages(WheelVoltages::zero());
        self.state = DriveCtrlState::Aborted;
    }

    /// Send the previous voltages again, used when the sensors could not be read.
    fn reissue_voltages(&mut self) {
        let voltages = self.last_voltages;
        self.send_voltages(voltages);
    }

    fn send_voltages(&mut self, voltages: WheelVoltages) {
        self.eqpt.set_voltages(&voltages);
        self.last_voltages = voltages;
    }

    fn read_sensors(&mut self) -> Result<Readings, EqptError> {
        let heading_rad = self.eqpt.read_heading_rad()?;
        let disp = self.eqpt.read_displacement()?;
        let speeds = self.eqpt.read_speeds()?;

        if !heading_rad.is_finite() || !disp.is_finite() || !speeds.is_finite() {
            return Err(EqptError::InvalidReading);
        }

        Ok(Readings {
            heading_rad,
            disp,
            speeds,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        sim::SimDrive,
        traj::{self, TrajGenerator},
        traj_ctrl,
        wheel_servo::{self, ServoProfile, SimpleFeedforward},
    };
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector2;
    use std::collections::HashMap;

    const TRACK_WIDTH_M: f64 = 0.46355;
    const DT_S: f64 = 0.02;

    fn profile() -> ServoProfile {
        ServoProfile {
            ks_v: 0.12124,
            kv_vspm: 2.9834,
            ka_vs2pm: 0.40143,
            kp_vspm: 0.090871,
        }
    }

    fn params() -> Params {
        let mut profiles = HashMap::new();
        profiles.insert("primary".to_string(), profile());

        Params {
            track_width_m: TRACK_WIDTH_M,
            max_consec_sensor_faults: 1,
            traj_ctrl: traj_ctrl::Params {
                b: 2.0,
                zeta: 0.7,
                enabled: true,
                pos_tolerance_m: 0.05,
                heading_tolerance_rad: 0.05,
            },
            wheel_servo: wheel_servo::Params {
                max_voltage_v: 12.0,
                active_profile: "primary".to_string(),
                profiles,
            },
        }
    }

    fn kinematics() -> DiffDriveKinematics {
        DiffDriveKinematics::new(TRACK_WIDTH_M).unwrap()
    }

    fn feedforward() -> SimpleFeedforward {
        profile().feedforward()
    }

    fn ctrl() -> DriveCtrl<SimDrive> {
        DriveCtrl::new(&params(), SimDrive::new(feedforward(), kinematics(), 12.0)).unwrap()
    }

    fn generate(start: Pose2d, interior: &[Vector2<f64>], end: Pose2d) -> Trajectory {
        let gen = TrajGenerator::new(
            traj::Params {
                max_velocity_ms: 1.0,
                max_accel_mss: 2.0,
                max_voltage_v: 10.0,
                time_step_s: DT_S,
                start_velocity_ms: 0.0,
                end_velocity_ms: 0.0,
                reversed: false,
            },
            feedforward(),
            kinematics(),
        )
        .unwrap();

        gen.generate(&start, interior, &end).unwrap()
    }

    fn straight() -> Trajectory {
        generate(Pose2d::new(0.0, 0.0, 0.0), &[], Pose2d::new(2.0, 0.0, 0.0))
    }

    /// Tick the loop and then advance the simulation over the tick.
    fn cycle(ctrl: &mut DriveCtrl<SimDrive>) -> TickReport {
        let report = ctrl.tick(DT_S);
        ctrl.eqpt_mut().step(DT_S);
        report
    }

    #[test]
    fn test_idle() {
        let mut ctrl = ctrl();
        assert_eq!(ctrl.state(), DriveCtrlState::Idle);

        let report = cycle(&mut ctrl);
        assert_eq!(report.state, DriveCtrlState::Idle);
        assert!(ctrl.eqpt().voltages().is_zero());
        assert_eq!(ctrl.current_pose(), Pose2d::default());

        // Nothing to abort
        ctrl.abort_run();
        assert_eq!(cycle(&mut ctrl).state, DriveCtrlState::Idle);
    }

    #[test]
    fn test_start_run() {
        let mut ctrl = ctrl();
        ctrl.start_run(straight(), true).unwrap();
        assert_eq!(ctrl.state(), DriveCtrlState::Initializing);

        assert!(matches!(
            ctrl.start_run(straight(), true),
            Err(DriveCtrlError::RunAlreadyActive)
        ));

        // First tick runs the tracking step at the start of the trajectory. The reference is at
        // rest but the static friction term is applied once the targets start moving.
        let report = cycle(&mut ctrl);
        assert_eq!(report.state, DriveCtrlState::Tracking);
        assert_eq!(report.elapsed_s, 0.0);

        let report = cycle(&mut ctrl);
        assert_eq!(report.state, DriveCtrlState::Tracking);
        assert!(report.left_v > 0.0 && report.right_v > 0.0);
        assert!(matches!(
            ctrl.start_run(straight(), true),
            Err(DriveCtrlError::RunAlreadyActive)
        ));
    }

    #[test]
    fn test_abort() {
        let mut ctrl = ctrl();
        ctrl.start_run(straight(), true).unwrap();

        for _ in 0..20 {
            cycle(&mut ctrl);
        }
        assert_eq!(ctrl.state(), DriveCtrlState::Tracking);
        assert!(!ctrl.eqpt().voltages().is_zero());

        ctrl.abort_run();
        // Nothing happens until the next tick
        assert_eq!(ctrl.state(), DriveCtrlState::Tracking);

        let report = cycle(&mut ctrl);
        assert_eq!(report.state, DriveCtrlState::Aborted);
        assert_eq!(report.left_v, 0.0);
        assert_eq!(report.right_v, 0.0);
        assert!(ctrl.eqpt().voltages().is_zero());

        // Stays aborted with the motors off
        for _ in 0..5 {
            assert_eq!(cycle(&mut ctrl).state, DriveCtrlState::Aborted);
        }
        assert!(ctrl.eqpt().voltages().is_zero());

        // A new run can be started
        ctrl.start_run(straight(), false).unwrap();
        assert_eq!(cycle(&mut ctrl).state, DriveCtrlState::Tracking);
    }

    #[test]
    fn test_holding() {
        let mut ctrl = ctrl();
        let traj = straight();
        let total_s = traj.total_time_s();
        ctrl.start_run(traj, true).unwrap();

        let mut ticks = 0;
        while ctrl.state() != DriveCtrlState::Holding {
            cycle(&mut ctrl);
            ticks += 1;
            assert!(ticks < 1000);
        }

        assert!(ctrl.elapsed_s() >= total_s);
        assert!(ctrl.eqpt().voltages().is_zero());

        for _ in 0..10 {
            let report = cycle(&mut ctrl);
            assert_eq!(report.state, DriveCtrlState::Holding);
            assert!(ctrl.eqpt().voltages().is_zero());
        }

        // Holding can be aborted, and a new run started
        ctrl.abort_run();
        assert_eq!(cycle(&mut ctrl).state, DriveCtrlState::Aborted);
        ctrl.start_run(straight(), true).unwrap();
    }

    #[test]
    fn test_single_sensor_fault() {
        let mut ctrl = ctrl();
        ctrl.start_run(straight(), true).unwrap();

        for _ in 0..20 {
            cycle(&mut ctrl);
        }
        let pose = ctrl.current_pose();
        let voltages = ctrl.eqpt().voltages();

        ctrl.eqpt_mut().inject_heading_faults(1);
        let report = ctrl.tick(DT_S);

        // Pose held and the last voltages reissued
        assert!(report.sensor_fault);
        assert_eq!(report.state, DriveCtrlState::Tracking);
        assert_eq!(ctrl.current_pose(), pose);
        assert_eq!(ctrl.eqpt().voltages(), voltages);
        assert_eq!(ctrl.last_fault(), Some(EqptError::HeadingUnavailable));

        // Recovers on the next tick
        ctrl.eqpt_mut().step(DT_S);
        let report = cycle(&mut ctrl);
        assert!(!report.sensor_fault);
        assert_eq!(report.state, DriveCtrlState::Tracking);
    }

    #[test]
    fn test_accel_after_sensor_fault() {
        let start = Pose2d::new(0.0, 0.0, 0.0);
        let end = Pose2d::new(3.0, 0.0, 0.0);
        let traj = generate(start, &[Vector2::new(1.0, 1.0), Vector2::new(2.0, -1.0)], end);

        let mut ctrl = ctrl();
        ctrl.start_run(traj, true).unwrap();

        for _ in 0..30 {
            cycle(&mut ctrl);
        }
        let before = cycle(&mut ctrl);
        assert!(!before.sensor_fault);

        ctrl.eqpt_mut().inject_heading_faults(1);
        assert!(cycle(&mut ctrl).sensor_fault);

        // The target acceleration spans both ticks since the last tracking step
        let after = cycle(&mut ctrl);
        assert!(!after.sensor_fault);
        assert_eq!(after.state, DriveCtrlState::Tracking);

        let interval_s = after.elapsed_s - before.elapsed_s;
        assert_abs_diff_eq!(interval_s, 2.0 * DT_S, epsilon = 1e-12);
        assert_abs_diff_eq!(
            after.target_left_mss,
            (after.target_left_ms - before.target_left_ms) / interval_s,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            after.target_right_mss,
            (after.target_right_ms - before.target_right_ms) / interval_s,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_fault_count_outside_run() {
        let mut ctrl = ctrl();

        // Faults while idle are reported but don't count against the next run
        ctrl.eqpt_mut().inject_encoder_faults(5);
        for _ in 0..5 {
            let report = cycle(&mut ctrl);
            assert!(report.sensor_fault);
            assert_eq!(report.state, DriveCtrlState::Idle);
        }
        assert_eq!(ctrl.consec_sensor_faults, 0);
        assert_eq!(ctrl.last_fault(), Some(EqptError::EncodersUnavailable));

        // The count saturates rather than overflowing
        ctrl.start_run(straight(), true).unwrap();
        cycle(&mut ctrl);
        ctrl.consec_sensor_faults = u32::MAX;
        ctrl.eqpt_mut().inject_encoder_faults(1);
        let report = cycle(&mut ctrl);
        assert_eq!(ctrl.consec_sensor_faults, u32::MAX);
        assert_eq!(report.state, DriveCtrlState::Aborted);
    }

    #[test]
    fn test_persistent_sensor_fault() {
        let mut ctrl = ctrl();
        ctrl.start_run(straight(), true).unwrap();

        for _ in 0..20 {
            cycle(&mut ctrl);
        }

        ctrl.eqpt_mut().inject_encoder_faults(10);
        assert_eq!(cycle(&mut ctrl).state, DriveCtrlState::Tracking);

        let report = cycle(&mut ctrl);
        assert_eq!(report.state, DriveCtrlState::Aborted);
        assert!(ctrl.eqpt().voltages().is_zero());
        assert_eq!(ctrl.last_fault(), Some(EqptError::EncodersUnavailable));
    }

    #[test]
    fn test_end_to_end_s_curve() {
        let start = Pose2d::new(0.0, 0.0, 0.0);
        let end = Pose2d::new(3.0, 0.0, 0.0);
        let traj = generate(start, &[Vector2::new(1.0, 1.0), Vector2::new(2.0, -1.0)], end);

        let mut ctrl = ctrl();
        ctrl.start_run(traj, true).unwrap();

        let mut ticks = 0;
        while ctrl.state() != DriveCtrlState::Holding {
            let report = cycle(&mut ctrl);
            assert!(report.e_y_m.abs() < 0.1);
            ticks += 1;
            assert!(ticks < 2000);
        }

        // Let the vehicle come to rest
        for _ in 0..50 {
            cycle(&mut ctrl);
        }

        let true_pose = ctrl.eqpt().true_pose();
        assert!(true_pose.approx_eq(&end, 0.1, 0.1), "{:?}", true_pose);

        // Odometry agrees with the simulated truth
        assert!(ctrl.current_pose().approx_eq(&true_pose, 1e-6, 1e-6));
    }

    #[test]
    fn test_converges_from_offset() {
        // The vehicle starts 0.1 m to the left of the trajectory and isn't reset onto it
        let traj = generate(
            Pose2d::new(0.0, -0.1, 0.0),
            &[],
            Pose2d::new(3.0, -0.1, 0.0),
        );

        let mut ctrl = ctrl();
        ctrl.start_run(traj, false).unwrap();

        let first = cycle(&mut ctrl);
        assert!(first.e_y_m < -0.09);

        let mut last = first;
        while ctrl.state() == DriveCtrlState::Tracking {
            last = cycle(&mut ctrl);
        }

        assert!((ctrl.current_pose().y_m + 0.1).abs() < 0.05);
        assert_eq!(last.state, DriveCtrlState::Holding);
    }
}
