//! # Drive control module
//!
//! Drive control is the control loop of the vehicle. It is ticked once per cycle by whatever
//! schedules the software (the main loop of `drive_exec`, or a test), and each tick:
//!
//! 1. Reads the heading, wheel displacements and wheel speeds from the equipment.
//! 2. Updates the pose estimate.
//! 3. Advances the time along the current trajectory and samples the reference state.
//! 4. Runs the RAMSETE controller to get the target wheel speeds.
//! 5. Runs the wheel servos to get the voltage demands, and sends them to the equipment.
//!
//! The module is a state machine:
//!
//! ```text
//!            start_run            first tick                 elapsed >= duration
//!   Idle -----------> Initializing ----------> Tracking ------------------------> Holding
//!                          |                      |                                   |
//!                          +------------ abort_run or sensor faults ------------------+
//!                                                 |
//!                                                 v
//!                                              Aborted
//! ```
//!
//! A new run can be started from `Idle`, `Holding` or `Aborted`. While `Holding` zero voltages
//! are sent every tick, on entering `Aborted` zero voltages are sent once.
//!
//! Aborts are cooperative: `abort_run` only raises a request which is acted on at the start of
//! the next tick. Sensor faults never cause a tick to fail, instead the pose is held and the
//! last voltages reissued for one tick, after which the run is aborted.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use params::Params;
pub use state::*;
