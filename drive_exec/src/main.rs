//! Main drive executable entry point.
//!
//! # Architecture
//!
//! The executable runs the drive control loop against the simulated drive equipment:
//!
//!     - Initialise the session, logging and parameters
//!     - Generate a trajectory along the path in the parameters, or load a precomputed one
//!     - Main loop:
//!         - Drive control tick (sensing, pose estimation, tracking, servos)
//!         - Simulation step
//!         - Archive the tick report
//!     - Save the trajectory and a summary of the run into the session
//!
//! The loop ends once the trajectory is complete and the settle time has passed, or the run is
//! aborted.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{debug, info, warn};
use serde::Serialize;
use structopt::StructOpt;

// Internal
use drive_lib::{
    drive_ctrl::{DriveCtrl, DriveCtrlState},
    kinematics::DiffDriveKinematics,
    loc::Pose2d,
    params::DriveExecParams,
    sim::SimDrive,
    traj::{TrajGenerator, Trajectory},
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
    time::duration_to_seconds,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(
    name = "drive_exec",
    about = "Follow a trajectory with the simulated differential drive"
)]
struct Opt {
    /// Parameter file, relative to the params directory under the software root
    #[structopt(short, long, default_value = "drive_exec.toml")]
    params: String,

    /// Precomputed trajectory to follow, either CSV or PathWeaver JSON. If not given a
    /// trajectory is generated along the path in the parameter file.
    #[structopt(short, long, parse(from_os_str))]
    traj: Option<PathBuf>,

    /// Abort the run this many seconds after it starts
    #[structopt(long)]
    abort_at_s: Option<f64>,

    /// Make the heading sensor fail for `fault_ticks` reads, this many seconds after the run
    /// starts
    #[structopt(long)]
    fault_at_s: Option<f64>,

    /// Number of consecutive heading faults to inject
    #[structopt(long, default_value = "1")]
    fault_ticks: u32,

    /// Abort the run if it has not finished after this many seconds
    #[structopt(long, default_value = "120")]
    max_duration_s: f64,
}

/// Summary of a run, saved into the session.
#[derive(Debug, Serialize)]
struct RunSummary {
    final_state: DriveCtrlState,
    elapsed_s: f64,
    num_cycles: u64,
    wall_time_s: f64,
    estimated_pose: Pose2d,
    true_pose: Pose2d,
    target_pose: Pose2d,
    last_fault: Option<String>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Differential Drive Executable\n");
    info!("Running on: {}", host::get_host_desc());
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let params: DriveExecParams =
        util::params::load(&opt.params).wrap_err("Could not load drive_exec params")?;

    if !(params.cycle_period_s > 0.0) {
        return Err(eyre!(
            "The cycle period must be positive, found {}",
            params.cycle_period_s
        ));
    }

    info!("Exec parameters loaded");

    let kinematics = DiffDriveKinematics::new(params.drive_ctrl.track_width_m)
        .wrap_err("Invalid track width")?;
    let feedforward = params
        .drive_ctrl
        .wheel_servo
        .feedforward()
        .wrap_err("Invalid wheel servo profile")?;

    // ---- TRAJECTORY ----

    let trajectory = match opt.traj {
        Some(ref path) => {
            info!("Loading trajectory from {:?}", path);
            Trajectory::load(path)
                .wrap_err_with(|| format!("Failed to load the trajectory from {:?}", path))?
        }
        None => {
            info!("Generating trajectory along the parameter path");
            TrajGenerator::new(params.traj_gen.clone(), feedforward, kinematics)
                .wrap_err("Invalid trajectory generation parameters")?
                .generate(
                    &params.path.start,
                    &params.path.interior(),
                    &params.path.end,
                )
                .wrap_err("Failed to generate the trajectory")?
        }
    };

    info!(
        "Trajectory has {} states and lasts {:.3} s\n",
        trajectory.len(),
        trajectory.total_time_s()
    );

    session.save("trajectory.json", trajectory.clone());

    // ---- INITIALISE MODULES ----

    let sim = SimDrive::from_params(&params.sim, feedforward, kinematics);

    let mut drive_ctrl =
        DriveCtrl::new(&params.drive_ctrl, sim).wrap_err("Failed to initialise DriveCtrl")?;
    info!("DriveCtrl init complete");

    let mut archiver =
        Archiver::from_path(&session, "drive_ctrl.csv").wrap_err("Failed to create the archive")?;

    let target_pose = trajectory.last_state().pose;

    drive_ctrl
        .start_run(trajectory, params.path.reset_pose)
        .wrap_err("Failed to start the run")?;

    // ---- MAIN LOOP ----

    let period_s = params.cycle_period_s;
    let wall_start = Utc::now();

    let mut sim_time_s = 0.0;
    let mut num_cycles = 0u64;
    let mut settle_remaining_s = params.settle_time_s;
    let mut abort_sent = false;
    let mut fault_injected = false;

    info!("Beginning main loop\n");

    loop {
        let cycle_start = Instant::now();

        if let Some(t) = opt.abort_at_s {
            if !abort_sent && sim_time_s >= t {
                info!("Requesting abort at {:.3} s", sim_time_s);
                drive_ctrl.abort_run();
                abort_sent = true;
            }
        }

        if let Some(t) = opt.fault_at_s {
            if !fault_injected && sim_time_s >= t {
                info!("Injecting {} heading fault(s) at {:.3} s", opt.fault_ticks, sim_time_s);
                drive_ctrl.eqpt_mut().inject_heading_faults(opt.fault_ticks);
                fault_injected = true;
            }
        }

        // ---- CONTROL ----

        let report = drive_ctrl.tick(period_s);

        // ---- SIMULATION ----

        drive_ctrl.eqpt_mut().step(period_s);

        // ---- ARCHIVING ----

        archiver
            .serialise(&report)
            .wrap_err("Failed to archive the tick report")?;

        sim_time_s += period_s;
        num_cycles += 1;

        match report.state {
            DriveCtrlState::Aborted => {
                warn!("Run aborted");
                break;
            }
            DriveCtrlState::Holding => {
                settle_remaining_s -= period_s;
                if settle_remaining_s <= 0.0 {
                    info!("Run complete");
                    break;
                }
            }
            _ => (),
        }

        if sim_time_s > opt.max_duration_s && !abort_sent {
            warn!("Run has not finished after {:.1} s, aborting", opt.max_duration_s);
            drive_ctrl.abort_run();
            abort_sent = true;
        }

        // ---- CYCLE MANAGEMENT ----

        if params.realtime {
            let cycle_dur = Instant::now() - cycle_start;
            match Duration::from_secs_f64(period_s).checked_sub(cycle_dur) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - period_s
                ),
            }
        }
    }

    // ---- SUMMARY ----

    let summary = RunSummary {
        final_state: drive_ctrl.state(),
        elapsed_s: drive_ctrl.elapsed_s(),
        num_cycles,
        wall_time_s: duration_to_seconds(Utc::now() - wall_start).unwrap_or(0.0),
        estimated_pose: drive_ctrl.current_pose(),
        true_pose: drive_ctrl.eqpt().true_pose(),
        target_pose,
        last_fault: drive_ctrl.last_fault().map(|f| f.to_string()),
    };

    info!(
        "Final pose: estimated ({:.3}, {:.3}, {:.3}), true ({:.3}, {:.3}, {:.3})",
        summary.estimated_pose.x_m,
        summary.estimated_pose.y_m,
        summary.estimated_pose.heading_rad,
        summary.true_pose.x_m,
        summary.true_pose.y_m,
        summary.true_pose.heading_rad
    );
    info!(
        "Distance to target: {:.3} m",
        summary.true_pose.distance_to(&summary.target_pose)
    );

    session.save("summary.json", summary);

    info!("End of execution");
    session.exit();

    Ok(())
}
