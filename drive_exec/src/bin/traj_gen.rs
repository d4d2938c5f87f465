//! # Trajectory Generator
//!
//! This binary generates a trajectory along the path in the drive parameter file and writes it
//! to a CSV file, which can be followed later with `drive_exec --traj`. It can also convert a
//! PathWeaver JSON trajectory into the same CSV format.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;

use color_eyre::{eyre::WrapErr, Result};
use log::info;
use structopt::StructOpt;

use drive_lib::{
    kinematics::DiffDriveKinematics,
    params::DriveExecParams,
    traj::{TrajGenerator, Trajectory},
};
use util::logger::{logger_init_stdout, LevelFilter};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "traj_gen", about = "Generate a trajectory CSV file")]
struct Opt {
    /// Path to write the trajectory CSV to
    #[structopt(parse(from_os_str))]
    output: PathBuf,

    /// Parameter file, relative to the params directory under the software root
    #[structopt(short, long, default_value = "drive_exec.toml")]
    params: String,

    /// Wheel servo profile to build the voltage constraint from, instead of the active profile
    #[structopt(long)]
    profile: Option<String>,

    /// Drive the path backwards
    #[structopt(long)]
    reversed: bool,

    /// Convert this PathWeaver JSON trajectory instead of generating one
    #[structopt(long, parse(from_os_str))]
    convert: Option<PathBuf>,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    logger_init_stdout(LevelFilter::Info).wrap_err("Failed to initialise logging")?;

    let trajectory = match opt.convert {
        Some(ref json_path) => {
            info!("Converting PathWeaver trajectory {:?}", json_path);
            Trajectory::load_pathweaver_json(json_path)
                .wrap_err_with(|| format!("Failed to load {:?}", json_path))?
        }
        None => generate(&opt)?,
    };

    info!(
        "Trajectory has {} states and lasts {:.3} s",
        trajectory.len(),
        trajectory.total_time_s()
    );

    trajectory
        .save_csv(&opt.output)
        .wrap_err_with(|| format!("Failed to write {:?}", opt.output))?;

    info!("Trajectory written to {:?}", opt.output);

    Ok(())
}

fn generate(opt: &Opt) -> Result<Trajectory> {
    let mut params: DriveExecParams =
        util::params::load(&opt.params).wrap_err("Could not load drive_exec params")?;

    if let Some(ref profile) = opt.profile {
        params.drive_ctrl.wheel_servo.active_profile = profile.clone();
    }
    if opt.reversed {
        params.traj_gen.reversed = true;
    }

    info!(
        "Generating with the {} profile, {} interior waypoint(s)",
        params.drive_ctrl.wheel_servo.active_profile,
        params.path.interior.len()
    );

    let kinematics = DiffDriveKinematics::new(params.drive_ctrl.track_width_m)
        .wrap_err("Invalid track width")?;
    let feedforward = params
        .drive_ctrl
        .wheel_servo
        .feedforward()
        .wrap_err("Invalid wheel servo profile")?;

    TrajGenerator::new(params.traj_gen.clone(), feedforward, kinematics)
        .wrap_err("Invalid trajectory generation parameters")?
        .generate(&params.path.start, &params.path.interior(), &params.path.end)
        .wrap_err("Failed to generate the trajectory")
}
