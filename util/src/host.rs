//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the environment variable pointing at the root of the software
/// checkout, which contains the `params` and `sessions` directories.
pub const SW_ROOT_ENV_VAR: &str = "DIFF_DRIVE_SW_ROOT";

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the software from the environment.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Get a short description of the host the software is running on.
pub fn get_host_desc() -> String {
    format!(
        "{} ({}), {} build",
        env::consts::OS,
        env::consts::ARCH,
        if cfg!(debug_assertions) { "debug" } else { "release" }
    )
}
