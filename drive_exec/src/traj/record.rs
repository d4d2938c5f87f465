//! Persisted trajectory formats
//!
//! Two formats are supported:
//!
//! - CSV, one [`TrajRecord`] per row. Written and read by this software, values round trip
//!   exactly.
//! - PathWeaver JSON, an array of objects of the form
//!   `{time, velocity, acceleration, pose: {translation: {x, y}, rotation: {radians}}, curvature}`.
//!   Only read.
//!
//! Both are validated through [`Trajectory::from_states`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::loc::Pose2d;

use super::{TrajError, Trajectory, TrajectoryState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One row of a trajectory CSV file.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajRecord {
    pub time_s: f64,
    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,
    pub velocity_ms: f64,
    pub acceleration_mss: f64,
    pub curvature_radpm: f64,
}

#[derive(Deserialize)]
struct PathWeaverState {
    time: f64,
    velocity: f64,
    acceleration: f64,
    pose: PathWeaverPose,
    curvature: f64,
}

#[derive(Deserialize)]
struct PathWeaverPose {
    translation: PathWeaverTranslation,
    rotation: PathWeaverRotation,
}

#[derive(Deserialize)]
struct PathWeaverTranslation {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct PathWeaverRotation {
    radians: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl From<&TrajectoryState> for TrajRecord {
    fn from(s: &TrajectoryState) -> Self {
        Self {
            time_s: s.time_s,
            x_m: s.pose.x_m,
            y_m: s.pose.y_m,
            heading_rad: s.pose.heading_rad,
            velocity_ms: s.velocity_ms,
            acceleration_mss: s.accel_mss,
            curvature_radpm: s.curvature_radpm,
        }
    }
}

impl From<&TrajRecord> for TrajectoryState {
    fn from(r: &TrajRecord) -> Self {
        Self {
            time_s: r.time_s,
            pose: Pose2d::new(r.x_m, r.y_m, r.heading_rad),
            velocity_ms: r.velocity_ms,
            accel_mss: r.acceleration_mss,
            curvature_radpm: r.curvature_radpm,
        }
    }
}

impl PathWeaverState {
    fn into_state(self) -> TrajectoryState {
        TrajectoryState {
            time_s: self.time,
            pose: Pose2d::new(
                self.pose.translation.x,
                self.pose.translation.y,
                self.pose.rotation.radians,
            ),
            velocity_ms: self.velocity,
            accel_mss: self.acceleration,
            curvature_radpm: self.curvature,
        }
    }
}

impl Trajectory {
    pub fn to_records(&self) -> Vec<TrajRecord> {
        self.states().iter().map(TrajRecord::from).collect()
    }

    pub fn from_records(records: &[TrajRecord]) -> Result<Self, TrajError> {
        Self::from_states(records.iter().map(TrajectoryState::from).collect())
    }

    /// Write the trajectory as CSV, with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TrajError> {
        let mut writer = csv::Writer::from_writer(writer);

        for record in self.to_records() {
            writer.serialize(record).map_err(TrajError::CsvError)?;
        }

        writer.flush().map_err(TrajError::IoError)
    }

    /// Read a trajectory from CSV with a header row.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, TrajError> {
        let mut reader = csv::Reader::from_reader(reader);

        let records = reader
            .deserialize()
            .collect::<Result<Vec<TrajRecord>, _>>()
            .map_err(TrajError::CsvError)?;

        Self::from_records(&records)
    }

    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), TrajError> {
        let file = File::create(path).map_err(TrajError::IoError)?;
        self.write_csv(file)
    }

    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self, TrajError> {
        let file = File::open(path).map_err(TrajError::IoError)?;
        Self::read_csv(file)
    }

    /// Read a trajectory exported by PathWeaver.
    pub fn from_pathweaver_json<R: Read>(reader: R) -> Result<Self, TrajError> {
        let states: Vec<PathWeaverState> =
            serde_json::from_reader(reader).map_err(TrajError::JsonError)?;

        Self::from_states(states.into_iter().map(PathWeaverState::into_state).collect())
    }

    pub fn load_pathweaver_json<P: AsRef<Path>>(path: P) -> Result<Self, TrajError> {
        let file = File::open(path).map_err(TrajError::IoError)?;
        Self::from_pathweaver_json(file)
    }

    /// Load a trajectory from a file, choosing the format from the extension (`.json` for
    /// PathWeaver, anything else for CSV).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrajError> {
        let is_json = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::load_pathweaver_json(path)
        }
        else {
            Self::load_csv(path)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn trajectory() -> Trajectory {
        Trajectory::from_states(vec![
            TrajectoryState {
                time_s: 0.0,
                pose: Pose2d::new(0.0, 0.0, 0.1),
                velocity_ms: 0.0,
                accel_mss: 1.0 / 3.0,
                curvature_radpm: 0.123456789,
            },
            TrajectoryState {
                time_s: 0.02,
                pose: Pose2d::new(1e-5 / 3.0, 2.0_f64.sqrt(), PI),
                velocity_ms: 0.1 + 0.2,
                accel_mss: -0.7,
                curvature_radpm: -1e-300,
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_csv_round_trip_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traj.csv");

        let traj = trajectory();
        traj.save_csv(&path).unwrap();
        let loaded = Trajectory::load(&path).unwrap();

        assert_eq!(loaded, traj);
    }

    #[test]
    fn test_csv_header() {
        let mut buf = Vec::new();
        trajectory().write_csv(&mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "time_s,x_m,y_m,heading_rad,velocity_ms,acceleration_mss,curvature_radpm"
        );
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_csv_invalid() {
        let text = "time_s,x_m,y_m,heading_rad,velocity_ms,acceleration_mss,curvature_radpm\n\
                    0.5,0,0,0,0,0,0\n";
        assert!(matches!(
            Trajectory::read_csv(text.as_bytes()),
            Err(TrajError::InvalidRecords(_))
        ));

        let text = "time_s,x_m\n0,0\n";
        assert!(matches!(
            Trajectory::read_csv(text.as_bytes()),
            Err(TrajError::CsvError(_))
        ));
    }

    #[test]
    fn test_pathweaver_json() {
        let json = r#"[
            {"time": 0.0, "velocity": 0.0, "acceleration": 2.0,
             "pose": {"translation": {"x": 0.0, "y": 0.0}, "rotation": {"radians": 0.0}},
             "curvature": 0.0},
            {"time": 0.5, "velocity": 1.0, "acceleration": 0.0,
             "pose": {"translation": {"x": 0.25, "y": 0.1}, "rotation": {"radians": 7.853981633974483}},
             "curvature": 0.4}
        ]"#;

        let traj = Trajectory::from_pathweaver_json(json.as_bytes()).unwrap();
        assert_eq!(traj.len(), 2);
        assert_abs_diff_eq!(traj.total_time_s(), 0.5);

        let last = traj.last_state();
        assert_abs_diff_eq!(last.pose.x_m, 0.25);
        assert_abs_diff_eq!(last.pose.heading_rad, FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(last.curvature_radpm, 0.4);
    }

    #[test]
    fn test_pathweaver_json_not_increasing() {
        let json = r#"[
            {"time": 0.0, "velocity": 0.0, "acceleration": 0.0,
             "pose": {"translation": {"x": 0.0, "y": 0.0}, "rotation": {"radians": 0.0}},
             "curvature": 0.0},
            {"time": 0.0, "velocity": 0.0, "acceleration": 0.0,
             "pose": {"translation": {"x": 0.0, "y": 0.0}, "rotation": {"radians": 0.0}},
             "curvature": 0.0}
        ]"#;

        assert!(matches!(
            Trajectory::from_pathweaver_json(json.as_bytes()),
            Err(TrajError::InvalidRecords(_))
        ));
    }
}
