//! Planar pose definition

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Deserializer, Serialize};

use util::maths::{get_ang_dist, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Heading changes smaller than this are integrated with a Taylor expansion.
const SMALL_ANGLE_RAD: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading) of the vehicle body in the field frame.
///
/// The heading is the angle of the vehicle's forward axis to the field +X axis, anticlockwise
/// positive, wrapped into (-pi, pi]. Deserialised poses are wrapped in the same way.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct Pose2d {
    /// Units: meters
    pub x_m: f64,

    /// Units: meters
    pub y_m: f64,

    /// Units: radians
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2d {
    /// Create a new pose, wrapping the heading into (-pi, pi].
    ///
    /// Headings already in range are kept bit for bit.
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        let heading_rad = if heading_rad > -PI && heading_rad <= PI {
            heading_rad
        }
        else {
            wrap_pi(heading_rad)
        };

        Self {
            x_m,
            y_m,
            heading_rad,
        }
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }

    /// Unit vector pointing along the forward axis of the pose.
    pub fn forward(&self) -> Vector2<f64> {
        Vector2::new(self.heading_rad.cos(), self.heading_rad.sin())
    }

    /// Express this pose in the frame of `origin`.
    pub fn relative_to(&self, origin: &Pose2d) -> Pose2d {
        let pos = Rotation2::new(-origin.heading_rad) * (self.position() - origin.position());

        Pose2d::new(
            pos[0],
            pos[1],
            get_ang_dist(origin.heading_rad, self.heading_rad)
        )
    }

    /// Apply `other`, expressed in the frame of this pose, to this pose.
    ///
    /// This is the inverse of [`Pose2d::relative_to`], so
    /// `origin.transform_by(&p.relative_to(&origin)) == p`.
    pub fn transform_by(&self, other: &Pose2d) -> Pose2d {
        let pos = self.position() + Rotation2::new(self.heading_rad) * other.position();

        Pose2d::new(pos[0], pos[1], self.heading_rad + other.heading_rad)
    }

    /// Integrate a constant curvature motion of `dist_m` along the arc, over which the heading
    /// changes by `dheading_rad`.
    pub fn exp(&self, dist_m: f64, dheading_rad: f64) -> Pose2d {
        // Displacement in the local frame of this pose. For a straight line s -> 1 and c -> 0.
        let (s, c) = if dheading_rad.abs() < SMALL_ANGLE_RAD {
            (
                1.0 - dheading_rad.powi(2) / 6.0,
                0.5 * dheading_rad
            )
        }
        else {
            (
                dheading_rad.sin() / dheading_rad,
                (1.0 - dheading_rad.cos()) / dheading_rad
            )
        };

        self.transform_by(&Pose2d::new(dist_m * s, dist_m * c, dheading_rad))
    }

    /// Linearly interpolate between this pose and `end`, taking the shortest arc between the two
    /// headings. `frac` is clamped to [0, 1].
    pub fn interpolate(&self, end: &Pose2d, frac: f64) -> Pose2d {
        let frac = frac.max(0.0).min(1.0);

        Pose2d::new(
            self.x_m + (end.x_m - self.x_m) * frac,
            self.y_m + (end.y_m - self.y_m) * frac,
            self.heading_rad + get_ang_dist(self.heading_rad, end.heading_rad) * frac
        )
    }

    /// Distance between the positions of the two poses.
    pub fn distance_to(&self, other: &Pose2d) -> f64 {
        (other.position() - self.position()).norm()
    }

    /// Returns true if all fields are within the given tolerances of the other pose.
    pub fn approx_eq(&self, other: &Pose2d, tol_m: f64, tol_rad: f64) -> bool {
        (self.x_m - other.x_m).abs() <= tol_m
            && (self.y_m - other.y_m).abs() <= tol_m
            && get_ang_dist(self.heading_rad, other.heading_rad).abs() <= tol_rad
    }
}

impl<'de> Deserialize<'de> for Pose2d {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawPose2d {
            x_m: f64,
            y_m: f64,
            heading_rad: f64,
        }

        let raw = RawPose2d::deserialize(deserializer)?;
        Ok(Pose2d::new(raw.x_m, raw.y_m, raw.heading_rad))
    }
}
