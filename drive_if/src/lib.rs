//! # Drive interface crate.
//!
//! Provides the interface between the drive software and the equipment it
//! runs on: the heading source, the wheel encoders and the wheel motors.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Sensor data and demand definitions for equipment, and the equipment trait
pub mod eqpt;
