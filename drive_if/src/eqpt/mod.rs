//! # Equipment Interface
//!
//! This module defines the interface structures passed between the drive software and the
//! equipment drivers.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod drive;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use drive::*;
