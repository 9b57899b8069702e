//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for equipment (lidar, velocity commands)
pub mod eqpt;

/// Network module
pub mod net;
