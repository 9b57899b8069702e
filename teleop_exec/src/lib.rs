//! # Teleoperation library.
//!
//! This library allows other crates in the workspace to access items defined inside the
//! teleoperation crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command velocity server - publishes the corrected commands to the base
pub mod cmd_vel_server;

/// Processing cycle - one scan in, at most one command out
pub mod cycle;

/// Desired velocity register - holds the operator's latest command
pub mod des_vel;

/// Desired velocity client - recieves the operator's commands in the background
pub mod des_vel_client;

/// Executable parameters
pub mod params;

/// Safety filter module - checks scans for obstacles and corrects the desired command
pub mod safety_filter;

/// Scan client - recieves lidar scans
pub mod scan_client;
