//! # Equipment Interface
//!
//! This module defines the message structures exchanged with equipment (the lidar, the operator
//! and the base controller).

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod lidar;
pub mod vel;
