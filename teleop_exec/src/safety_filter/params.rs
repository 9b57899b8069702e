//! Parameters structure for the SafetyFilter

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::SafetyFilterError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the SafetyFilter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {

    // ---- CLEARANCE ----

    /// The minimum clearance to keep between the robot's body and any
    /// obstacle.
    ///
    /// Units: meters
    pub min_safe_dist_m: f64,

    // ---- GEOMETRY ----

    /// The radius of the robot's body, which is treated as a disk centred on
    /// the lidar.
    ///
    /// Units: meters
    pub robot_radius_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check that the parameters describe a physically meaningful robot.
    pub fn validate(&self) -> Result<(), SafetyFilterError> {
        let checks = [
            ("min_safe_dist_m", self.min_safe_dist_m),
            ("robot_radius_m", self.robot_radius_m),
        ];

        for &(name, value) in checks.iter() {
            if !value.is_finite() || value <= 0.0 {
                return Err(SafetyFilterError::InvalidParam(name, value))
            }
        }

        Ok(())
    }

    /// The sweep angle at which the right cone ends and the central band
    /// begins. The central band ends at pi minus this angle.
    ///
    /// Units: radians
    pub fn zone_boundary_rad(&self) -> f64 {
        (self.min_safe_dist_m / self.robot_radius_m).atan()
    }
}
