//! # Velocity Command Messages

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A planar body velocity command.
///
/// Used both for the desired velocity coming from the operator and for the corrected velocity
/// sent on to the base controller.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelCmd {
    /// Forward speed of the robot body.
    ///
    /// Positive speeds are "forwards", negative speeds are "backwards".
    ///
    /// Units: meters/second
    pub linear_x: f64,

    /// Turn rate of the robot body about its Z+ (upwards) axis.
    ///
    /// Follows the right hand rule, so that a positive rate turns the robot to the left.
    ///
    /// Units: radians/second
    pub angular_z: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VelCmd {
    pub fn new(linear_x: f64, angular_z: f64) -> Self {
        Self {
            linear_x,
            angular_z,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_vel_cmd_json() {
        let cmd = serde_json::from_str::<VelCmd>(r#"{"linear_x": 0.5, "angular_z": -0.25}"#).unwrap();
        assert_eq!(cmd, VelCmd::new(0.5, -0.25));

        assert!(serde_json::from_str::<VelCmd>(r#"{"linear_x": 0.5}"#).is_err());
    }
}
