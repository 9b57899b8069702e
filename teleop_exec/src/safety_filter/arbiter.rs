//! Command arbitration
//!
//! Combines the operator's desired command with the alarm state to give the command which is
//! actually sent to the base.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::vel::VelCmd;
use std::f64::consts::FRAC_PI_2;

use super::Alarm;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Factor the forward speed is divided by while the alarm is raised.
pub const LINEAR_ATTENUATION_FACTOR: f64 = 10.0;

/// Turn rate added to the desired command while the alarm is raised, turning away from the side
/// the obstacle is on.
///
/// Units: radians/second
pub const ANGULAR_BIAS_RADS: f64 = 10.0;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Correct the desired command given the alarm for this cycle.
///
/// With no alarm the desired command is returned unchanged. Otherwise the forward speed is
/// attenuated (keeping its sign) and a fixed turn is added: to the left (positive) for obstacles
/// right of centre, and to the right (negative) for obstacles dead ahead or to the left.
pub fn arbitrate(desired: VelCmd, alarm: &Alarm) -> VelCmd {
    let violation = match alarm {
        Alarm::Clear => return desired,
        Alarm::Triggered(v) => v,
    };

    let bias_rads = if violation.angle_rad < FRAC_PI_2 {
        ANGULAR_BIAS_RADS
    }
    else {
        -ANGULAR_BIAS_RADS
    };

    VelCmd {
        linear_x: desired.linear_x / LINEAR_ATTENUATION_FACTOR,
        angular_z: desired.angular_z + bias_rads,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::safety_filter::{Violation, Zone};

    fn alarm_at(angle_rad: f64) -> Alarm {
        Alarm::Triggered(Violation {
            index: 0,
            range_m: 0.1,
            threshold_m: 0.5,
            angle_rad,
            zone: Zone::CentralBand,
        })
    }

    #[test]
    fn test_clear_is_identity() {
        for desired in [
            VelCmd::new(1.0, 0.0),
            VelCmd::new(-0.3, 0.7),
            VelCmd::new(0.0, -2.0),
        ].iter() {
            assert_eq!(arbitrate(*desired, &Alarm::Clear), *desired);
        }
    }

    #[test]
    fn test_linear_attenuation() {
        let alarm = alarm_at(1.0);

        assert_eq!(arbitrate(VelCmd::new(1.0, 0.0), &alarm).linear_x, 1.0 / 10.0);
        assert_eq!(arbitrate(VelCmd::new(-0.5, 0.0), &alarm).linear_x, -0.5 / 10.0);
        assert_eq!(arbitrate(VelCmd::new(0.0, 0.0), &alarm).linear_x, 0.0);
    }

    #[test]
    fn test_angular_bias_sign() {
        let desired = VelCmd::new(1.0, 0.25);

        // Obstacle to the right, turn left
        assert_eq!(arbitrate(desired, &alarm_at(0.3)).angular_z, 10.25);
        assert_eq!(arbitrate(desired, &alarm_at(FRAC_PI_2 - 1e-9)).angular_z, 10.25);

        // Obstacle dead ahead or to the left, turn right
        assert_eq!(arbitrate(desired, &alarm_at(FRAC_PI_2)).angular_z, -9.75);
        assert_eq!(arbitrate(desired, &alarm_at(2.5)).angular_z, -9.75);
    }
}
