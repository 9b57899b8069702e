//! Safety evaluation of a scan
//!
//! The robot is treated as a disk of radius `R` which must keep at least `D` (the minimum safe
//! distance) between its body and any obstacle. The readings between the right and left
//! perpendiculars are swept from right to left, in the sweep frame where an angle `a` of 0 points
//! right, pi/2 points ahead and pi points left. Each angle falls into one of three zones:
//!
//! | Zone         | Angles                            | Minimum safe range |
//! |--------------|-----------------------------------|--------------------|
//! | Right cone   | `a < atan(D/R)`                   | `R / cos(a)`       |
//! | Central band | `atan(D/R) <= a <= pi - atan(D/R)`| `D / sin(a)`       |
//! | Left cone    | `a > pi - atan(D/R)`              | `R / cos(pi - a)`  |
//!
//! Both formulas give `sqrt(R^2 + D^2)` at the zone boundaries.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::lidar::LaserScan;
use serde::Serialize;
use std::f64::consts::{FRAC_PI_2, PI};

// Internal
use super::{Params, ScanGeometry};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A reading that came closer than its zone allows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Violation {
    /// Index of the reading in the scan.
    pub index: usize,

    /// The measured range.
    ///
    /// Units: meters
    pub range_m: f64,

    /// The minimum safe range at this angle.
    ///
    /// Units: meters
    pub threshold_m: f64,

    /// Angle of the reading in the sweep frame (0 right, pi/2 ahead, pi left).
    ///
    /// Units: radians
    pub angle_rad: f64,

    /// Zone the reading fell in.
    pub zone: Zone,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Angular zones of the sweep, each with its own minimum safe range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Zone {
    RightCone,
    CentralBand,
    LeftCone,
}

/// Result of evaluating one scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Alarm {
    /// No reading in the sweep is closer than allowed.
    Clear,

    /// The first reading found, sweeping right to left, which is closer than allowed.
    Triggered(Violation),
}

/// Errors which can occur while evaluating a scan.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error(
        "The scan has {len} readings but the cached geometry needs at least {required}, was the \
        scan produced by a different sensor?"
    )]
    RangesTooShort {
        len: usize,
        required: usize
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Zone {
    /// Find the zone of the given sweep angle.
    pub fn classify(angle_rad: f64, params: &Params) -> Self {
        let boundary = params.zone_boundary_rad();

        if angle_rad < boundary {
            Zone::RightCone
        }
        else if angle_rad > PI - boundary {
            Zone::LeftCone
        }
        else {
            Zone::CentralBand
        }
    }

    /// Minimum safe range for a reading at the given sweep angle, assuming it lies in this zone.
    ///
    /// Units: meters
    pub fn min_safe_range_m(&self, angle_rad: f64, params: &Params) -> f64 {
        match self {
            Zone::RightCone => params.robot_radius_m / angle_rad.cos(),
            Zone::CentralBand => params.min_safe_dist_m / angle_rad.sin(),
            Zone::LeftCone => params.robot_radius_m / (PI - angle_rad).cos(),
        }
    }
}

impl Alarm {
    pub fn is_triggered(&self) -> bool {
        matches!(self, Alarm::Triggered(_))
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Alarm::Triggered(v) => Some(v),
            Alarm::Clear => None,
        }
    }
}

impl Violation {
    /// Bearing of the violation relative to straight ahead, positive to the left.
    ///
    /// Units: radians
    pub fn bearing_rad(&self) -> f64 {
        self.angle_rad - FRAC_PI_2
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Minimum safe range at the given sweep angle, along with its zone.
///
/// Units: meters
pub fn min_safe_range_m(angle_rad: f64, params: &Params) -> (Zone, f64) {
    let zone = Zone::classify(angle_rad, params);
    (zone, zone.min_safe_range_m(angle_rad, params))
}

/// Sweep the scan from the right perpendicular to the left perpendicular and report the first
/// reading which is closer than its zone allows.
///
/// Only readings between `geometry.right_index` and `geometry.left_index` (inclusive) are
/// examined. Sweeping stops at the first violation, which is not necessarily the closest one.
/// NaN readings never raise the alarm.
pub fn evaluate(
    scan: &LaserScan,
    geometry: &ScanGeometry,
    params: &Params
) -> Result<Alarm, EvalError> {
    let sector = scan.ranges
        .get(geometry.right_index..=geometry.left_index)
        .ok_or(EvalError::RangesTooShort {
            len: scan.ranges.len(),
            required: geometry.required_len()
        })?;

    for (offset, &range_m) in sector.iter().enumerate() {
        let index = geometry.right_index + offset;
        let angle_rad = geometry.sweep_angle(index);
        let (zone, threshold_m) = min_safe_range_m(angle_rad, params);

        if range_m < threshold_m {
            return Ok(Alarm::Triggered(Violation {
                index,
                range_m,
                threshold_m,
                angle_rad,
                zone,
            }))
        }
    }

    Ok(Alarm::Clear)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const TOL: f64 = 1e-9;

    fn params() -> Params {
        Params {
            min_safe_dist_m: 0.5,
            robot_radius_m: 0.15,
        }
    }

    /// Full circle half degree scan with nothing in range.
    fn clear_scan() -> LaserScan {
        LaserScan {
            angle_min: -PI,
            angle_max: PI - PI / 360.0,
            angle_increment: PI / 360.0,
            range_min: 0.05,
            range_max: 10.0,
            ranges: vec![10.0; 720],
        }
    }

    fn geometry() -> ScanGeometry {
        ScanGeometry::from_scan(&clear_scan()).unwrap()
    }

    #[test]
    fn test_classify() {
        let p = params();
        let boundary = p.zone_boundary_rad();

        assert_eq!(Zone::classify(0.0, &p), Zone::RightCone);
        assert_eq!(Zone::classify(boundary - 1e-6, &p), Zone::RightCone);
        assert_eq!(Zone::classify(boundary, &p), Zone::CentralBand);
        assert_eq!(Zone::classify(FRAC_PI_2, &p), Zone::CentralBand);
        assert_eq!(Zone::classify(PI - boundary, &p), Zone::CentralBand);
        assert_eq!(Zone::classify(PI - boundary + 1e-6, &p), Zone::LeftCone);
        assert_eq!(Zone::classify(PI, &p), Zone::LeftCone);
    }

    #[test]
    fn test_threshold_continuity() {
        let p = params();
        let boundary = p.zone_boundary_rad();
        let expected = (0.15f64.powi(2) + 0.5f64.powi(2)).sqrt();

        let right = Zone::RightCone.min_safe_range_m(boundary, &p);
        let central = Zone::CentralBand.min_safe_range_m(boundary, &p);
        assert!((right - central).abs() < TOL);
        assert!((right - expected).abs() < TOL);

        let left = Zone::LeftCone.min_safe_range_m(PI - boundary, &p);
        let central = Zone::CentralBand.min_safe_range_m(PI - boundary, &p);
        assert!((left - central).abs() < TOL);
        assert!((left - expected).abs() < TOL);
    }

    #[test]
    fn test_thresholds() {
        let p = params();

        // Right and left perpendiculars only need the body radius
        assert!((min_safe_range_m(0.0, &p).1 - 0.15).abs() < TOL);
        assert!((min_safe_range_m(PI, &p).1 - 0.15).abs() < TOL);

        // Straight ahead needs the full clearance
        let (zone, threshold) = min_safe_range_m(FRAC_PI_2, &p);
        assert_eq!(zone, Zone::CentralBand);
        assert!((threshold - 0.5).abs() < TOL);
    }

    #[test]
    fn test_clear() {
        assert_eq!(
            evaluate(&clear_scan(), &geometry(), &params()),
            Ok(Alarm::Clear)
        );
    }

    #[test]
    fn test_readings_just_outside_threshold() {
        let p = params();
        let geom = geometry();
        let mut scan = clear_scan();

        // Every reading in the sweep sits just beyond its own threshold
        for i in geom.right_index..=geom.left_index {
            scan.ranges[i] = min_safe_range_m(geom.sweep_angle(i), &p).1 + 1e-6;
        }

        assert_eq!(evaluate(&scan, &geom, &p), Ok(Alarm::Clear));
    }

    #[test]
    fn test_single_violation() {
        let p = params();
        let geom = geometry();

        // 10 degrees forward of the right perpendicular, in the right cone
        let mut scan = clear_scan();
        scan.ranges[200] = 0.1;

        let alarm = evaluate(&scan, &geom, &p).unwrap();
        let v = alarm.violation().unwrap();

        assert!(alarm.is_triggered());
        assert_eq!(v.index, 200);
        assert_eq!(v.range_m, 0.1);
        assert_eq!(v.zone, Zone::RightCone);
        assert_eq!(v.angle_rad, geom.sweep_angle(200));
        assert!((v.angle_rad - PI / 18.0).abs() < TOL);
        assert!((v.threshold_m - 0.15 / (PI / 18.0).cos()).abs() < TOL);
    }

    #[test]
    fn test_first_violation_wins() {
        let p = params();
        let geom = geometry();

        // The left reading is much closer but the right one is found first
        let mut scan = clear_scan();
        scan.ranges[300] = 0.29;
        scan.ranges[500] = 0.01;

        let v = *evaluate(&scan, &geom, &p).unwrap().violation().unwrap();
        assert_eq!(v.index, 300);
        assert_eq!(v.range_m, 0.29);

        // With only the left one it is reported
        scan.ranges[300] = 10.0;
        let v = *evaluate(&scan, &geom, &p).unwrap().violation().unwrap();
        assert_eq!(v.index, 500);
        assert_eq!(v.zone, Zone::LeftCone);
    }

    #[test]
    fn test_violation_bearing() {
        let p = params();
        let geom = geometry();

        // 30 degrees left of straight ahead
        let mut scan = clear_scan();
        scan.ranges[420] = 0.2;

        let v = *evaluate(&scan, &geom, &p).unwrap().violation().unwrap();
        assert_eq!(v.index, 420);
        assert!((v.bearing_rad() - PI / 6.0).abs() < TOL);

        // 80 degrees right of straight ahead
        let mut scan = clear_scan();
        scan.ranges[200] = 0.1;

        let v = *evaluate(&scan, &geom, &p).unwrap().violation().unwrap();
        assert!((v.bearing_rad() + 4.0 * PI / 9.0).abs() < TOL);
    }

    #[test]
    fn test_outside_sector_ignored() {
        let mut scan = clear_scan();

        // Behind the robot on both sides
        scan.ranges[0] = 0.01;
        scan.ranges[179] = 0.01;
        scan.ranges[541] = 0.01;
        scan.ranges[719] = 0.01;

        assert_eq!(evaluate(&scan, &geometry(), &params()), Ok(Alarm::Clear));
    }

    #[test]
    fn test_nan_never_triggers() {
        let mut scan = clear_scan();
        scan.ranges[360] = std::f64::NAN;

        assert_eq!(evaluate(&scan, &geometry(), &params()), Ok(Alarm::Clear));
    }

    #[test]
    fn test_ranges_too_short() {
        let mut scan = clear_scan();
        scan.ranges.truncate(540);

        assert_eq!(
            evaluate(&scan, &geometry(), &params()),
            Err(EvalError::RangesTooShort { len: 540, required: 541 })
        );

        // Exactly long enough is fine
        scan.ranges.push(10.0);
        assert_eq!(evaluate(&scan, &geometry(), &params()), Ok(Alarm::Clear));
    }
}
