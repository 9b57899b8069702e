//! # Lidar Equipment Messages
//!
//! Planar range scans as published by a 2D scanning lidar.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single sweep of a planar range sensor.
///
/// Reading `i` of `ranges` was taken at angle `angle_min + i * angle_increment`, with angles
/// following the right hand rule about the robot's Z+ (upwards) axis, so that zero is straight
/// ahead, negative angles are to the right and positive angles are to the left.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    /// Angle of the first reading.
    ///
    /// Units: radians
    pub angle_min: f64,

    /// Angle of the last reading.
    ///
    /// Units: radians
    pub angle_max: f64,

    /// Angular step between consecutive readings.
    ///
    /// Units: radians
    pub angle_increment: f64,

    /// Minimum valid range of the sensor.
    ///
    /// Units: meters
    pub range_min: f64,

    /// Maximum valid range of the sensor.
    ///
    /// Units: meters
    pub range_max: f64,

    /// Range readings ordered by increasing angle. Invalid readings may be reported as values
    /// outside `[range_min, range_max]`, or as non-finite values (`null` on the wire).
    ///
    /// Units: meters
    #[serde(with = "ranges_serde")]
    pub ranges: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// SERDE
// ------------------------------------------------------------------------------------------------

/// JSON has no representation for infinities or NaN, which sensors use for "no return", so these
/// are written as `null` and read back as NaN.
mod ranges_serde {
    use serde::{Deserialize, Deserializer, Serializer, ser::SerializeSeq};

    pub fn serialize<S>(ranges: &[f64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        let mut seq = serializer.serialize_seq(Some(ranges.len()))?;
        for r in ranges {
            if r.is_finite() {
                seq.serialize_element(&Some(*r))?;
            }
            else {
                seq.serialize_element(&None::<f64>)?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
    where
        D: Deserializer<'de>
    {
        let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|r| r.unwrap_or(std::f64::NAN)).collect())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scan_json() {
        let json = r#"{
            "angle_min": -1.5,
            "angle_max": 1.5,
            "angle_increment": 0.5,
            "range_min": 0.1,
            "range_max": 10.0,
            "ranges": [1.0, 2.0, null, 4.0, 5.0, 6.0, 7.0]
        }"#;

        let scan: LaserScan = serde_json::from_str(json).unwrap();

        assert_eq!(scan.ranges.len(), 7);
        assert!(scan.ranges[2].is_nan());
        assert_eq!(scan.ranges[3], 4.0);
        assert_eq!(scan.angle_increment, 0.5);

        // Infinite readings go out as null
        let mut scan = scan;
        scan.ranges[0] = std::f64::INFINITY;
        let out = serde_json::to_string(&scan).unwrap();
        assert!(out.contains("[null,2.0,null,4.0"));
    }
}
