//! Scan geometry derivation and caching
//!
//! The lidar is fixed to the robot, so the indices of the readings pointing straight ahead and
//! perpendicular to either side only need to be found once. They are derived from the first scan
//! and reused for every scan after that.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::lidar::LaserScan;
use log::{debug, info};
use serde::Serialize;
use std::f64::consts::FRAC_PI_2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Indices into a scan's readings for the directions the safety sweep cares about.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanGeometry {
    /// Index of the reading straight ahead (angle 0).
    pub front_index: usize,

    /// Index of the reading perpendicular to the right (angle -pi/2). The sweep starts here.
    pub right_index: usize,

    /// Index of the reading perpendicular to the left (angle +pi/2). The sweep ends here.
    pub left_index: usize,

    /// Angle of the first reading of the scan the geometry was derived from.
    ///
    /// Units: radians
    pub angle_min_rad: f64,

    /// Angular step of the scan the geometry was derived from.
    ///
    /// Units: radians
    pub angle_increment_rad: f64,
}

/// Holds the geometry once it has been derived.
///
/// The geometry is set at most once, after which it is never recomputed even if later scans
/// report different angular parameters.
#[derive(Debug, Default)]
pub struct ScanGeometryCache {
    geometry: Option<ScanGeometry>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a scan cannot be used to derive the sweep geometry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanGeomError {
    #[error("The scan's angle_min ({angle_min}) or angle_increment ({angle_increment}) is not finite")]
    NonFinite {
        angle_min: f64,
        angle_increment: f64
    },

    #[error("The scan's angle_increment must be positive, found {0}")]
    NonPositiveIncrement(f64),

    #[error(
        "The scan starts at {angle_min} rad and does not reach the right perpendicular (-pi/2)"
    )]
    DoesNotCoverRight {
        angle_min: f64
    },

    #[error(
        "The scan has {len} readings but reaching the left perpendicular (+pi/2) needs {required}"
    )]
    DoesNotCoverLeft {
        len: usize,
        required: f64
    },

    #[error("The scan geometry has already been initialised")]
    AlreadyInitialised,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScanGeometry {
    /// Derive the geometry from a scan.
    ///
    /// Fails if the scan's angular span does not contain both perpendiculars, rather than
    /// producing indices outside the readings.
    pub fn from_scan(scan: &LaserScan) -> Result<Self, ScanGeomError> {
        let angle_min = scan.angle_min;
        let angle_increment = scan.angle_increment;

        if !angle_min.is_finite() || !angle_increment.is_finite() {
            return Err(ScanGeomError::NonFinite {
                angle_min,
                angle_increment
            })
        }

        if angle_increment <= 0.0 {
            return Err(ScanGeomError::NonPositiveIncrement(angle_increment))
        }

        let index_of = |angle: f64| ((angle - angle_min) / angle_increment).round();

        let right = index_of(-FRAC_PI_2);
        let front = index_of(0.0);
        let left = index_of(FRAC_PI_2);

        if right < 0.0 {
            return Err(ScanGeomError::DoesNotCoverRight { angle_min })
        }

        // Compare as floats so a huge index can't wrap on the cast
        if left >= scan.ranges.len() as f64 {
            return Err(ScanGeomError::DoesNotCoverLeft {
                len: scan.ranges.len(),
                required: left + 1.0
            })
        }

        Ok(Self {
            front_index: front as usize,
            right_index: right as usize,
            left_index: left as usize,
            angle_min_rad: angle_min,
            angle_increment_rad: angle_increment,
        })
    }

    /// Angle of the given reading in the sweep frame, where 0 is the right perpendicular, pi/2 is
    /// straight ahead and pi is the left perpendicular.
    ///
    /// Units: radians
    pub fn sweep_angle(&self, index: usize) -> f64 {
        self.angle_min_rad + (index as f64) * self.angle_increment_rad + FRAC_PI_2
    }

    /// Minimum number of readings a scan must contain to be swept with this geometry.
    pub fn required_len(&self) -> usize {
        self.left_index + 1
    }

    /// Number of readings in the sweep.
    pub fn sector_len(&self) -> usize {
        self.left_index - self.right_index + 1
    }
}

impl ScanGeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached geometry, or `None` if it hasn't been derived yet.
    pub fn get(&self) -> Option<&ScanGeometry> {
        self.geometry.as_ref()
    }

    pub fn is_initialised(&self) -> bool {
        self.geometry.is_some()
    }

    /// Explicitly set the geometry.
    ///
    /// Returns an error if the geometry has already been set, the existing geometry is kept.
    pub fn set(&mut self, geometry: ScanGeometry) -> Result<&ScanGeometry, ScanGeomError> {
        if self.geometry.is_some() {
            return Err(ScanGeomError::AlreadyInitialised)
        }

        info!(
            "Scan geometry initialised: front = {}, right = {}, left = {} ({} readings swept)",
            geometry.front_index,
            geometry.right_index,
            geometry.left_index,
            geometry.sector_len()
        );

        Ok(&*self.geometry.get_or_insert(geometry))
    }

    /// Derive the geometry from this scan if it hasn't been derived yet, otherwise return the
    /// cached geometry and ignore the scan.
    ///
    /// If derivation fails nothing is cached, so the next scan will be tried.
    pub fn ensure_initialized(
        &mut self,
        scan: &LaserScan
    ) -> Result<&ScanGeometry, ScanGeomError> {
        if self.geometry.is_none() {
            debug!(
                "Deriving scan geometry from scan: angle_min = {}, angle_max = {}, \
                angle_increment = {}, {} readings",
                scan.angle_min,
                scan.angle_max,
                scan.angle_increment,
                scan.ranges.len()
            );

            let geometry = ScanGeometry::from_scan(scan)?;
            return self.set(geometry)
        }

        // Checked above, the geometry is always present here
        self.geometry.as_ref().ok_or(ScanGeomError::AlreadyInitialised)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    /// Full circle scan at half degree resolution starting behind the robot.
    fn full_scan() -> LaserScan {
        LaserScan {
            angle_min: -PI,
            angle_max: PI - PI / 360.0,
            angle_increment: PI / 360.0,
            range_min: 0.05,
            range_max: 10.0,
            ranges: vec![10.0; 720],
        }
    }

    #[test]
    fn test_from_scan() {
        let geom = ScanGeometry::from_scan(&full_scan()).unwrap();

        assert_eq!(geom.right_index, 180);
        assert_eq!(geom.front_index, 360);
        assert_eq!(geom.left_index, 540);
        assert_eq!(geom.required_len(), 541);
        assert_eq!(geom.sector_len(), 361);

        assert!(geom.sweep_angle(geom.right_index).abs() < 1e-9);
        assert!((geom.sweep_angle(geom.front_index) - FRAC_PI_2).abs() < 1e-9);
        assert!((geom.sweep_angle(geom.left_index) - PI).abs() < 1e-9);
    }

    #[test]
    fn test_indices_are_rounded() {
        // One degree steps, -pi/2 lands two thirds of a step past index 89 so rounds up
        let step = PI / 180.0;
        let scan = LaserScan {
            angle_min: -PI / 2.0 - 89.67 * step,
            angle_increment: step,
            ranges: vec![1.0; 400],
            ..full_scan()
        };

        let geom = ScanGeometry::from_scan(&scan).unwrap();
        assert_eq!(geom.right_index, 90);
        assert_eq!(geom.front_index, 180);
        assert_eq!(geom.left_index, 270);
    }

    #[test]
    fn test_narrow_fov() {
        // +/- 30 degrees only
        let scan = LaserScan {
            angle_min: -PI / 6.0,
            angle_max: PI / 6.0,
            angle_increment: PI / 180.0,
            ranges: vec![1.0; 61],
            ..full_scan()
        };

        assert_eq!(
            ScanGeometry::from_scan(&scan),
            Err(ScanGeomError::DoesNotCoverRight { angle_min: -PI / 6.0 })
        );

        // Covers the right side but stops straight ahead
        let scan = LaserScan {
            angle_min: -PI,
            angle_max: 0.0,
            angle_increment: PI / 180.0,
            ranges: vec![1.0; 181],
            ..full_scan()
        };

        match ScanGeometry::from_scan(&scan) {
            Err(ScanGeomError::DoesNotCoverLeft { len: 181, required }) =>
                assert_eq!(required, 271.0),
            r => panic!("Expected DoesNotCoverLeft, got {:?}", r)
        }
    }

    #[test]
    fn test_bad_increment() {
        let mut scan = full_scan();

        scan.angle_increment = 0.0;
        assert_eq!(
            ScanGeometry::from_scan(&scan),
            Err(ScanGeomError::NonPositiveIncrement(0.0))
        );

        scan.angle_increment = -0.01;
        assert_eq!(
            ScanGeometry::from_scan(&scan),
            Err(ScanGeomError::NonPositiveIncrement(-0.01))
        );

        scan.angle_increment = std::f64::NAN;
        assert!(matches!(
            ScanGeometry::from_scan(&scan),
            Err(ScanGeomError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_cache_computes_once() {
        let mut cache = ScanGeometryCache::new();
        assert!(!cache.is_initialised());
        assert!(cache.get().is_none());

        let first = *cache.ensure_initialized(&full_scan()).unwrap();
        assert!(cache.is_initialised());

        // A later scan with a different layout doesn't change the cached geometry
        let other = LaserScan {
            angle_min: -PI / 2.0,
            angle_increment: PI / 90.0,
            ranges: vec![1.0; 91],
            ..full_scan()
        };
        assert_eq!(*cache.ensure_initialized(&other).unwrap(), first);
        assert_eq!(cache.get(), Some(&first));

        // Nor can it be overwritten explicitly
        let other_geom = ScanGeometry::from_scan(&other).unwrap();
        assert_eq!(cache.set(other_geom), Err(ScanGeomError::AlreadyInitialised));
        assert_eq!(cache.get(), Some(&first));
    }

    #[test]
    fn test_cache_failed_init_retries() {
        let mut cache = ScanGeometryCache::new();

        let mut bad = full_scan();
        bad.angle_increment = 0.0;
        assert!(cache.ensure_initialized(&bad).is_err());
        assert!(!cache.is_initialised());

        assert_eq!(cache.ensure_initialized(&full_scan()).unwrap().front_index, 360);
    }
}
