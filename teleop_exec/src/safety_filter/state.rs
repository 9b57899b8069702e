//! Implementations for the SafetyFilter state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::{lidar::LaserScan, vel::VelCmd};
use log::{info, trace, warn};
use serde::Serialize;

// Internal
use super::{
    arbitrate, evaluate,
    Alarm, Params, SafetyFilterError,
    ScanGeometry, ScanGeometryCache};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Safety filter module state
#[derive(Default)]
pub struct SafetyFilter {
    params: Option<Params>,

    geometry: ScanGeometryCache,

    pub(crate) report: StatusReport,
}

/// Input data to the SafetyFilter.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    /// The scan to check for this cycle.
    pub scan: LaserScan,

    /// The most recent desired command from the operator.
    pub des_vel: VelCmd,

    /// Time since the desired command was received, `None` if no command has been received.
    ///
    /// Units: seconds
    pub des_vel_age_s: Option<f64>,
}

/// Status report for SafetyFilter processing.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    /// The alarm raised by this cycle's scan.
    pub alarm: Alarm,

    /// True if the command was modified this cycle.
    pub cmd_corrected: bool,

    /// Age of the desired command used this cycle.
    ///
    /// Units: seconds
    pub des_vel_age_s: Option<f64>,
}

impl Default for StatusReport {
    fn default() -> Self {
        Self {
            alarm: Alarm::Clear,
            cmd_corrected: false,
            des_vel_age_s: None,
        }
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for SafetyFilter {
    type InitData = Params;
    type InitError = SafetyFilterError;

    type InputData = InputData;
    type OutputData = VelCmd;
    type StatusReport = StatusReport;
    type ProcError = SafetyFilterError;

    /// Initialise the SafetyFilter module.
    ///
    /// The scan geometry is not known yet, it is set either through
    /// `init_geometry` or from the first scan passed to `proc`.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.validate()?;

        info!(
            "SafetyFilter parameters: min safe distance = {} m, robot radius = {} m, \
            zone boundary = {:.4} rad",
            init_data.min_safe_dist_m,
            init_data.robot_radius_m,
            init_data.zone_boundary_rad()
        );

        self.params = Some(init_data);

        Ok(())
    }

    /// Perform cyclic processing of the SafetyFilter.
    ///
    /// On error no output is produced for this cycle, and neither the
    /// parameters nor the cached geometry are changed.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        let params = self.params.ok_or(SafetyFilterError::NotInit)?;

        let geometry = self.geometry
            .ensure_initialized(&input_data.scan)
            .map_err(SafetyFilterError::GeometryError)?;

        let alarm = evaluate(&input_data.scan, geometry, &params)
            .map_err(SafetyFilterError::EvalError)?;

        let output = arbitrate(input_data.des_vel, &alarm);

        if let Alarm::Triggered(v) = alarm {
            warn!("DANGER, obstacle inside the safety envelope!");
            info!("    Distance: {:.3} m (minimum {:.3} m)", v.range_m, v.threshold_m);
            info!("    Direction: {:.3} rad ({:?})", v.bearing_rad(), v.zone);
        }

        trace!(
            "SafetyFilter output: desired {:?} -> output {:?}",
            input_data.des_vel,
            output
        );

        self.report = StatusReport {
            alarm,
            cmd_corrected: output != input_data.des_vel,
            des_vel_age_s: input_data.des_vel_age_s,
        };

        Ok((output, self.report))
    }
}

impl SafetyFilter {
    /// Derive the scan geometry from the given scan.
    ///
    /// This is the explicit initialisation step for the geometry. It can only
    /// succeed once, later calls return `ScanGeomError::AlreadyInitialised`.
    pub fn init_geometry(
        &mut self,
        scan: &LaserScan
    ) -> Result<&ScanGeometry, SafetyFilterError> {
        let geometry = ScanGeometry::from_scan(scan)
            .map_err(SafetyFilterError::GeometryError)?;

        self.geometry
            .set(geometry)
            .map_err(SafetyFilterError::GeometryError)
    }

    /// Get the scan geometry, if it has been derived.
    pub fn geometry(&self) -> Option<&ScanGeometry> {
        self.geometry.get()
    }

    /// Get the parameters, if the module has been initialised.
    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::safety_filter::{EvalError, ScanGeomError, Zone};
    use std::f64::consts::{FRAC_PI_2, PI};

    fn params() -> Params {
        Params {
            min_safe_dist_m: 0.5,
            robot_radius_m: 0.15,
        }
    }

    fn scan(ranges: Vec<f64>) -> LaserScan {
        LaserScan {
            angle_min: -PI,
            angle_max: PI - PI / 360.0,
            angle_increment: PI / 360.0,
            range_min: 0.05,
            range_max: 10.0,
            ranges,
        }
    }

    fn init_filter() -> SafetyFilter {
        let mut filter = SafetyFilter::default();
        filter.init(params()).unwrap();
        filter
    }

    #[test]
    fn test_not_init() {
        let mut filter = SafetyFilter::default();
        let input = InputData {
            scan: scan(vec![10.0; 720]),
            des_vel: VelCmd::new(1.0, 0.0),
            des_vel_age_s: None,
        };

        assert!(matches!(filter.proc(&input), Err(SafetyFilterError::NotInit)));
        assert!(filter.geometry().is_none());
    }

    #[test]
    fn test_init_rejects_bad_params() {
        let mut filter = SafetyFilter::default();

        let bad = Params {
            min_safe_dist_m: -0.5,
            ..params()
        };
        assert!(matches!(
            filter.init(bad),
            Err(SafetyFilterError::InvalidParam("min_safe_dist_m", _))
        ));
        assert!(filter.params().is_none());
    }

    #[test]
    fn test_obstacle_ahead() {
        let mut filter = init_filter();

        let mut ranges = vec![10.0; 720];
        ranges[360] = 0.3;

        let (output, report) = filter.proc(&InputData {
            scan: scan(ranges),
            des_vel: VelCmd::new(1.0, 0.0),
            des_vel_age_s: None,
        }).unwrap();

        let v = report.alarm.violation().unwrap();
        assert_eq!(v.index, 360);
        assert_eq!(v.zone, Zone::CentralBand);
        assert!((v.angle_rad - FRAC_PI_2).abs() < 1e-9);

        // Which way it turns depends on which side of pi/2 the reading's angle rounds to
        assert_eq!(output.linear_x, 0.1);
        assert_eq!(output.angular_z.abs(), 10.0);
        assert_eq!(output.angular_z > 0.0, v.angle_rad < FRAC_PI_2);
        assert!(report.cmd_corrected);
    }

    #[test]
    fn test_no_obstacles() {
        let mut filter = init_filter();
        let des_vel = VelCmd::new(0.8, -0.3);

        let (output, report) = filter.proc(&InputData {
            scan: scan(vec![10.0; 720]),
            des_vel,
            des_vel_age_s: None,
        }).unwrap();

        assert_eq!(output, des_vel);
        assert_eq!(report.alarm, Alarm::Clear);
        assert!(!report.cmd_corrected);
    }

    #[test]
    fn test_short_scan_after_init() {
        let mut filter = init_filter();
        let des_vel = VelCmd::new(0.5, 0.0);

        // First scan sets the geometry
        let first = scan(vec![10.0; 720]);
        let geometry = *filter.init_geometry(&first).unwrap();

        // A shorter scan can't be swept with that geometry
        let result = filter.proc(&InputData {
            scan: scan(vec![10.0; 300]),
            des_vel,
            des_vel_age_s: None,
        });
        match result {
            Err(SafetyFilterError::EvalError(EvalError::RangesTooShort { len, required })) => {
                assert_eq!(len, 300);
                assert_eq!(required, 541);
            },
            r => panic!("Expected RangesTooShort, got {:?}", r)
        }

        // Nothing was changed, the next good scan is processed as normal
        assert_eq!(filter.geometry(), Some(&geometry));
        assert_eq!(filter.params(), Some(&params()));

        let (output, _) = filter.proc(&InputData {
            scan: first,
            des_vel,
            des_vel_age_s: None,
        }).unwrap();
        assert_eq!(output, des_vel);
    }

    #[test]
    fn test_geometry_from_first_scan() {
        let mut filter = init_filter();

        // Narrow scan can't initialise the geometry
        let narrow = LaserScan {
            angle_min: -0.5,
            angle_max: 0.5,
            angle_increment: 0.01,
            range_min: 0.05,
            range_max: 10.0,
            ranges: vec![10.0; 101],
        };
        assert!(matches!(
            filter.proc(&InputData {
                scan: narrow,
                des_vel: VelCmd::default(),
                des_vel_age_s: None,
            }),
            Err(SafetyFilterError::GeometryError(ScanGeomError::DoesNotCoverRight { .. }))
        ));
        assert!(filter.geometry().is_none());

        // The next valid scan sets it lazily
        filter.proc(&InputData {
            scan: scan(vec![10.0; 720]),
            des_vel: VelCmd::default(),
            des_vel_age_s: None,
        }).unwrap();
        assert_eq!(filter.geometry().map(|g| g.front_index), Some(360));

        // And explicit initialisation is now refused
        assert!(matches!(
            filter.init_geometry(&scan(vec![10.0; 720])),
            Err(SafetyFilterError::GeometryError(ScanGeomError::AlreadyInitialised))
        ));
    }

    #[test]
    fn test_report_serialises() {
        let mut filter = init_filter();

        let mut ranges = vec![10.0; 720];
        ranges[200] = 0.1;

        let (_, report) = filter.proc(&InputData {
            scan: scan(ranges),
            des_vel: VelCmd::new(1.0, 0.0),
            des_vel_age_s: Some(0.25),
        }).unwrap();

        assert_eq!(report.des_vel_age_s, Some(0.25));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"Triggered\""));
        assert!(json.contains("\"RightCone\""));
        assert!(json.contains("\"cmd_corrected\":true"));
        assert!(json.contains("\"des_vel_age_s\":0.25"));
    }
}
