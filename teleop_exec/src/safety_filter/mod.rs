//! Safety filter module
//!
//! Checks each lidar scan for obstacles inside the robot's safety envelope and corrects the
//! operator's desired velocity command when one is found.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod arbiter;
mod eval;
mod params;
mod scan_geom;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use arbiter::*;
pub use eval::*;
pub use params::*;
pub use scan_geom::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during SafetyFilter operation.
#[derive(Debug, thiserror::Error)]
pub enum SafetyFilterError {
    #[error("The SafetyFilter has not been initialised")]
    NotInit,

    #[error("Invalid parameter {0}: expected a finite positive value, found {1}")]
    InvalidParam(&'static str, f64),

    #[error("Could not derive the scan geometry: {0}")]
    GeometryError(ScanGeomError),

    #[error("Could not evaluate the scan: {0}")]
    EvalError(EvalError),
}
