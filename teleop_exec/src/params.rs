//! # Teleoperation Executable Parameters
//!
//! This module provide parameters for the teleoperation executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeleopExecParams {

    /// Network endpoint the operator's desired velocity commands are published on
    pub des_vel_endpoint: String,

    /// Network endpoint the lidar scans are published on
    pub scan_endpoint: String,

    /// Network endpoint to publish the corrected velocity commands on
    pub cmd_vel_endpoint: String,

    /// Receive timeout on the scan socket, bounding how long the main loop
    /// waits for a scan before checking the connection again.
    ///
    /// Units: milliseconds
    #[serde(default = "default_scan_recv_timeout_ms")]
    pub scan_recv_timeout_ms: i32,
}

fn default_scan_recv_timeout_ms() -> i32 {
    500
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_params() {
        let p: TeleopExecParams = util::params::from_str(r#"
            des_vel_endpoint = "tcp://localhost:6000"
            scan_endpoint = "tcp://localhost:6001"
            cmd_vel_endpoint = "tcp://*:6002"
        "#).unwrap();

        assert_eq!(p.scan_endpoint, "tcp://localhost:6001");
        assert_eq!(p.scan_recv_timeout_ms, 500);
    }
}
