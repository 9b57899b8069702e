//! # Processing Cycle
//!
//! One scan in, at most one corrected command out. The executable's main loop calls
//! [`run_cycle`] once per recieved scan.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::lidar::LaserScan;
use log::trace;

use crate::{
    cmd_vel_server::{CmdVelServer, CmdVelServerError},
    des_vel::DesVelRegister,
    safety_filter::{InputData, SafetyFilter, SafetyFilterError, StatusReport},
};
use util::module::State;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Counters kept across cycles.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleStats {
    pub num_cycles: u64,
    pub num_alarms: u64,
    pub num_cmds_sent: u64,
    pub num_proc_errors: u64,
    pub num_send_errors: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("SafetyFilter processing failed, no command sent: {0}")]
    ProcError(SafetyFilterError),

    #[error("Could not publish the corrected command: {0}")]
    SendError(CmdVelServerError),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Process one scan against the latest desired command and publish the result.
///
/// Exactly one command is published if processing succeeds, and none if it fails.
pub fn run_cycle(
    safety_filter: &mut SafetyFilter,
    register: &DesVelRegister,
    scan: LaserScan,
    cmd_vel_server: &CmdVelServer,
    stats: &mut CycleStats
) -> Result<StatusReport, CycleError> {
    // Nothing received yet is the zero command
    let des_vel = register.snapshot();

    let input = InputData {
        scan,
        des_vel: des_vel.map(|h| h.cmd).unwrap_or_default(),
        des_vel_age_s: des_vel.map(|h| h.age_s()),
    };

    stats.num_cycles += 1;

    let (output, report) = safety_filter.proc(&input).map_err(|e| {
        stats.num_proc_errors += 1;
        CycleError::ProcError(e)
    })?;

    if report.alarm.is_triggered() {
        stats.num_alarms += 1;
    }

    trace!(
        "SafetyFilter status: {}",
        serde_json::to_string(&report).unwrap_or_default()
    );

    cmd_vel_server.send(&output).map_err(|e| {
        stats.num_send_errors += 1;
        CycleError::SendError(e)
    })?;

    stats.num_cmds_sent += 1;

    Ok(report)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
