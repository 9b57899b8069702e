//! Main teleoperation executable entry point.
//! 
//! # Architecture
//! 
//! The general execution methodology consists of:
//! 
//!     - Initialise the safety filter and the network
//!     - Wait for the first valid scan and derive the scan geometry from it
//!     - Main loop, once per recieved scan:
//!         - Read the latest desired velocity (recieved in the background)
//!         - Safety filter processing
//!         - Publish the corrected command
//! 
//! If a scan cannot be processed no command is published for it, and the
//! loop moves on to the next scan.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::WrapErr};
use comms_if::{eqpt::lidar::LaserScan, net::zmq};
use log::{debug, error, info, trace, warn};
use structopt::StructOpt;

// Internal
use teleop_lib::{
    cmd_vel_server::CmdVelServer,
    cycle::{run_cycle, CycleStats},
    des_vel::DesVelRegister,
    des_vel_client::DesVelClient,
    params::TeleopExecParams,
    safety_filter::{self, SafetyFilter},
    scan_client::{ScanClient, ScanClientError},
};
use util::{
    host,
    module::State,
    logger::{logger_init, parse_level, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of cycles between summary log messages.
const SUMMARY_PERIOD_CYCLES: u64 = 100;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Command line options for the executable.
#[derive(Debug, StructOpt)]
#[structopt(
    name = "teleop_exec",
    about = "Safety filter between an operator's velocity commands and the robot base"
)]
struct Opts {
    /// Endpoint of the lidar scan publisher, overrides the one in
    /// `teleop_exec.toml`.
    #[structopt(short = "n", long)]
    scan_endpoint: Option<String>,

    /// Minimum level of log messages, must be at least `info`.
    #[structopt(short = "l", long, default_value = "debug", parse(try_from_str = parse_level))]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "teleop_exec", 
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Smart Teleoperation Executable\n");
    let host_info = host::get_uname().wrap_err("Failed to get host information")?;
    info!(
        "Running on: {} ({} {}, {})",
        host_info.nodename,
        host_info.sysname,
        host_info.release,
        host_info.machine
    );
    info!("Session directory: {:?}\n", session.session_root);

    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let mut exec_params: TeleopExecParams = util::params::load(
        "teleop_exec.toml"
    ).wrap_err("Could not load exec params")?;

    if let Some(endpoint) = opts.scan_endpoint {
        info!("Scan endpoint overriden from the command line: {}", endpoint);
        exec_params.scan_endpoint = endpoint;
    }

    let safety_params: safety_filter::Params = util::params::load(
        "safety.toml"
    ).wrap_err("Could not load safety params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut safety_filter = SafetyFilter::default();
    safety_filter.init(safety_params)
        .wrap_err("Failed to initialise SafetyFilter")?;
    info!("SafetyFilter init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();

    let des_vel_client = {
        let c = DesVelClient::new(
            &zmq_ctx,
            &exec_params.des_vel_endpoint,
            DesVelRegister::new()
        ).wrap_err("Failed to initialise DesVelClient")?;
        info!("DesVelClient initialised on {}", exec_params.des_vel_endpoint);
        c
    };

    let scan_client = {
        let c = ScanClient::new(
            &zmq_ctx,
            &exec_params.scan_endpoint,
            exec_params.scan_recv_timeout_ms
        ).wrap_err("Failed to initialise ScanClient")?;
        info!("ScanClient initialised on {}", exec_params.scan_endpoint);
        c
    };

    let cmd_vel_server = {
        let s = CmdVelServer::new(&zmq_ctx, &exec_params.cmd_vel_endpoint)
            .wrap_err("Failed to initialise CmdVelServer")?;
        info!("CmdVelServer initialised on {}", exec_params.cmd_vel_endpoint);
        s
    };

    info!("Network initialisation complete");

    // ---- SCAN GEOMETRY INITIALISATION ----

    info!("Waiting for the first scan to initialise the scan geometry");

    let first_scan = wait_for_geometry(&mut safety_filter, &scan_client);

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut stats = CycleStats::default();
    let mut pending_scan = Some(first_scan);

    loop {
        // The first scan is processed as well as setting up the geometry
        let scan = match pending_scan.take() {
            Some(s) => s,
            None => match receive_scan(&scan_client) {
                Some(s) => s,
                None => continue
            }
        };

        // ---- PROCESSING AND OUTPUT ----

        // On error nothing is sent for this scan, the next one is processed as normal
        if let Err(e) = run_cycle(
            &mut safety_filter,
            des_vel_client.register(),
            scan,
            &cmd_vel_server,
            &mut stats
        ) {
            warn!("{}", e);
        }

        if stats.num_cycles % SUMMARY_PERIOD_CYCLES == 0 {
            debug!("{:?}", stats);
        }
    }
}

/// Block until a scan arrives which the scan geometry can be derived from,
/// returning that scan.
fn wait_for_geometry(safety_filter: &mut SafetyFilter, scan_client: &ScanClient) -> LaserScan {
    loop {
        let scan = match receive_scan(scan_client) {
            Some(s) => s,
            None => continue
        };

        match safety_filter.init_geometry(&scan) {
            Ok(_) => return scan,
            Err(e) => error!("Cannot use scan to initialise the geometry, waiting for the next one: {}", e)
        }
    }
}

/// Recieve a scan, logging any errors.
///
/// `None` is returned if no valid scan arrived within the receive timeout.
fn receive_scan(scan_client: &ScanClient) -> Option<LaserScan> {
    match scan_client.receive_scan() {
        Ok(Some(s)) => Some(s),
        Ok(None) => {
            if !scan_client.is_connected() {
                trace!("No scan recieved, lidar publisher not connected");
            }
            None
        },
        Err(ScanClientError::ScanParseError(e)) => {
            warn!("Could not parse recieved scan: {}", e);
            None
        },
        Err(e) => {
            warn!("ScanClient error: {}", e);
            None
        }
    }
}
