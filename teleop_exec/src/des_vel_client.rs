//! # Desired Velocity Client
//!
//! Subscribes to the operator's desired velocity commands. Commands are received on a background
//! thread and written into a [`DesVelRegister`], so that the most recent command is available to
//! the main loop whenever a scan arrives. Receiving a command never triggers a cycle by itself.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{sync::{Arc, atomic::{AtomicBool, Ordering}}, thread::{self, JoinHandle}};

use comms_if::{
    eqpt::vel::VelCmd,
    net::{zmq, MessageError, MonitoredSocket, MonitoredSocketError, SocketOptions}
};
use log::{debug, warn};

use crate::des_vel::DesVelRegister;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout of the background thread, bounds how long dropping the client waits for the
/// thread to stop.
///
/// Units: milliseconds
const BG_RECV_TIMEOUT_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct DesVelClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    register: DesVelRegister,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DesVelClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not start the background thread: {0}")]
    ThreadError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DesVelClient {
    /// Create a new instance of the client, writing received commands into `register`.
    ///
    /// This function will not block until the publisher connects.
    pub fn new(
        ctx: &zmq::Context,
        endpoint: &str,
        register: DesVelRegister
    ) -> Result<Self, DesVelClientError> {
        // Only the latest command matters, so let zmq drop any older ones
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: BG_RECV_TIMEOUT_MS,
            conflate: true,
            ..Default::default()
        };

        // Connect the socket
        let socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            socket_options,
            endpoint
        ).map_err(DesVelClientError::SocketError)?;

        let bg_run = Arc::new(AtomicBool::new(true));

        // Create clones of these to pass to the bg thread
        let bg_run_clone = bg_run.clone();
        let register_clone = register.clone();

        // Start BG thread
        let bg_jh = thread::Builder::new()
            .name("des_vel_client".into())
            .spawn(move || bg_thread(socket, bg_run_clone, register_clone))
            .map_err(DesVelClientError::ThreadError)?;

        Ok(Self {
            bg_jh: Some(bg_jh),
            bg_run,
            register,
        })
    }

    /// Get the register commands are written into.
    pub fn register(&self) -> &DesVelRegister {
        &self.register
    }
}

impl Drop for DesVelClient {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("DesVelClient background thread panicked");
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn bg_thread(
    socket: MonitoredSocket,
    run: Arc<AtomicBool>,
    register: DesVelRegister
) {
    while run.load(Ordering::Relaxed) {
        match socket.recv_json::<VelCmd>() {
            Ok(Some(cmd)) => {
                debug!("Desired velocity: {:?}", cmd);
                register.write(cmd);
            },
            Ok(None) => (),
            // A bad message is dropped, the held command is kept
            Err(MessageError::DeserializeError(e)) => 
                warn!("Could not parse desired velocity command: {}", e),
            Err(e) => warn!("DesVelClient error: {}", e),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
