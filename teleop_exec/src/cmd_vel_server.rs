//! # Command Velocity Server
//!
//! Publishes the corrected velocity commands to the base controller.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::vel::VelCmd,
    net::{zmq, MessageError, MonitoredSocket, MonitoredSocketError, SocketOptions}
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Corrected velocity command publisher
pub struct CmdVelServer {
    socket: MonitoredSocket
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CmdVelServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the command: {0}")]
    SendError(MessageError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CmdVelServer {
    /// Create a new instance of the server.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, endpoint: &str) -> Result<Self, CmdVelServerError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            socket_options,
            endpoint
        ).map_err(CmdVelServerError::SocketError)?;

        Ok(Self {
            socket
        })
    }

    /// Publish a command.
    pub fn send(&self, cmd: &VelCmd) -> Result<(), CmdVelServerError> {
        self.socket.send_json(cmd)
            .map_err(CmdVelServerError::SendError)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
