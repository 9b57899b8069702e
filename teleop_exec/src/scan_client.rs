//! # Scan Client
//!
//! Subscribes to the lidar scans. Every scan received triggers one processing cycle in the main
//! loop, so scans are queued rather than conflated.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::lidar::LaserScan,
    net::{zmq, MessageError, MonitoredSocket, MonitoredSocketError, SocketOptions}
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Lidar scan client
pub struct ScanClient {
    socket: MonitoredSocket
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ScanClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not recieve a scan: {0}")]
    RecvError(zmq::Error),

    #[error("Could not parse the recieved scan: {0}")]
    ScanParseError(serde_json::Error),

    #[error("The server sent a message which was not valid UTF-8")]
    NonUtf8Message
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ScanClient {

    /// Create a new instance of the scan client.
    ///
    /// This function will not block until the publisher connects.
    pub fn new(
        ctx: &zmq::Context,
        endpoint: &str,
        recv_timeout_ms: i32
    ) -> Result<Self, ScanClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: recv_timeout_ms,
            ..Default::default()
        };

        // Connect the socket
        let socket = MonitoredSocket::new(
            ctx, 
            zmq::SUB, 
            socket_options, 
            endpoint
        ).map_err(ScanClientError::SocketError)?;

        Ok(Self {
            socket
        })
    }

    /// Check if the client is connected to the lidar publisher
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Recieve a single scan.
    ///
    /// Blocks for up to the receive timeout, returning `Ok(None)` if no scan arrived.
    pub fn receive_scan(&self) -> Result<Option<LaserScan>, ScanClientError> {
        self.socket.recv_json().map_err(|e| match e {
            MessageError::DeserializeError(e) => ScanClientError::ScanParseError(e),
            MessageError::NonUtf8Message => ScanClientError::NonUtf8Message,
            MessageError::RecvError(e) | MessageError::SendError(e) => 
                ScanClientError::RecvError(e),
            MessageError::SerializationError(e) => ScanClientError::ScanParseError(e),
        })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
