//! # Network Module
//!
//! The motor controller is reached over a connected UDP socket. Messages are fire-and-forget,
//! there is no acknowledgement and no retry, the sender simply sends again on its next period.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use std::net::UdpSocket;
use std::sync::Arc;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A byte sink leading to the actuators.
pub trait ActuatorSink: Send + Sync {
    fn send(&self, bytes: &[u8]) -> Result<usize, LinkError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// UDP link to the motor controller.
///
/// Cloning the link shares the underlying socket.
#[derive(Clone, Debug)]
pub struct UdpLink {
    socket: Arc<UdpSocket>,
    endpoint: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum LinkError {
    #[error("Could not bind the local socket: {0}")]
    BindFailed(std::io::Error),

    #[error("Could not connect to {0}: {1}")]
    ConnectFailed(String, std::io::Error),

    #[error("Could not send to {0}: {1}")]
    SendFailed(String, std::io::Error),

    #[error("Only {1} of {2} bytes were sent to {0}")]
    ShortSend(String, usize, usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl UdpLink {
    /// Bind an ephemeral local socket and connect it to `host:port`.
    pub fn connect(host: &str, port: u16) -> Result<Self, LinkError> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(LinkError::BindFailed)?;

        let endpoint = format!("{}:{}", host, port);
        socket
            .connect(&endpoint)
            .map_err(|e| LinkError::ConnectFailed(endpoint.clone(), e))?;

        debug!("UDP link connected to {}", endpoint);

        Ok(Self {
            socket: Arc::new(socket),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ActuatorSink for UdpLink {
    fn send(&self, bytes: &[u8]) -> Result<usize, LinkError> {
        let n = self
            .socket
            .send(bytes)
            .map_err(|e| LinkError::SendFailed(self.endpoint.clone(), e))?;

        if n != bytes.len() {
            return Err(LinkError::ShortSend(self.endpoint.clone(), n, bytes.len()));
        }

        Ok(n)
    }
}
