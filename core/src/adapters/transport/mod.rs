//! Socket knock transport.
//!
//! UDP knocks go out through a tokio datagram socket. TCP knocks need a
//! connect that returns before the handshake finishes, which is done with
//! raw sockets on unix targets.

#[cfg(unix)]
mod unix;

use std::net::{Ipv4Addr, SocketAddrV4};

use tokio::net::UdpSocket;
use tracing::debug;

use crate::domain::Protocol;
use crate::error::{Error, Result};
use crate::ports::KnockTransport;

/// Payload of a UDP knock: one NUL byte.
const UDP_PAYLOAD: [u8; 1] = [0];

/// Sends knocks over real sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketTransport;

impl SocketTransport {
    pub fn new() -> Self {
        Self
    }

    async fn send_datagram(&self, target: SocketAddrV4) -> Result<()> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(|e| Error::TransportFailure(format!("socket: {}", e)))?;

        socket
            .send_to(&UDP_PAYLOAD, target)
            .await
            .map_err(|e| Error::TransportFailure(format!("sendto {}: {}", target, e)))?;

        debug!(%target, "UDP knock sent");
        Ok(())
    }

    #[cfg(unix)]
    fn send_syn(&self, target: SocketAddrV4) -> Result<()> {
        unix::send_syn(target)
    }

    #[cfg(not(unix))]
    fn send_syn(&self, _target: SocketAddrV4) -> Result<()> {
        Err(Error::UnsupportedPlatform(
            "non-blocking TCP knocks need a unix target".to_string(),
        ))
    }
}

impl KnockTransport for SocketTransport {
    async fn knock(&self, target: SocketAddrV4, protocol: Protocol) -> Result<()> {
        match protocol {
            Protocol::Udp => self.send_datagram(target).await,
            Protocol::Tcp => self.send_syn(target),
        }
    }
}
