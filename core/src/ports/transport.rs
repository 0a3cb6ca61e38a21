//! Knock transport port (interface).

use std::net::SocketAddrV4;

use crate::domain::Protocol;
use crate::error::Result;

/// Port for emitting a single knock packet.
///
/// Implementations send exactly one packet per call and never wait for a
/// reply. Any socket they open must be closed before the call returns.
pub trait KnockTransport: Send + Sync {
    /// Send one knock of `protocol` to `target`.
    fn knock(
        &self,
        target: SocketAddrV4,
        protocol: Protocol,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
