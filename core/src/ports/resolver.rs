//! Host resolver port (interface).

use std::net::Ipv4Addr;

use crate::error::Result;

/// Port for turning a host name into a knock target address.
pub trait HostResolver: Send + Sync {
    /// Resolve `host` to its first IPv4 address.
    ///
    /// Failure, or a name with only IPv6 addresses, is `UnresolvedHost`.
    fn resolve(&self, host: &str) -> impl std::future::Future<Output = Result<Ipv4Addr>> + Send;
}
