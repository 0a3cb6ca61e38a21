//! DNS host resolver.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::lookup_host;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ports::HostResolver;

/// Resolves hosts through the system resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsResolver;

impl DnsResolver {
    pub fn new() -> Self {
        Self
    }
}

impl HostResolver for DnsResolver {
    async fn resolve(&self, host: &str) -> Result<Ipv4Addr> {
        let unresolved = |reason: String| Error::UnresolvedHost {
            host: host.to_string(),
            reason,
        };

        let addrs = lookup_host((host, 0))
            .await
            .map_err(|e| unresolved(e.to_string()))?;

        let addr = addrs
            .filter_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(*v4.ip()),
                SocketAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| unresolved("no IPv4 address".to_string()))?;

        debug!(host, %addr, "Resolved knock target");
        Ok(addr)
    }
}
