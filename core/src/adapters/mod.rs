//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.

pub mod resolver;
pub mod transport;

// Re-export main types for convenience
pub use resolver::DnsResolver;
pub use transport::SocketTransport;
