//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces the knock engine uses to reach the
//! network. Implementations live in `adapters`.

mod resolver;
mod transport;

pub use resolver::HostResolver;
pub use transport::KnockTransport;
