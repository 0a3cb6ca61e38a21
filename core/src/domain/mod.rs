//! Domain layer - Pure business logic and data models.
//!
//! Records, knock steps and sequence parsing. Nothing here touches the
//! filesystem or the network.

mod knock;
mod record;

pub use knock::{KnockStep, Protocol, Sequence};
pub use record::{strip_whitespace, ConfigRecord, HostMatch};
