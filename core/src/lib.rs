//! kexec Core Library
//!
//! Port-knock sequence engine behind the `kexec` launcher.
//! Provides functionality to:
//! - Read per-host knock records from `~/.kexec`
//! - Parse a record into an ordered list of TCP/UDP knocks
//! - Send those knocks one by one, aborting on the first failure
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Records, knock steps and sequence parsing
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: DNS resolution and socket transport
//! - `application`: The knock engine use case
//!
//! # Example
//! ```no_run
//! use kexec_core::{ConfigStore, DnsResolver, HostMatch, KnockEngine, KnockSettings, SocketTransport};
//!
//! # async fn demo() -> kexec_core::Result<()> {
//! let sequence = ConfigStore::new()?.sequence_for("router", HostMatch::Exact).await?;
//! let engine = KnockEngine::new(DnsResolver::new(), SocketTransport::new(), KnockSettings::default());
//! let report = engine.run(&sequence).await?;
//! println!("sent {} knocks", report.sent);
//! # Ok(())
//! # }
//! ```

// Hexagonal architecture layers
pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub mod config;
pub mod error;

// Re-export domain types (primary API)
pub use domain::{ConfigRecord, HostMatch, KnockStep, Protocol, Sequence};

// Re-export other commonly used types
pub use adapters::{DnsResolver, SocketTransport};
pub use application::{KnockEngine, KnockReport};
pub use config::{ConfigStore, KnockSettings, KnockTable, CONFIG_FILE_NAME, DEFAULT_STEP_DELAY};
pub use error::{Error, Result, TokenFault};
