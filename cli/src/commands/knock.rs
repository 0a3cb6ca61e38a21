//! Knock command - send a host's sequence before the handoff.

use anyhow::Result;
use kexec_core::{
    ConfigStore, DnsResolver, HostMatch, KnockEngine, KnockReport, KnockSettings, SocketTransport,
};

/// Look up `host` and knock its whole sequence.
///
/// Any error here means the handoff must not happen.
pub async fn run(
    store: &ConfigStore,
    host: &str,
    mode: HostMatch,
    settings: KnockSettings,
) -> Result<KnockReport> {
    let sequence = store.sequence_for(host, mode).await?;
    let engine = KnockEngine::new(DnsResolver::new(), SocketTransport::new(), settings);
    Ok(engine.run(&sequence).await?)
}
