//! kexec - Knock a host's port sequence, then exec the real command
//!
//! Install by symlinking the binary under the name of each host:
//!
//! ```text
//! ln -s /usr/local/bin/kexec ~/bin/router
//! router ssh router
//! ```
//!
//! The knock sequence for `router` is read from `~/.kexec`.

mod commands;
mod launcher;

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::builder::FalseyValueParser;
use clap::Parser;
use kexec_core::{ConfigStore, HostMatch, KnockSettings};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kexec")]
#[command(author, version, about = "Knock a host's port sequence, then exec the real command")]
#[command(override_usage = "<HOST-SYMLINK> [OPTIONS] <COMMAND> [ARGS]...")]
struct Cli {
    /// Print every knock before it is sent
    #[arg(short, long, env = "KEXEC_VERBOSE", value_parser = FalseyValueParser::new())]
    verbose: bool,

    /// Configuration file [default: ~/.kexec]
    #[arg(short, long, env = "KEXEC_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Host to knock instead of the invocation name
    #[arg(long)]
    host: Option<String>,

    /// Milliseconds to sleep between consecutive knocks
    #[arg(long, env = "KEXEC_DELAY_MS", value_name = "MS")]
    delay_ms: Option<u64>,

    /// Match the host anywhere in a record instead of by its key
    #[arg(long)]
    substring_match: bool,

    /// Show the knock plan without sending anything or running the command
    #[arg(long)]
    dry_run: bool,

    /// Output the knock plan in JSON format
    #[arg(long, requires = "dry_run")]
    json: bool,

    /// Command to run after knocking, followed by its arguments
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required_unless_present = "dry_run"
    )]
    command: Vec<OsString>,
}

impl Cli {
    fn settings(&self) -> KnockSettings {
        let settings = KnockSettings::default().with_verbose(self.verbose);
        match self.delay_ms {
            Some(ms) => settings.with_step_delay(Duration::from_millis(ms)),
            None => settings,
        }
    }

    fn host_match(&self) -> HostMatch {
        if self.substring_match {
            HostMatch::Substring
        } else {
            HostMatch::Exact
        }
    }

    fn config_store(&self) -> Result<ConfigStore> {
        Ok(match &self.config {
            Some(path) => ConfigStore::with_path(path.clone()),
            None => ConfigStore::new()?,
        })
    }

    /// The `--host` override, else the name this binary was invoked under.
    fn resolve_host(&self) -> Result<String> {
        if let Some(host) = &self.host {
            return Ok(host.clone());
        }
        let argv0 = std::env::args_os().next().unwrap_or_default();
        match launcher::host_from_invocation(&argv0) {
            Some(host) => Ok(host),
            None => bail!(
                "{} must be invoked through a symlink named after the host, or with --host",
                launcher::BIN_NAME
            ),
        }
    }
}

/// Install a stderr subscriber filtered by `RUST_LOG` (default: warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let host = cli.resolve_host()?;
    let store = cli.config_store()?;
    let mode = cli.host_match();

    if cli.dry_run {
        return commands::plan::run(&store, &host, mode, cli.json).await;
    }

    let report = commands::knock::run(&store, &host, mode, cli.settings()).await?;
    debug!(host = %report.host, sent = report.sent, command = ?cli.command, "Handing off");

    Err(launcher::handoff(&cli.command))
}
